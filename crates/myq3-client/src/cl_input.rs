// cl_input.rs -- builds an intended movement vector to send to the server

use myq3_common::q_shared::UserCmd;
use myq3_common::qcommon::ConnState;

use crate::client::ClientSession;

/// Store the command sampled this frame. The command is stamped with the
/// current presentation time and the weapon the presentation module asked
/// for. Returns the new command number, or `None` before a gamestate.
pub fn cl_create_new_command(s: &mut ClientSession, mut cmd: UserCmd) -> Option<i32> {
    // no need to create usercmds until we have a gamestate
    if s.clc.state < ConnState::Primed {
        return None;
    }

    cmd.server_time = s.cl.clock.server_time;
    cmd.weapon = s.cl.cgame_user_cmd_value as u8;

    s.cl.cmd_number += 1;
    s.cl.cmds.put(s.cl.cmd_number, cmd);
    Some(s.cl.cmd_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl_cgame::{cl_get_user_cmd, cl_set_user_cmd_value};

    #[test]
    fn test_no_commands_before_gamestate() {
        let mut s = ClientSession::new();
        s.clc.state = ConnState::Connected;
        assert_eq!(cl_create_new_command(&mut s, UserCmd::default()), None);
        assert_eq!(s.cl.cmd_number, 0);
    }

    #[test]
    fn test_command_stamped() {
        let mut s = ClientSession::new();
        s.clc.state = ConnState::Active;
        s.cl.clock.server_time = 1234;
        cl_set_user_cmd_value(&mut s, 5, 1.0);

        let cmd = UserCmd {
            forwardmove: 127,
            ..Default::default()
        };
        assert_eq!(cl_create_new_command(&mut s, cmd), Some(1));

        let stored = cl_get_user_cmd(&s, 1).unwrap().found().unwrap();
        assert_eq!(stored.server_time, 1234);
        assert_eq!(stored.weapon, 5);
        assert_eq!(stored.forwardmove, 127);
    }
}
