// cl_cgame.rs -- client system interface to the presentation module
//
// The presentation module pulls everything through these calls: snapshots,
// entity states, user commands and reliable server commands. Each history is
// bounded, so every lookup can come back evicted.

use myq3_common::cmd::CmdArgs;
use myq3_common::common::{com_dprintf, ComError, ComResult};
use myq3_common::q_shared::{
    atoi, info_value_for_key, EntityState, UserCmd, BIG_INFO_STRING, CS_SERVERINFO,
    CS_SYSTEMINFO, MAX_CONFIGSTRINGS,
};
use myq3_common::qcommon::ConnState;
use myq3_common::ring::RingLookup;

use crate::cl_parse::cl_system_info_changed;
use crate::client::{ClientSession, GameState, Snapshot, MAX_ENTITIES_IN_SNAPSHOT};

// ============================================================
// Gamestate
// ============================================================

pub fn cl_get_gamestate(s: &ClientSession) -> &GameState {
    &s.cl.game_state
}

pub fn cl_get_configstring(s: &ClientSession, index: usize) -> ComResult<&str> {
    if index >= MAX_CONFIGSTRINGS {
        return Err(ComError::drop(format!(
            "CL_GetConfigstring: bad index: {}",
            index
        )));
    }
    Ok(s.cl.game_state.get(index))
}

// ============================================================
// Snapshots and entities
// ============================================================

/// (message number, server time) of the newest snapshot.
pub fn cl_get_current_snapshot_number(s: &ClientSession) -> (i32, i32) {
    (s.cl.snap.message_num, s.cl.snap.server_time)
}

pub fn cl_get_snapshot(s: &ClientSession, snapshot_number: i32) -> ComResult<RingLookup<Snapshot>> {
    if snapshot_number > s.cl.snap.message_num {
        return Err(ComError::drop(
            "CL_GetSnapshot: snapshotNumber > cl.snapshot.messageNum",
        ));
    }

    let cl_snap = match s.cl.snapshots.get(snapshot_number)? {
        RingLookup::Found(snap) if snap.valid => snap,
        RingLookup::Found(_) | RingLookup::NotYetProduced => {
            return Ok(RingLookup::NotYetProduced)
        }
        // if the frame has fallen out of the circular buffer, we can't return it
        RingLookup::Evicted => return Ok(RingLookup::Evicted),
    };

    // if the entities in the frame have fallen out of their circular
    // buffer, we can't return it
    if cl_snap.num_entities > 0 && !s.cl.parse_entities.is_retained(cl_snap.parse_entities_num) {
        return Ok(RingLookup::Evicted);
    }

    let mut count = cl_snap.num_entities as usize;
    if count > MAX_ENTITIES_IN_SNAPSHOT {
        com_dprintf(&format!(
            "CL_GetSnapshot: truncated {} entities to {}\n",
            count, MAX_ENTITIES_IN_SNAPSHOT
        ));
        count = MAX_ENTITIES_IN_SNAPSHOT;
    }

    let mut entities = Vec::with_capacity(count);
    for i in 0..count as i32 {
        match s.cl.parse_entities.get(cl_snap.parse_entities_num + i)? {
            RingLookup::Found(ent) => entities.push(ent),
            _ => return Ok(RingLookup::Evicted),
        }
    }

    Ok(RingLookup::Found(Snapshot {
        snap_flags: cl_snap.snap_flags,
        ping: cl_snap.ping,
        server_time: cl_snap.server_time,
        areamask: cl_snap.areamask,
        ps: cl_snap.ps,
        entities,
        server_command_sequence: cl_snap.server_command_num,
    }))
}

pub fn cl_get_parse_entity_state(
    s: &ClientSession,
    parse_entity_number: i32,
) -> ComResult<RingLookup<EntityState>> {
    // can't return anything that hasn't been parsed yet
    if parse_entity_number >= s.cl.parse_entities_num {
        return Err(ComError::drop(format!(
            "CL_GetParseEntityState: {} >= {}",
            parse_entity_number, s.cl.parse_entities_num
        )));
    }
    s.cl.parse_entities.get(parse_entity_number)
}

// ============================================================
// User commands
// ============================================================

pub fn cl_get_current_cmd_number(s: &ClientSession) -> i32 {
    s.cl.cmd_number
}

pub fn cl_get_user_cmd(s: &ClientSession, cmd_number: i32) -> ComResult<RingLookup<UserCmd>> {
    // cmds[cmdNumber] is the last properly generated command
    if cmd_number > s.cl.cmd_number {
        return Err(ComError::drop(format!(
            "CL_GetUserCmd: {} >= {}",
            cmd_number, s.cl.cmd_number
        )));
    }
    s.cl.cmds.get(cmd_number)
}

/// Weapon selection and mouse sensitivity scale from the presentation module.
pub fn cl_set_user_cmd_value(s: &mut ClientSession, user_cmd_value: i32, sensitivity_scale: f32) {
    s.cl.cgame_user_cmd_value = user_cmd_value;
    s.cl.cgame_sensitivity = sensitivity_scale;
}

/// An error raised by the presentation module ends the connection.
pub fn cl_cgame_error(msg: &str) -> ComError {
    ComError::drop(msg)
}

// ============================================================
// Server commands
// ============================================================

/// Apply a `cs <index> <text>` command to the configuration string table.
pub fn cl_configstring_modified(s: &mut ClientSession, args: &CmdArgs) -> ComResult<()> {
    let index = atoi(args.argv(1));
    if index < 0 || index as usize >= MAX_CONFIGSTRINGS {
        return Err(ComError::drop("configstring > MAX_CONFIGSTRINGS"));
    }
    let index = index as usize;

    // get everything after "cs <num>"
    let text = args.args_from(2);
    if s.cl.game_state.get(index) == text {
        return Ok(()); // unchanged
    }

    s.cl.game_state.set(index, &text)?;

    if index == CS_SYSTEMINFO {
        // parse serverId and other cvars
        cl_system_info_changed(s);
    }
    Ok(())
}

/// Fetch reliable command `server_command_number` and run the client-side
/// part of it. Returns the command for the presentation module to execute,
/// or `None` when there is nothing for it to do.
pub fn cl_get_server_command(
    s: &mut ClientSession,
    server_command_number: i32,
) -> ComResult<Option<CmdArgs>> {
    let text = match s.clc.server_commands.get(server_command_number) {
        Ok(RingLookup::Found(text)) => text,
        // if we have irretrievably lost a reliable command, drop the connection
        Ok(RingLookup::Evicted) => {
            // when a demo record was started after the client got a whole
            // bunch of reliable commands, the demo may be missing some
            if s.clc.demoplaying {
                return Ok(None);
            }
            return Err(ComError::drop(
                "CL_GetServerCommand: a reliable command was cycled out",
            ));
        }
        Ok(RingLookup::NotYetProduced) => {
            com_dprintf(&format!(
                "CL_GetServerCommand: {} was never received\n",
                server_command_number
            ));
            return Ok(None);
        }
        Err(_) => {
            return Err(ComError::drop(
                "CL_GetServerCommand: requested a command not received",
            ))
        }
    };
    s.clc.last_executed_server_command = server_command_number;

    com_dprintf(&format!("serverCommand: {} : {}\n", server_command_number, text));

    let mut text = text;
    loop {
        let args = CmdArgs::tokenize(&text);

        match args.argv(0) {
            "disconnect" => {
                let reason = (args.argc() >= 2).then(|| args.argv(1).to_string());
                return Err(ComError::ServerDisconnect(reason));
            }

            "bcs0" => {
                let mut big = format!("cs {} \"{}", args.argv(1), args.argv(2));
                if big.len() >= BIG_INFO_STRING {
                    com_dprintf(&format!(
                        "CL_GetServerCommand: bcs0 truncated to {} chars\n",
                        BIG_INFO_STRING - 1
                    ));
                    truncate_at_char_boundary(&mut big, BIG_INFO_STRING - 1);
                }
                s.clc.big_config_string = Some(big);
                return Ok(None);
            }

            "bcs1" => {
                let part = args.argv(2);
                let big = s.clc.big_config_string.get_or_insert_with(String::new);
                if big.len() + part.len() >= BIG_INFO_STRING {
                    return Err(ComError::drop("bcs exceeded BIG_INFO_STRING"));
                }
                big.push_str(part);
                return Ok(None);
            }

            "bcs2" => {
                let part = args.argv(2);
                let mut big = s.clc.big_config_string.take().unwrap_or_default();
                if big.len() + part.len() + 1 >= BIG_INFO_STRING {
                    return Err(ComError::drop("bcs exceeded BIG_INFO_STRING"));
                }
                big.push_str(part);
                big.push('"');
                text = big;
                continue;
            }

            "cs" => {
                cl_configstring_modified(s, &args)?;
                return Ok(Some(args));
            }

            "map_restart" => {
                // clear outgoing commands before passing
                // the restart to the presentation module
                s.cl.cmds.clear();
                return Ok(Some(args));
            }

            // the presentation module can execute the command
            _ => return Ok(Some(args)),
        }
    }
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

// ============================================================
// Init
// ============================================================

/// Parameters the presentation module is started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgameInit {
    pub server_message_num: i32,
    pub server_command_sequence: i32,
    pub client_num: i32,
}

/// Bring the presentation module up for the level in the current
/// gamestate. Leaves the session `Primed`, waiting for the first snapshot.
pub fn cl_init_cgame(s: &mut ClientSession) -> CgameInit {
    s.clc.state = ConnState::Loading;

    // find the current mapname
    let mapname = info_value_for_key(s.cl.game_state.get(CS_SERVERINFO), "mapname");
    s.cl.mapname = format!("maps/{}.bsp", mapname);

    let init = CgameInit {
        server_message_num: s.clc.server_message_sequence,
        server_command_sequence: s.clc.last_executed_server_command,
        client_num: s.clc.client_num,
    };

    // we will send a usercmd this frame, which
    // will cause the server to send us the first snapshot
    s.clc.state = ConnState::Primed;

    com_dprintf(&format!("CL_InitCGame: {}\n", s.cl.mapname));

    // demos keep whatever cheat state they were recorded with
    if !s.clc.demoplaying && !s.cvar.cheats_allowed {
        s.cvar.set_cheat_state();
    }

    init
}

// ============================================================
// Tests
// ============================================================
