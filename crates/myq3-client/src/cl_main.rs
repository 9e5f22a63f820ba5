// cl_main.rs -- client session lifecycle and the per-frame entry point

use myq3_common::common::{com_printf, ComError, ComResult};
use myq3_common::net_queue::MessageQueue;
use myq3_common::qcommon::ConnState;

use crate::cl_cgame::CgameInit;
use crate::cl_parse::{cl_drain_messages, ServerMessage};
use crate::cl_timing::{cl_set_cgame_time, DemoReader, TimeAdvance};
use crate::client::{ClientConnection, ClientSession, ClientState};

// ============================================================
// CL_ClearState
//
// Called before parsing a gamestate
// ============================================================

pub fn cl_clear_state(s: &mut ClientSession) {
    // wipe the entire cl structure
    s.cl = ClientState::default();
}

// ============================================================
// CL_Disconnect
//
// Called when a connection, demo, or cinematic is being terminated.
// Goes from a connected state to full screen console state.
// This is also called on Com_Error, so it shouldn't cause any errors.
// ============================================================

pub fn cl_disconnect(s: &mut ClientSession) {
    if s.clc.state == ConnState::Uninitialized {
        return;
    }

    cl_clear_state(s);

    // wipe the client connection, including any half-assembled
    // configstring and the reliable command history
    s.clc = ClientConnection::default();
    s.cls.pending_cgame_init = None;

    s.cvar.force_set("cl_paused", "0");
}

/// Handle an error raised while running the session. The connection is torn
/// down for every kind of error; returns true if the process has to stop.
pub fn cl_drop_error(s: &mut ClientSession, err: &ComError) -> bool {
    match err {
        ComError::Fatal(_) => {
            com_printf(&format!("{}\n", err));
            cl_disconnect(s);
            true
        }
        ComError::Drop(msg) => {
            com_printf(&format!("********************\nERROR: {}\n********************\n", msg));
            cl_disconnect(s);
            false
        }
        ComError::ServerDisconnect(_) => {
            com_printf(&format!("{}\n", err));
            cl_disconnect(s);
            false
        }
    }
}

// ============================================================
// CL_Frame
// ============================================================

/// What one client frame produced for the presentation module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientFrame {
    /// Set on the frame a gamestate brought the presentation module up.
    pub cgame_init: Option<CgameInit>,
    pub time: TimeAdvance,
}

/// Run one frame: advance real time by `msec`, apply whatever the reader
/// thread queued, then step the presentation clock.
pub fn cl_frame(
    s: &mut ClientSession,
    msec: i32,
    queue: Option<&MessageQueue<ServerMessage>>,
    demo: &mut dyn DemoReader,
    sys_msec: i32,
) -> ComResult<ClientFrame> {
    s.cls.frametime = msec;
    s.cls.realtime += msec;

    if let Some(queue) = queue {
        cl_drain_messages(s, queue)?;
    }

    let time = cl_set_cgame_time(s, demo, sys_msec)?;

    Ok(ClientFrame {
        cgame_init: s.cls.pending_cgame_init.take(),
        time,
    })
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl_cgame::{cl_get_server_command, cl_get_snapshot};
    use crate::cl_parse::{cl_add_reliable_command, GamestateMessage};
    use crate::cl_timing::NoDemo;
    use crate::client::ClSnapshot;
    use myq3_common::net_queue::DEFAULT_QUEUE_CAPACITY;
    use myq3_common::q_shared::EntityState;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gamestate(message_seq: i32) -> ServerMessage {
        ServerMessage::Gamestate(GamestateMessage {
            server_message_sequence: message_seq,
            server_command_sequence: 0,
            client_num: 1,
            configstrings: vec![(1, "\\sv_serverid\\9".to_string())],
        })
    }

    fn snapshot(message_num: i32, server_time: i32, entities: usize) -> ServerMessage {
        ServerMessage::Snapshot {
            snap: Box::new(ClSnapshot {
                message_num,
                server_time,
                ..Default::default()
            }),
            entities: vec![EntityState::default(); entities],
        }
    }

    #[test]
    fn test_disconnect_clears_assembly_and_history() {
        let mut s = ClientSession::new();
        s.clc.state = ConnState::Active;
        s.clc.big_config_string = Some("cs 5 \"partial".to_string());
        cl_add_reliable_command(&mut s, 1, "print a");

        cl_disconnect(&mut s);
        assert_eq!(s.clc.state, ConnState::Disconnected);
        assert!(s.clc.big_config_string.is_none());
        assert_eq!(s.clc.server_command_sequence(), 0);
    }

    #[test]
    fn test_drop_error_resets_session() {
        let mut s = ClientSession::new();
        s.clc.state = ConnState::Active;
        let fatal = cl_drop_error(&mut s, &ComError::drop("bad"));
        assert!(!fatal);
        assert_eq!(s.clc.state, ConnState::Disconnected);

        s.clc.state = ConnState::Active;
        assert!(cl_drop_error(&mut s, &ComError::Fatal("boom".into())));
    }

    #[test]
    fn test_frame_reports_cgame_init_once() {
        let mut s = ClientSession::new();
        let queue = MessageQueue::new(DEFAULT_QUEUE_CAPACITY);
        let tx = queue.sender();
        tx.send(gamestate(20), 0);

        let f = cl_frame(&mut s, 16, Some(&queue), &mut NoDemo, 0).unwrap();
        assert_eq!(f.cgame_init.map(|i| i.server_message_num), Some(20));
        assert_eq!(f.time, TimeAdvance::Idle);
        assert_eq!(s.cl.server_id, 9);

        tx.send(snapshot(21, 5000, 0), 0);
        let f = cl_frame(&mut s, 16, Some(&queue), &mut NoDemo, 0).unwrap();
        assert_eq!(f.cgame_init, None);
        assert_eq!(f.time, TimeAdvance::Advanced { server_time: 5000 });
        assert_eq!(s.clc.state, ConnState::Active);
    }

    #[test]
    fn test_live_session_with_jitter_and_loss() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut s = ClientSession::new();
        let queue = MessageQueue::new(DEFAULT_QUEUE_CAPACITY);
        let tx = queue.sender();
        tx.send(gamestate(100), 0);
        cl_frame(&mut s, 16, Some(&queue), &mut NoDemo, 0).unwrap();

        let mut last_time = i32::MIN;
        let mut server_clock = 10_000;
        let mut message_num = 100;
        let mut next_snapshot_at = 0;

        for frame in 0..2000 {
            let msec = rng.gen_range(5..=20);

            // a snapshot every 3-5 uneven client frames, one in ten lost
            if frame >= next_snapshot_at {
                server_clock += 50;
                message_num += 1;
                next_snapshot_at = frame + 3 + rng.gen_range(0..=2);
                if rng.gen_range(0..10) != 0 {
                    tx.send(snapshot(message_num, server_clock, rng.gen_range(0..40)), 0);
                }
            }

            let f = cl_frame(&mut s, msec, Some(&queue), &mut NoDemo, 0).unwrap();
            if let TimeAdvance::Advanced { server_time } = f.time {
                assert!(server_time >= last_time);
                last_time = server_time;
            }
        }

        assert_eq!(s.clc.state, ConnState::Active);
        assert!(last_time > 10_000);

        // the newest snapshot is always served
        let newest = s.cl.snap.message_num;
        assert!(cl_get_snapshot(&s, newest).unwrap().is_found());
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut a = ClientSession::new();
        let mut b = ClientSession::new();
        let qa = MessageQueue::new(DEFAULT_QUEUE_CAPACITY);
        let qb = MessageQueue::new(DEFAULT_QUEUE_CAPACITY);

        qa.sender().send(gamestate(10), 0);
        qa.sender().send(snapshot(11, 1000, 5), 0);
        qb.sender().send(gamestate(70), 0);

        cl_frame(&mut a, 16, Some(&qa), &mut NoDemo, 0).unwrap();
        cl_frame(&mut b, 16, Some(&qb), &mut NoDemo, 0).unwrap();
        cl_add_reliable_command(&mut b, 1, "print b");

        assert_eq!(a.clc.state, ConnState::Active);
        assert_eq!(b.clc.state, ConnState::Primed);
        assert_eq!(a.cl.parse_entities_num, 5);
        assert_eq!(b.cl.parse_entities_num, 0);
        assert!(cl_get_server_command(&mut a, 1).is_err());
        assert!(cl_get_server_command(&mut b, 1).unwrap().is_some());

        // an error on one session leaves the other running
        cl_drop_error(&mut b, &ComError::drop("test"));
        assert_eq!(b.clc.state, ConnState::Disconnected);
        assert_eq!(a.clc.state, ConnState::Active);
    }
}
