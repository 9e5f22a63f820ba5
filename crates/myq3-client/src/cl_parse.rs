// cl_parse.rs -- apply decoded server messages to the session
//
// Decoding the wire format happens before this point; what arrives here is a
// gamestate, a snapshot with its entities, or one reliable command. This is
// the only code that writes to the snapshot, entity and command histories.

use myq3_common::common::{com_dprintf, com_printf, ComResult};
use myq3_common::net_queue::MessageQueue;
use myq3_common::q_shared::{atoi, info_pairs, info_value_for_key, EntityState, CS_SYSTEMINFO};
use myq3_common::qcommon::{ConnState, PACKET_BACKUP};
use myq3_common::ring::RingLookup;

use crate::cl_cgame::cl_init_cgame;
use crate::cl_main::cl_clear_state;
use crate::client::{ClSnapshot, ClientSession, MAX_PARSE_ENTITIES};

// ============================================================
// Messages
// ============================================================

/// The level setup sent once per map.
#[derive(Debug, Clone, Default)]
pub struct GamestateMessage {
    pub server_message_sequence: i32,
    pub server_command_sequence: i32,
    pub client_num: i32,
    pub configstrings: Vec<(usize, String)>,
}

/// One decoded message from the server (or a demo file).
#[derive(Debug, Clone)]
pub enum ServerMessage {
    Gamestate(GamestateMessage),
    Snapshot {
        snap: Box<ClSnapshot>,
        entities: Vec<EntityState>,
    },
    ServerCommand {
        sequence: i32,
        text: String,
    },
}

/// Apply one message to the session.
pub fn cl_parse_server_message(s: &mut ClientSession, msg: ServerMessage) -> ComResult<()> {
    match msg {
        ServerMessage::Gamestate(gs) => cl_parse_gamestate(s, gs),
        ServerMessage::Snapshot { snap, entities } => cl_add_snapshot(s, *snap, &entities),
        ServerMessage::ServerCommand { sequence, text } => {
            cl_add_reliable_command(s, sequence, &text);
            Ok(())
        }
    }
}

/// Apply everything the reader thread has queued since the last frame.
/// Stops at the first message that fails; later messages stay queued.
pub fn cl_drain_messages(
    s: &mut ClientSession,
    queue: &MessageQueue<ServerMessage>,
) -> ComResult<usize> {
    let mut count = 0;
    while let Some(queued) = queue.try_recv() {
        cl_parse_server_message(s, queued.message)?;
        s.clc.last_packet_time = queued.timestamp;
        count += 1;
    }
    if count > 0 {
        tracing::trace!(target: "net", count, "applied queued server messages");
    }
    Ok(count)
}

// ============================================================
// Gamestate
// ============================================================

/// Start a new level: wipe per-level state, load the configuration strings
/// and bring the presentation module up.
pub fn cl_parse_gamestate(s: &mut ClientSession, gs: GamestateMessage) -> ComResult<()> {
    // wipe local client state
    cl_clear_state(s);

    // a gamestate always marks a server command sequence
    s.clc.server_commands.advance_to(gs.server_command_sequence);

    for (index, text) in &gs.configstrings {
        s.cl.game_state.set(*index, text)?;
    }

    s.clc.client_num = gs.client_num;
    s.clc.server_message_sequence = gs.server_message_sequence;

    // parse useful values out of CS_SERVERINFO
    cl_system_info_changed(s);

    s.clc.state = ConnState::Connected;
    let init = cl_init_cgame(s);
    s.cls.pending_cgame_init = Some(init);
    Ok(())
}

/// The systeminfo configstring changed: pick up the server id and the
/// server-controlled cvars.
pub fn cl_system_info_changed(s: &mut ClientSession) {
    let system_info = s.cl.game_state.get(CS_SYSTEMINFO).to_string();

    // NOTE: when the serverId changes, any further messages we send to the
    // server will use this new serverId
    s.cl.server_id = atoi(&info_value_for_key(&system_info, "sv_serverid"));

    // don't set any vars when playing a demo
    if s.clc.demoplaying {
        return;
    }

    s.cvar.cheats_allowed = atoi(&info_value_for_key(&system_info, "sv_cheats")) != 0;
    if !s.cvar.cheats_allowed {
        s.cvar.set_cheat_state();
    }

    for (key, value) in info_pairs(&system_info) {
        s.cvar.force_set(key, value);
    }
}

// ============================================================
// Snapshots
// ============================================================

/// Store a snapshot and the entities that came with it.
///
/// Entities always enter the history, even for a snapshot that turns out
/// invalid, since they occupy the server's view of the entity stream.
pub fn cl_add_snapshot(
    s: &mut ClientSession,
    mut snap: ClSnapshot,
    entities: &[EntityState],
) -> ComResult<()> {
    if snap.message_num <= s.cl.snap.message_num && s.cl.snap.valid {
        com_dprintf(&format!(
            "CL_ParseSnapshot: out of order snapshot {} <= {}\n",
            snap.message_num, s.cl.snap.message_num
        ));
        return Ok(());
    }

    // we will have the new snapshot once all the reliable commands
    // received so far have been executed
    snap.server_command_num = s.clc.server_command_sequence();
    s.clc.server_message_sequence = snap.message_num;

    snap.valid = cl_delta_is_valid(s, &snap);

    snap.parse_entities_num = s.cl.parse_entities_num;
    snap.num_entities = entities.len() as i32;
    for ent in entities {
        s.cl.parse_entities.put(s.cl.parse_entities_num, *ent);
        s.cl.parse_entities_num += 1;
    }

    // if not valid, dump the entire thing now that it has been properly
    // read
    if !snap.valid {
        return Ok(());
    }

    // clear the valid flags of any snapshots between the last received
    // and this one, so if there was a dropped packet it won't look like
    // something valid to delta from next time
    let first = (s.cl.snap.message_num + 1).max(snap.message_num - PACKET_BACKUP + 1);
    for n in first..snap.message_num {
        s.cl.snapshots.invalidate(n);
    }

    s.cl.snap = snap.clone();
    s.cl.snapshots.put(snap.message_num, snap);
    s.cl.clock.new_snapshots = true;
    Ok(())
}

// a delta snapshot is only usable if its base is still fully available
fn cl_delta_is_valid(s: &ClientSession, snap: &ClSnapshot) -> bool {
    if snap.delta_num <= 0 {
        // uncompressed frame
        return true;
    }

    match s.cl.snapshots.get(snap.delta_num) {
        Ok(RingLookup::Found(old)) => {
            if s.cl.parse_entities_num - old.parse_entities_num > MAX_PARSE_ENTITIES - 128 {
                com_printf("Delta parseEntitiesNum too old.\n");
                false
            } else {
                true
            }
        }
        Ok(RingLookup::Evicted) => {
            com_printf("Delta frame too old.\n");
            false
        }
        // should never happen, as the server acks only frames we have
        Ok(RingLookup::NotYetProduced) | Err(_) => {
            com_printf("Delta from invalid frame (not supposed to happen!).\n");
            false
        }
    }
}

// ============================================================
// Reliable commands
// ============================================================

/// Store a reliable command. Retransmissions of commands we already hold
/// are ignored.
pub fn cl_add_reliable_command(s: &mut ClientSession, sequence: i32, text: &str) {
    if sequence <= s.clc.server_command_sequence() {
        return;
    }
    s.clc.server_commands.put(sequence, text.to_string());
}

// ============================================================
// Tests
// ============================================================
