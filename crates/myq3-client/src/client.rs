// client.rs — primary header for client
//
// Per-session state shared by the message receiver, the clock engine and the
// presentation-facing accessors. Everything that used to be process-global
// lives in a `ClientSession`, so several sessions can run side by side.

use myq3_common::common::{ComError, ComResult};
use myq3_common::cvar::{CvarContext, CVAR_CHEAT, CVAR_ROM, CVAR_SYSTEMINFO, CVAR_TEMP};
use myq3_common::q_shared::{
    EntityState, PlayerState, SnapFlags, UserCmd, MAX_CONFIGSTRINGS, MAX_GAMESTATE_CHARS,
    MAX_MAP_AREA_BYTES,
};
use myq3_common::qcommon::{ConnState, CMD_BACKUP, MAX_RELIABLE_COMMANDS, PACKET_BACKUP};
use myq3_common::ring::HistoryRing;

use crate::cl_cgame::CgameInit;
use crate::cl_timing::{TimedemoStats, TimedemoSummary};

// ============================================================
// Limits
// ============================================================

/// Size of the parsed entity history shared by all retained snapshots.
pub const MAX_PARSE_ENTITIES: i32 = 2048;

/// Most entities handed to the presentation module for one snapshot.
pub const MAX_ENTITIES_IN_SNAPSHOT: usize = 256;

/// Frame durations kept for the timedemo report.
pub const MAX_TIMEDEMO_DURATIONS: usize = 4096;

const _: () = assert!(MAX_PARSE_ENTITIES & (MAX_PARSE_ENTITIES - 1) == 0);

// ============================================================
// clSnapshot_t
// ============================================================

/// A snapshot as the receiver stores it. The entity list is not inlined; the
/// snapshot refers to a contiguous range of the parsed entity history.
#[derive(Debug, Clone, PartialEq)]
pub struct ClSnapshot {
    pub valid: bool, // cleared if delta parsing was invalid
    pub snap_flags: SnapFlags,

    pub server_time: i32, // server time the message is valid for (in msec)

    pub message_num: i32, // copied from netchan->incoming_sequence
    pub delta_num: i32,   // messageNum the delta is from, <= 0 when uncompressed
    pub ping: i32,

    pub areamask: [u8; MAX_MAP_AREA_BYTES], // portalarea visibility bits

    pub cmd_num: i32, // the next cmdNum the server is expecting
    pub ps: PlayerState,

    pub num_entities: i32,       // all of the entities that need to be presented
    pub parse_entities_num: i32, // at the time of this snapshot

    pub server_command_num: i32, // execute all commands up to this before
                                 // making the snapshot current
}

impl Default for ClSnapshot {
    fn default() -> Self {
        Self {
            valid: false,
            snap_flags: SnapFlags::empty(),
            server_time: 0,
            message_num: 0,
            delta_num: 0,
            ping: 0,
            areamask: [0; MAX_MAP_AREA_BYTES],
            cmd_num: 0,
            ps: PlayerState::default(),
            num_entities: 0,
            parse_entities_num: 0,
            server_command_num: 0,
        }
    }
}

/// The copy handed to the presentation module. Entities are materialized out
/// of the shared history and capped at `MAX_ENTITIES_IN_SNAPSHOT`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub snap_flags: SnapFlags,
    pub ping: i32,
    pub server_time: i32,
    pub areamask: [u8; MAX_MAP_AREA_BYTES],
    pub ps: PlayerState,
    pub entities: Vec<EntityState>,
    pub server_command_sequence: i32,
}

// ============================================================
// gameState_t
// ============================================================

/// Configuration strings for the current level. The total text, one
/// terminator per string plus a leading empty string, is bounded by
/// `MAX_GAMESTATE_CHARS`.
#[derive(Debug, Clone)]
pub struct GameState {
    strings: Vec<String>,
    data_count: usize,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            strings: vec![String::new(); MAX_CONFIGSTRINGS],
            data_count: 1,
        }
    }
}

impl GameState {
    pub fn get(&self, index: usize) -> &str {
        self.strings.get(index).map_or("", |s| s.as_str())
    }

    /// Bytes used, as the wire format counts them.
    pub fn data_count(&self) -> usize {
        self.data_count
    }

    /// Replace one configuration string. The table is left untouched when the
    /// index is out of range or the new text would overflow the budget.
    pub fn set(&mut self, index: usize, value: &str) -> ComResult<()> {
        if index >= MAX_CONFIGSTRINGS {
            return Err(ComError::drop(format!(
                "configstring {} > MAX_CONFIGSTRINGS",
                index
            )));
        }

        let old = cost(&self.strings[index]);
        let new_count = self.data_count - old + cost(value);
        if new_count > MAX_GAMESTATE_CHARS {
            return Err(ComError::drop("MAX_GAMESTATE_CHARS exceeded"));
        }

        self.strings[index] = value.to_string();
        self.data_count = new_count;
        Ok(())
    }
}

// empty strings share the leading terminator
fn cost(s: &str) -> usize {
    if s.is_empty() {
        0
    } else {
        s.len() + 1
    }
}

// ============================================================
// Clock
// ============================================================

/// Presentation clock state. All times are milliseconds.
#[derive(Debug, Clone, Default)]
pub struct ClockState {
    /// server_time - realtime at which the presentation module should render.
    pub server_time_delta: i32,
    /// Estimated server time handed out this frame.
    pub server_time: i32,
    /// Floor for `server_time`, to keep it from going backwards.
    pub old_server_time: i32,
    /// Snapshot server time seen by the previous frame.
    pub old_frame_server_time: i32,
    /// Set when the clock ran past the newest snapshot.
    pub extrapolated_snapshot: bool,
    /// Set by the receiver, consumed by the next clock adjustment.
    pub new_snapshots: bool,
    /// Last time returned to the presentation module this connection.
    pub presented: Option<i32>,
}

// ============================================================
// clientActive_t — wiped completely at every gamestate
// ============================================================

#[derive(Debug, Clone)]
pub struct ClientState {
    pub snap: ClSnapshot, // latest received from server
    pub clock: ClockState,

    pub game_state: GameState,
    pub mapname: String,

    pub snapshots: HistoryRing<ClSnapshot>,   // indexed by message number
    pub parse_entities: HistoryRing<EntityState>,
    pub parse_entities_num: i32,              // next index to write, not anded off

    pub cmds: HistoryRing<UserCmd>,           // each message will send several old cmds
    pub cmd_number: i32,                      // incremented each frame

    pub server_id: i32, // included in each client message so the server
                        // can tell if it is for a prior map_restart

    pub cgame_user_cmd_value: i32, // current weapon to add to usercmd_t
    pub cgame_sensitivity: f32,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            snap: ClSnapshot::default(),
            clock: ClockState::default(),
            game_state: GameState::default(),
            mapname: String::new(),
            snapshots: HistoryRing::new(PACKET_BACKUP as usize),
            parse_entities: HistoryRing::new(MAX_PARSE_ENTITIES as usize),
            parse_entities_num: 0,
            cmds: HistoryRing::new(CMD_BACKUP as usize),
            cmd_number: 0,
            server_id: 0,
            cgame_user_cmd_value: 0,
            cgame_sensitivity: 0.0,
        }
    }
}

// ============================================================
// clientConnection_t — cleared on every connect or disconnect
// ============================================================

#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub state: ConnState,
    pub client_num: i32,

    pub server_message_sequence: i32,
    pub last_packet_time: i32, // host wall-clock msec when the last message was received

    // reliable commands received from the server, indexed by sequence
    pub server_commands: HistoryRing<String>,
    pub last_executed_server_command: i32, // last server command grabbed or executed

    // split configstring being reassembled from bcs0/bcs1/bcs2
    pub big_config_string: Option<String>,

    pub demoplaying: bool,
    pub first_demo_frame_skipped: bool,
    pub timedemo: TimedemoStats,
}

impl Default for ClientConnection {
    fn default() -> Self {
        Self {
            state: ConnState::Disconnected,
            client_num: 0,
            server_message_sequence: 0,
            last_packet_time: 0,
            server_commands: HistoryRing::new(MAX_RELIABLE_COMMANDS as usize),
            last_executed_server_command: 0,
            big_config_string: None,
            demoplaying: false,
            first_demo_frame_skipped: false,
            timedemo: TimedemoStats::default(),
        }
    }
}

impl ClientConnection {
    /// Sequence of the newest reliable command received.
    pub fn server_command_sequence(&self) -> i32 {
        self.server_commands.latest()
    }
}

// ============================================================
// clientStatic_t — survives connects and disconnects
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct ClientStatic {
    pub realtime: i32,  // ignores pause
    pub frametime: i32, // msec since last frame

    /// Console text queued for execution by the command buffer.
    pub cbuf: Vec<String>,

    /// Set when a gamestate brought the presentation module up and nobody
    /// has picked up the init parameters yet.
    pub pending_cgame_init: Option<CgameInit>,

    /// Totals of the last timedemo that ran to the end.
    pub timedemo_result: Option<TimedemoSummary>,
}

impl ClientStatic {
    pub fn cbuf_add_text(&mut self, text: &str) {
        self.cbuf.push(text.to_string());
    }

    /// Hand the queued console text to whoever executes it.
    pub fn take_cbuf(&mut self) -> Vec<String> {
        std::mem::take(&mut self.cbuf)
    }
}

// ============================================================
// Client cvars
// ============================================================

/// Handles to the cvars the client reads every frame.
#[derive(Debug, Clone, Copy)]
pub struct ClientCvars {
    pub cl_time_nudge: usize,
    pub cl_show_time_delta: usize,
    pub cl_freeze_demo: usize,
    pub cl_timedemo: usize,
    pub timescale: usize,
    pub active_action: usize,
    pub sv_paused: usize,
    pub cl_paused: usize,
    pub sv_running: usize,
}

impl ClientCvars {
    pub fn register(cvar: &mut CvarContext) -> Self {
        Self {
            cl_time_nudge: cvar.get("cl_timeNudge", "0", CVAR_TEMP),
            cl_show_time_delta: cvar.get("cl_showTimeDelta", "0", CVAR_TEMP),
            cl_freeze_demo: cvar.get("cl_freezeDemo", "0", CVAR_TEMP),
            cl_timedemo: cvar.get("timedemo", "0", 0),
            timescale: cvar.get("timescale", "1", CVAR_CHEAT | CVAR_SYSTEMINFO),
            active_action: cvar.get("activeAction", "", CVAR_TEMP),
            sv_paused: cvar.get("sv_paused", "0", CVAR_ROM),
            cl_paused: cvar.get("cl_paused", "0", CVAR_ROM),
            sv_running: cvar.get("sv_running", "0", CVAR_ROM),
        }
    }
}

// ============================================================
// Session
// ============================================================

/// One client connection, with everything the engine keeps for it.
pub struct ClientSession {
    pub cl: ClientState,
    pub clc: ClientConnection,
    pub cls: ClientStatic,
    pub cvar: CvarContext,
    pub cvars: ClientCvars,
}

impl ClientSession {
    pub fn new() -> Self {
        let mut cvar = CvarContext::new();
        let cvars = ClientCvars::register(&mut cvar);
        Self {
            cl: ClientState::default(),
            clc: ClientConnection::default(),
            cls: ClientStatic::default(),
            cvar,
            cvars,
        }
    }

    /// Paused only applies to a local server.
    pub fn paused(&self) -> bool {
        self.cvar.integer_by_handle(self.cvars.sv_paused) != 0
            && self.cvar.integer_by_handle(self.cvars.cl_paused) != 0
            && self.cvar.integer_by_handle(self.cvars.sv_running) != 0
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use myq3_common::q_shared::CS_SYSTEMINFO;

    #[test]
    fn test_gamestate_budget() {
        let mut gs = GameState::default();
        assert_eq!(gs.data_count(), 1);

        gs.set(CS_SYSTEMINFO, "\\sv_serverid\\7").unwrap();
        assert_eq!(gs.data_count(), 1 + 15);
        assert_eq!(gs.get(CS_SYSTEMINFO), "\\sv_serverid\\7");

        // replacing a string gives its old bytes back
        gs.set(CS_SYSTEMINFO, "x").unwrap();
        assert_eq!(gs.data_count(), 3);
        gs.set(CS_SYSTEMINFO, "").unwrap();
        assert_eq!(gs.data_count(), 1);
    }

    #[test]
    fn test_gamestate_overflow_leaves_table_untouched() {
        let mut gs = GameState::default();
        gs.set(10, "keep").unwrap();
        let huge = "a".repeat(MAX_GAMESTATE_CHARS);
        let err = gs.set(11, &huge).unwrap_err();
        assert!(matches!(err, ComError::Drop(_)));
        assert_eq!(gs.get(11), "");
        assert_eq!(gs.get(10), "keep");
        assert_eq!(gs.data_count(), 6);
    }

    #[test]
    fn test_gamestate_index_out_of_range() {
        let mut gs = GameState::default();
        assert!(gs.set(MAX_CONFIGSTRINGS, "x").is_err());
        assert_eq!(gs.get(MAX_CONFIGSTRINGS), "");
    }

    #[test]
    fn test_session_defaults() {
        let s = ClientSession::new();
        assert_eq!(s.clc.state, ConnState::Disconnected);
        assert_eq!(s.cl.snapshots.capacity(), PACKET_BACKUP as usize);
        assert_eq!(s.cl.parse_entities.capacity(), MAX_PARSE_ENTITIES as usize);
        assert_eq!(s.cl.cmds.capacity(), CMD_BACKUP as usize);
        assert_eq!(s.clc.server_commands.capacity(), MAX_RELIABLE_COMMANDS as usize);
        assert!(!s.paused());
        assert_eq!(s.cvar.value_by_handle(s.cvars.timescale), 1.0);
    }

    #[test]
    fn test_paused_needs_local_server() {
        let mut s = ClientSession::new();
        s.cvar.force_set("sv_paused", "1");
        s.cvar.force_set("cl_paused", "1");
        assert!(!s.paused());
        s.cvar.force_set("sv_running", "1");
        assert!(s.paused());
    }
}
