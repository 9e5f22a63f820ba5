// qcommon.rs — definitions common between client and server, but not the presentation module

// ============================================================
// Protocol history sizes
// ============================================================

/// Number of old snapshots the client keeps for delta decoding and
/// for the presentation module to poll.
pub const PACKET_BACKUP: i32 = 32;
pub const PACKET_MASK: i32 = PACKET_BACKUP - 1;

/// Max number of reliable commands that can be outstanding in one direction.
pub const MAX_RELIABLE_COMMANDS: i32 = 64;

/// Number of locally generated user commands kept for retransmission
/// and prediction. Allows a lot of backups for very fast systems.
pub const CMD_BACKUP: i32 = 64;
pub const CMD_MASK: i32 = CMD_BACKUP - 1;

// Sanity checks on the power-of-two requirement of every history ring.
const _: () = assert!(PACKET_BACKUP & PACKET_MASK == 0);
const _: () = assert!(CMD_BACKUP & CMD_MASK == 0);
const _: () = assert!(MAX_RELIABLE_COMMANDS & (MAX_RELIABLE_COMMANDS - 1) == 0);

// ============================================================
// Connection state
// ============================================================

/// Connection state of the client, mirrored to the presentation module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(i32)]
pub enum ConnState {
    #[default]
    Uninitialized = 0,
    Disconnected = 1, // not talking to a server
    Connecting = 2,   // sending request packets to the server
    Challenging = 3,  // sending challenge packets to the server
    Connected = 4,    // netchan_t established, getting gamestate
    Loading = 5,      // only during cgame initialization, never during main loop
    Primed = 6,       // got gamestate, waiting for first frame
    Active = 7,       // game views should be displayed
}
