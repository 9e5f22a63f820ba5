// q_shared.rs — foundational types shared by the client and the presentation module

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

// ============================================================
// String limits
// ============================================================

pub const MAX_STRING_CHARS: usize = 1024;  // max length of a string passed to Cmd_TokenizeString
pub const MAX_STRING_TOKENS: usize = 1024; // max tokens resulting from Cmd_TokenizeString
pub const MAX_TOKEN_CHARS: usize = 1024;   // max length of an individual token

pub const MAX_INFO_STRING: usize = 1024;
pub const MAX_INFO_KEY: usize = 1024;
pub const MAX_INFO_VALUE: usize = 1024;

/// Upper bound for a config string reassembled from `bcs0`/`bcs1`/`bcs2` pieces.
pub const BIG_INFO_STRING: usize = 8192;

// ============================================================
// Error codes (Com_Error parm)
// ============================================================

pub const ERR_FATAL: i32 = 0;            // exit the entire game with a popup window
pub const ERR_DROP: i32 = 1;             // print to console and disconnect from game
pub const ERR_SERVERDISCONNECT: i32 = 2; // don't kill server

// ============================================================
// Config strings
// ============================================================

pub const MAX_CONFIGSTRINGS: usize = 1024;

pub const CS_SERVERINFO: usize = 0; // an info string with all the serverinfo cvars
pub const CS_SYSTEMINFO: usize = 1; // an info string for server system to client system configuration

/// Total characters of all config strings in one gamestate, including terminators.
pub const MAX_GAMESTATE_CHARS: usize = 16000;

// ============================================================
// Snapshot limits
// ============================================================

pub const MAX_MAP_AREA_BYTES: usize = 32; // bit vector of area visibility

pub const MAX_STATS: usize = 16;
pub const MAX_PERSISTANT: usize = 16;
pub const MAX_POWERUPS: usize = 16;
pub const MAX_WEAPONS: usize = 16;
pub const MAX_PS_EVENTS: usize = 2;

bitflags::bitflags! {
    /// Flags carried by every snapshot.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SnapFlags: i32 {
        /// The server held this snapshot back to honour the client's rate.
        const RATE_DELAYED = 0x01;
        /// Snapshot used during connection and for zombies.
        const NOT_ACTIVE   = 0x02;
        /// Toggled every map_restart so transitions can be detected.
        const SERVERCOUNT  = 0x04;
    }
}
pub const SNAPFLAG_RATE_DELAYED: SnapFlags = SnapFlags::RATE_DELAYED;
pub const SNAPFLAG_NOT_ACTIVE: SnapFlags = SnapFlags::NOT_ACTIVE;
pub const SNAPFLAG_SERVERCOUNT: SnapFlags = SnapFlags::SERVERCOUNT;

// ============================================================
// Usercmd
// ============================================================

/// One sampled input frame. Sent to the server each client frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCmd {
    pub server_time: i32,
    pub angles: [i32; 3],
    pub buttons: i32,
    pub weapon: u8,
    pub forwardmove: i8,
    pub rightmove: i8,
    pub upmove: i8,
}

// ============================================================
// Entity state
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrType {
    #[default]
    Stationary,
    Interpolate, // non-parametric, but interpolate between snapshots
    Linear,
    LinearStop,
    Sine, // value = base + sin( time / duration ) * delta
    Gravity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trajectory {
    pub tr_type: TrType,
    pub tr_time: i32,
    pub tr_duration: i32, // if non 0, tr_time + tr_duration = stop time
    pub tr_base: Vec3,
    pub tr_delta: Vec3, // velocity, etc
}

/// An entity as transmitted in a snapshot. The presentation module
/// interpolates between two of these.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntityState {
    pub number: i32, // entity index
    pub e_type: i32,
    pub e_flags: i32,

    pub pos: Trajectory,  // for calculating position
    pub apos: Trajectory, // for calculating angles

    pub time: i32,
    pub time2: i32,

    pub origin: Vec3,
    pub origin2: Vec3,

    pub angles: Vec3,
    pub angles2: Vec3,

    pub other_entity_num: i32, // shotgun sources, etc
    pub other_entity_num2: i32,

    pub ground_entity_num: i32, // -1 = in air

    pub constant_light: i32, // r + (g<<8) + (b<<16) + (intensity<<24)
    pub loop_sound: i32,     // constantly loop this sound

    pub modelindex: i32,
    pub modelindex2: i32,
    pub client_num: i32, // 0 to (MAX_CLIENTS - 1), for players and corpses
    pub frame: i32,

    pub solid: i32, // for client side prediction, trap_linkentity sets this properly

    pub event: i32, // impulse events -- muzzle flashes, footsteps, etc
    pub event_parm: i32,

    pub powerups: i32, // bit flags
    pub weapon: i32,   // determines weapon and flash model, etc
    pub legs_anim: i32,
    pub torso_anim: i32,

    pub generic1: i32,
}

// ============================================================
// Player state
// ============================================================

/// The local player's full simulation state, as carried by a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerState {
    pub command_time: i32, // cmd->serverTime of last executed command
    pub pm_type: i32,
    pub bob_cycle: i32,
    pub pm_flags: i32,
    pub pm_time: i32,

    pub origin: Vec3,
    pub velocity: Vec3,
    pub weapon_time: i32,
    pub gravity: i32,
    pub speed: i32,
    pub delta_angles: [i32; 3], // add to command angles to get view direction

    pub ground_entity_num: i32,

    pub legs_timer: i32,
    pub legs_anim: i32,
    pub torso_timer: i32,
    pub torso_anim: i32,

    pub movement_dir: i32,
    pub grapple_point: Vec3,

    pub e_flags: i32,

    pub event_sequence: i32,
    pub events: [i32; MAX_PS_EVENTS],
    pub event_parms: [i32; MAX_PS_EVENTS],

    pub external_event: i32,
    pub external_event_parm: i32,
    pub external_event_time: i32,

    pub client_num: i32,
    pub weapon: i32,
    pub weaponstate: i32,

    pub viewangles: Vec3,
    pub viewheight: i32,

    pub damage_event: i32,
    pub damage_yaw: i32,
    pub damage_pitch: i32,
    pub damage_count: i32,

    pub stats: [i32; MAX_STATS],
    pub persistant: [i32; MAX_PERSISTANT],
    pub powerups: [i32; MAX_POWERUPS],
    pub ammo: [i32; MAX_WEAPONS],

    pub generic1: i32,
    pub loop_sound: i32,
    pub jumppad_ent: i32,

    // not communicated over the net at all
    pub ping: i32,
    pub pmove_framecount: i32,
    pub jumppad_frame: i32,
    pub entity_event_sequence: i32,
}

// ============================================================
// Info string functions
// ============================================================

/// Search info string `s` for `key`, return value or empty string.
pub fn info_value_for_key(s: &str, key: &str) -> String {
    let body = s.strip_prefix('\\').unwrap_or(s);
    let mut fields = body.split('\\');

    while let Some(pkey) = fields.next() {
        let value = fields.next().unwrap_or("");
        if pkey.eq_ignore_ascii_case(key) {
            return value.to_string();
        }
    }

    String::new()
}

/// Every key/value pair of an info string, in order.
pub fn info_pairs(s: &str) -> Vec<(&str, &str)> {
    let body = s.strip_prefix('\\').unwrap_or(s);
    let mut fields = body.split('\\');
    let mut pairs = Vec::new();

    while let Some(key) = fields.next() {
        if key.is_empty() {
            break;
        }
        pairs.push((key, fields.next().unwrap_or("")));
    }

    pairs
}

/// C `atoi`: optional sign and leading digits, anything else stops the scan.
pub fn atoi(s: &str) -> i32 {
    let s = s.trim_start();
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + (b - b'0') as i64).min(i32::MAX as i64 + 1);
    }
    if neg {
        value = -value;
    }
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

// ============================================================
// Tests
// ============================================================
