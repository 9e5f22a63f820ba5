#![allow(clippy::manual_range_contains, clippy::comparison_chain)]

pub mod q_shared;
pub mod qcommon;
pub mod common;
pub mod cmd;
pub mod cvar;
pub mod ring;
pub mod net_queue;
