#![allow(clippy::too_many_arguments, clippy::collapsible_if, clippy::collapsible_else_if,
         clippy::manual_range_contains, clippy::comparison_chain)]
// Client module — snapshot, command and clock services for the presentation module
pub mod client;
pub mod cl_cgame;
pub mod cl_demo;
pub mod cl_input;
pub mod cl_main;
pub mod cl_parse;
pub mod cl_timing;

pub use client::ClientSession;
