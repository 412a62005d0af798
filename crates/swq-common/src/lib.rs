#![allow(clippy::too_many_arguments, clippy::needless_range_loop, clippy::manual_range_contains)]

pub mod q_shared;
pub mod common;
pub mod cvar;
