#![allow(clippy::too_many_arguments, clippy::needless_range_loop, clippy::manual_range_contains)]
// Software surface refresh: light grids, dithered surface blocks, particles

pub mod r_local;
pub mod vid;
pub mod r_light;
pub mod r_surf;
pub mod r_anim;
pub mod r_warp;
pub mod d_view;
pub mod d_part;
pub mod r_cache;
pub mod r_main;
pub mod r_screenshot;
