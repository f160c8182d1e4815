//! Screen-region bar detection and click timing for the fishing minigame.
//!
//! Each tick a frame of the configured region is classified into indicator
//! (red) and target (green) masks, reduced to vertical spans, and fed through
//! debouncers and an overlap edge detector that decide when to click.

pub mod controller;
pub mod debounce;
pub mod detect;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod platform;
pub mod settings;
pub mod tracker;
pub mod types;
