//! Tracks how much active time you spend on each website, together with click
//! and keystroke counts. A browser-side bridge reports tab, focus and idle
//! transitions over a local socket; the daemon accrues durations per hostname
//! and the cli renders, exports and resets the collected statistics.

pub mod cli;
pub mod daemon;
pub mod utils;
