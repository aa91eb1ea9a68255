#![cfg_attr(not(test), no_std)]

// must come first so the logging macros are visible in every module
mod fmt;

pub mod config;
pub mod indicator;
pub mod interval;
pub mod link;
pub mod net;
pub mod scheduler;
pub mod time;
