pub mod clear;
pub mod config;
pub mod gesture;
pub mod group;
pub mod timer;
pub mod watch;
