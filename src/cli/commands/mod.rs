pub mod completions;
pub mod config;
pub mod state;
pub mod watch;
