//! Time-window clock for EyeLabs contests and assignments.
//!
//! [`window::compute_state`] classifies a [`models::TimeWindow`] as upcoming,
//! active or ended; [`ticker::start_ticker`] re-evaluates it on a cadence;
//! [`presentation::format_remaining`] turns the result into display text.

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod presentation;
pub mod ticker;
pub mod window;

pub use clock::{AnchoredClock, Clock, ManualClock, SystemClock};
pub use error::{Result, WindowError};
pub use models::{Phase, TimeWindow, WindowRecord, WindowState};
pub use presentation::{format_remaining, LabelConfig, WindowActions};
pub use ticker::{start_ticker, LiveTicker, StopHandle, DEFAULT_TICK_INTERVAL};
pub use window::compute_state;
