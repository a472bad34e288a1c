use crate::cli::WindowArgs;
use chrono::{DateTime, Utc};
use eyelabs_timer::clock::{Clock, SystemClock};
use eyelabs_timer::config::Config;
use eyelabs_timer::error::{Result, WindowError};
use eyelabs_timer::models::parse_start_time;
use eyelabs_timer::presentation::present;
use eyelabs_timer::window::compute_state;

pub fn execute(window: WindowArgs, now: Option<String>, json: bool, can_edit: bool) -> Result<()> {
    let config = Config::load()?;
    let window = window.resolve()?;
    let now = resolve_now(now.as_deref(), &SystemClock)?;

    let state = compute_state(&window, now)?;
    let presentation = present(&state, &config.labels, can_edit);

    if json {
        println!("{}", serde_json::to_string_pretty(&presentation)?);
    } else {
        println!("[{}] {}", state.phase.as_str(), presentation.label);
    }

    Ok(())
}

fn resolve_now(value: Option<&str>, clock: &dyn Clock) -> Result<DateTime<Utc>> {
    match value {
        Some(value) => parse_start_time(value).map_err(|_| {
            WindowError::InvalidWindow(format!(
                "--now '{}' is not a valid ISO-8601 instant",
                value
            ))
        }),
        None => Ok(clock.now()),
    }
}
