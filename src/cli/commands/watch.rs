use crate::cli::WindowArgs;
use eyelabs_timer::clock::AnchoredClock;
use eyelabs_timer::config::Config;
use eyelabs_timer::error::{Result, WindowError};
use eyelabs_timer::presentation::format_remaining;
use eyelabs_timer::ticker::LiveTicker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub async fn execute(window: WindowArgs, interval_ms: Option<u64>) -> Result<()> {
    let config = Config::load()?;
    let window = window.resolve()?;

    let interval = match interval_ms {
        Some(0) => {
            return Err(WindowError::Schedule(
                "--interval-ms must be greater than zero".to_string(),
            ))
        }
        Some(ms) => Duration::from_millis(ms),
        None => config.ticker.interval(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut ticker = LiveTicker::with_clock(Arc::new(AnchoredClock::from_system())).interval(interval);
    ticker.activate(window, move |state| {
        let _ = tx.send(state);
    })?;

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Some(state) => {
                    println!("[{}] {}", state.phase.as_str(), format_remaining(&state, &config.labels));
                }
                // Ticker finished after delivering Ended
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping ticker");
                ticker.deactivate();
                break;
            }
        }
    }

    Ok(())
}
