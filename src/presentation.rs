// Display strings and permitted actions for a window state
use crate::models::{Phase, WindowState};
use serde::{Deserialize, Serialize};

pub const REMAINING_PLACEHOLDER: &str = "{remaining}";

/// Label templates per phase; `{remaining}` is replaced with the countdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_upcoming_label")]
    pub upcoming: String,
    #[serde(default = "default_active_label")]
    pub active: String,
    #[serde(default = "default_ended_label")]
    pub ended: String,
}

fn default_upcoming_label() -> String {
    "Starts in {remaining}".to_string()
}

fn default_active_label() -> String {
    "{remaining} remaining".to_string()
}

fn default_ended_label() -> String {
    "Ended".to_string()
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            upcoming: default_upcoming_label(),
            active: default_active_label(),
            ended: default_ended_label(),
        }
    }
}

/// Format a countdown as `"1d 02h 03m 04s"`, or `"2h 03m 04s"` under a day
///
/// Rounds up to whole seconds so a running countdown never reads zero early.
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms.div_ceil(1000);
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{}d {:02}h {:02}m {:02}s", days, hours, minutes, seconds)
    } else {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    }
}

pub fn format_remaining(state: &WindowState, labels: &LabelConfig) -> String {
    let template = match state.phase {
        Phase::Upcoming => &labels.upcoming,
        Phase::Active => &labels.active,
        Phase::Ended => return labels.ended.clone(),
    };

    template.replace(REMAINING_PLACEHOLDER, &format_duration(state.remaining_ms))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowActions {
    pub can_join: bool,
    pub can_view: bool,
    pub can_edit: bool,
}

impl WindowActions {
    /// `can_edit` comes from the caller's role check and is passed through
    pub fn for_state(state: &WindowState, can_edit: bool) -> Self {
        Self {
            can_join: state.phase == Phase::Active,
            can_view: true,
            can_edit,
        }
    }
}

/// Everything a view needs to render one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub phase: Phase,
    pub label: String,
    pub remaining_ms: u64,
    pub progress: f64,
    pub actions: WindowActions,
}

pub fn present(state: &WindowState, labels: &LabelConfig, can_edit: bool) -> Presentation {
    Presentation {
        phase: state.phase,
        label: format_remaining(state, labels),
        remaining_ms: state.remaining_ms,
        progress: state.progress(),
        actions: WindowActions::for_state(state, can_edit),
    }
}
