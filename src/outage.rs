// Connectivity outage state machine: debounces the first failed probe, warns while the
// outage lasts, and escalates to recovery once it exceeds the timeout.

use std::time::{Duration, Instant};

use serde::Deserialize;

/// Current connectivity state. `since` is the instant of the first failed check of the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Connected,
    Disconnected { since: Instant },
}

/// What the caller should do after a check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutageAction {
    None,
    Restored,
    WarnOngoing { elapsed_minutes: f64 },
    TriggerRecovery { elapsed_minutes: f64 },
}

/// Whether recovery fires on every failing check past the timeout or once per outage episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    #[default]
    EveryCheck,
    OncePerEpisode,
}

#[derive(Debug)]
pub struct OutageTracker {
    state: ConnectivityState,
    policy: RecoveryPolicy,
    recovery_triggered: bool,
}

impl OutageTracker {
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            state: ConnectivityState::Connected,
            policy,
            recovery_triggered: false,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Feeds one probe result into the state machine.
    ///
    /// `since` is set only on the Connected -> Disconnected edge and cleared only on
    /// Disconnected -> Connected; repeated failures never move it.
    pub fn check(&mut self, reachable: bool, now: Instant, timeout_minutes: f64) -> OutageAction {
        match (self.state, reachable) {
            (ConnectivityState::Connected, true) => OutageAction::None,
            (ConnectivityState::Connected, false) => {
                self.state = ConnectivityState::Disconnected { since: now };
                OutageAction::None
            }
            (ConnectivityState::Disconnected { .. }, true) => {
                self.state = ConnectivityState::Connected;
                self.recovery_triggered = false;
                OutageAction::Restored
            }
            (ConnectivityState::Disconnected { since }, false) => {
                let elapsed_minutes = elapsed_minutes(since, now);
                if elapsed_minutes < timeout_minutes {
                    return OutageAction::WarnOngoing { elapsed_minutes };
                }
                match self.policy {
                    RecoveryPolicy::OncePerEpisode if self.recovery_triggered => {
                        OutageAction::WarnOngoing { elapsed_minutes }
                    }
                    _ => {
                        self.recovery_triggered = true;
                        OutageAction::TriggerRecovery { elapsed_minutes }
                    }
                }
            }
        }
    }
}

fn elapsed_minutes(since: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(since).as_secs_f64() / 60.0
}

/// Outage duration as a `Duration`, for logging. Zero when connected.
pub fn outage_duration(state: ConnectivityState, now: Instant) -> Duration {
    match state {
        ConnectivityState::Connected => Duration::ZERO,
        ConnectivityState::Disconnected { since } => now.saturating_duration_since(since),
    }
}
