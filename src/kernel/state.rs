use std::sync::Arc;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::aggregate::{summarize_history, summarize_hitmits, HistorySummary, HitmitSummary};
use super::classifier::{
    classify_heart_rate, classify_saturation, Classification, HeartRateTier, SaturationTier,
};
use super::config::{ConfigError, DashboardConfig};
use super::history::HistoryBuffer;
use super::sample::TelemetrySample;
use super::session::{GameSession, Hitmit, PassOutcome, PassQuality};

/// Handle shared by the dashboard, the poller and in-flight game actions.
pub type SharedState = Arc<Mutex<DashboardState>>;

/// Strict state delta. This is the ONLY way dashboard state mutates.
#[derive(Debug, Clone)]
pub enum StateDelta {
    SampleReceived { sample: TelemetrySample, at: DateTime<Utc> },
    FetchFailed,
    SessionStarted { at: DateTime<Utc> },
    /// `epoch` is the session the stop was issued against.
    SessionStopped { at: DateTime<Utc>, epoch: u64 },
    /// `epoch` is the session the pass was issued against.
    PassScored { outcome: PassOutcome, at: DateTime<Utc>, epoch: u64 },
    /// Must already be validated.
    ConfigReplaced(DashboardConfig),
    TornDown,
}

impl StateDelta {
    /// Session the delta belongs to, for deltas that only make sense inside one.
    pub fn session_epoch(&self) -> Option<u64> {
        match self {
            StateDelta::SessionStopped { epoch, .. } | StateDelta::PassScored { epoch, .. } => {
                Some(*epoch)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    config: DashboardConfig,
    history: HistoryBuffer,
    current: Option<TelemetrySample>,
    session: GameSession,
    // Bumped on every successful start
    session_epoch: u64,
    hitmits: Vec<Hitmit>,
    connected: bool,
    last_updated: Option<DateTime<Utc>>,
    torn_down: bool,
    // Monotonic; bumped on every applied delta
    pub version: u64,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let history = HistoryBuffer::new(config.history_capacity)?;
        Ok(Self {
            config,
            history,
            current: None,
            session: GameSession::new(),
            session_epoch: 0,
            hitmits: Vec::new(),
            connected: false,
            last_updated: None,
            torn_down: false,
            version: 0,
        })
    }

    pub fn shared(config: DashboardConfig) -> Result<SharedState, ConfigError> {
        Ok(Arc::new(Mutex::new(Self::new(config)?)))
    }

    /// Pure reduction: State + Delta -> Mutated State.
    ///
    /// Returns whether the delta was applied. It is discarded after `TornDown`,
    /// when the session phase does not allow it, or when it was issued against
    /// an earlier session.
    pub fn reduce(&mut self, delta: StateDelta) -> bool {
        if self.torn_down {
            debug!(?delta, "discarding delta after teardown");
            return false;
        }
        if let Some(epoch) = delta.session_epoch() {
            if epoch != self.session_epoch {
                debug!(
                    epoch,
                    current = self.session_epoch,
                    "discarding delta from an ended session"
                );
                return false;
            }
        }

        let applied = match delta {
            StateDelta::SampleReceived { sample, at } => {
                self.connected = true;
                self.last_updated = Some(at);
                self.history.append(sample.clone());
                self.current = Some(sample);
                true
            }
            StateDelta::FetchFailed => {
                self.connected = false;
                true
            }
            StateDelta::SessionStarted { at } => {
                let started = self.session.begin(at);
                if started {
                    self.session_epoch += 1;
                    self.hitmits.clear();
                } else {
                    debug!("session already running; start ignored");
                }
                started
            }
            StateDelta::SessionStopped { at, .. } => {
                let stopped = self.session.end(at);
                if !stopped {
                    debug!("session not running; stop ignored");
                }
                stopped
            }
            StateDelta::PassScored { outcome, at, .. } => {
                let recorded = self.session.record_pass(&outcome);
                if !recorded {
                    debug!("session not running; pass ignored");
                } else if outcome.quality == PassQuality::Perfect {
                    self.hitmits.push(Hitmit::perfect_pass(&outcome, at));
                }
                recorded
            }
            StateDelta::ConfigReplaced(config) => {
                match self.history.set_capacity(config.history_capacity) {
                    Ok(()) => {
                        self.config = config;
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "rejected unvalidated config");
                        false
                    }
                }
            }
            StateDelta::TornDown => {
                self.torn_down = true;
                true
            }
        };

        if applied {
            self.version += 1;
        }
        applied
    }

    // Read-only accessors for presentation

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn current(&self) -> Option<&TelemetrySample> {
        self.current.as_ref()
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Identifies the current (or most recent) session; 0 before the first start.
    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    pub fn hitmits(&self) -> &[Hitmit] {
        &self.hitmits
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn seconds_since_update(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_updated.map(|t| (now - t).num_seconds().max(0))
    }

    pub fn heart_rate_status(&self) -> Option<Classification<HeartRateTier>> {
        self.current
            .as_ref()
            .map(|s| classify_heart_rate(s.heart_rate, &self.config.thresholds))
    }

    pub fn saturation_status(&self) -> Option<Classification<SaturationTier>> {
        self.current
            .as_ref()
            .map(|s| classify_saturation(s.oxygen_saturation, &self.config.thresholds))
    }

    pub fn history_summary(&self) -> HistorySummary {
        summarize_history(&self.history)
    }

    pub fn hitmit_summary(&self) -> HitmitSummary {
        summarize_hitmits(&self.hitmits)
    }
}
