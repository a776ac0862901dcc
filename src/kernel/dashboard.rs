use std::future::Future;
use std::time::Duration;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::{ConfigError, ConfigField, DashboardConfig};
use super::poller::{PollPhase, TelemetryPoller};
use super::session::{PassOutcome, SessionPhase};
use super::state::{DashboardState, SharedState, StateDelta};
use crate::services::backend::wire::SessionReport;
use crate::services::backend::{BackendClient, BackendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    Start,
    Stop,
    Pass,
}

impl std::fmt::Display for GameAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GameAction::Start => "start",
            GameAction::Stop => "stop",
            GameAction::Pass => "pass",
        };
        f.write_str(name)
    }
}

/// A game action that produced no result. State is unchanged in every case.
#[derive(Error, Debug)]
pub enum GameActionError {
    #[error("cannot {action} while session is {phase:?}")]
    InvalidState { action: GameAction, phase: SessionPhase },
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The session the action was issued against ended before it completed.
    #[error("{action} belongs to a session that has already ended")]
    SessionEnded { action: GameAction },
    #[error("dashboard has been torn down")]
    TornDown,
}

impl GameActionError {
    /// Logical refusal by the game server, as opposed to a network failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, GameActionError::Backend(BackendError::Rejected(_)))
    }
}

/// Top-level view: owns the state container, the backend client, the poller
/// and the teardown token shared by all in-flight work.
///
/// Every method takes `&self`, so the dashboard can sit behind an `Arc` and be
/// torn down while game requests are still in flight.
pub struct Dashboard {
    client: BackendClient,
    state: SharedState,
    cancel: CancellationToken,
    poller: Mutex<Option<TelemetryPoller>>,
}

impl Dashboard {
    pub fn new(client: BackendClient, config: DashboardConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            state: DashboardState::shared(config)?,
            cancel: CancellationToken::new(),
            poller: Mutex::new(None),
        })
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Starts telemetry polling. Must be called inside a Tokio runtime.
    /// A no-op if already active or torn down.
    pub async fn activate(&self) {
        let mut slot = self.poller.lock().await;
        if slot.is_some() || self.cancel.is_cancelled() {
            return;
        }
        let period = Duration::from_secs(self.state.lock().await.config().poll_interval_secs);
        *slot = Some(TelemetryPoller::activate(
            self.client.clone(),
            self.state.clone(),
            period,
            self.cancel.clone(),
        ));
    }

    pub async fn poll_phase(&self) -> PollPhase {
        self.poller.lock().await.as_ref().map_or(PollPhase::Idle, |p| p.phase())
    }

    pub async fn is_polling(&self) -> bool {
        self.poller.lock().await.as_ref().is_some_and(|p| p.is_active())
    }

    /// Cancels the poll timer and every in-flight request. No state mutation
    /// happens after this returns.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        let poller = self.poller.lock().await.take();
        if let Some(mut poller) = poller {
            poller.deactivate().await;
        }
        self.state.lock().await.reduce(StateDelta::TornDown);
        info!("dashboard torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn start_session(&self) -> Result<(), GameActionError> {
        self.guard(GameAction::Start, SessionPhase::Stopped).await?;
        self.request(self.client.start_session()).await?;
        self.apply(GameAction::Start, StateDelta::SessionStarted { at: Utc::now() })
            .await?;
        info!("session started");
        Ok(())
    }

    pub async fn stop_session(&self) -> Result<Option<SessionReport>, GameActionError> {
        let epoch = self.guard(GameAction::Stop, SessionPhase::Running).await?;
        let report = self.request(self.client.stop_session()).await?;
        self.apply(GameAction::Stop, StateDelta::SessionStopped { at: Utc::now(), epoch })
            .await?;
        info!(report = ?report, "session stopped");
        Ok(report)
    }

    pub async fn execute_pass(&self) -> Result<PassOutcome, GameActionError> {
        let epoch = self.guard(GameAction::Pass, SessionPhase::Running).await?;
        let outcome = self.request(self.client.execute_pass()).await?;
        let delta = StateDelta::PassScored { outcome: outcome.clone(), at: Utc::now(), epoch };
        self.apply(GameAction::Pass, delta).await?;
        info!(
            points = outcome.points,
            quality = ?outcome.quality,
            streak = outcome.streak,
            "pass scored"
        );
        Ok(outcome)
    }

    /// Applies one named field. On failure nothing changes.
    pub async fn update_config(&self, field: ConfigField) -> Result<DashboardConfig, ConfigError> {
        self.commit_config(|current| current.with_field(field)).await
    }

    /// Replaces the whole configuration after validating it.
    pub async fn replace_config(&self, config: DashboardConfig) -> Result<(), ConfigError> {
        self.commit_config(move |_| config.validate().map(|_| config))
            .await
            .map(|_| ())
    }

    pub async fn reset_config(&self) -> Result<(), ConfigError> {
        self.replace_config(DashboardConfig::default()).await
    }

    /// Builds and applies the next config under one lock so concurrent updates
    /// cannot interleave.
    async fn commit_config(
        &self,
        build: impl FnOnce(&DashboardConfig) -> Result<DashboardConfig, ConfigError>,
    ) -> Result<DashboardConfig, ConfigError> {
        // Lock order is poller then state, same as `activate`
        let poller = self.poller.lock().await;
        let mut state = self.state.lock().await;
        if self.cancel.is_cancelled() {
            return Err(ConfigError::TornDown);
        }
        let next = build(state.config())?;
        let interval_changed = state.config().poll_interval_secs != next.poll_interval_secs;
        if !state.reduce(StateDelta::ConfigReplaced(next.clone())) {
            return Err(ConfigError::TornDown);
        }
        if interval_changed {
            if let Some(poller) = poller.as_ref() {
                poller.set_interval(Duration::from_secs(next.poll_interval_secs));
            }
        }
        info!(
            interval_secs = next.poll_interval_secs,
            history_capacity = next.history_capacity,
            "configuration applied"
        );
        Ok(next)
    }

    /// Checks the phase before any request is sent. Returns the epoch of the
    /// session the action is issued against.
    async fn guard(
        &self,
        action: GameAction,
        required: SessionPhase,
    ) -> Result<u64, GameActionError> {
        if self.cancel.is_cancelled() {
            return Err(GameActionError::TornDown);
        }
        let state = self.state.lock().await;
        let phase = state.session().phase;
        if phase != required {
            return Err(GameActionError::InvalidState { action, phase });
        }
        Ok(state.session_epoch())
    }

    /// Races a backend request against teardown.
    async fn request<T>(
        &self,
        fut: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, GameActionError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(GameActionError::TornDown),
            r = fut => r.map_err(|e| {
                warn!(error = %e, "game request failed");
                GameActionError::Backend(e)
            }),
        }
    }

    /// Applies the action's delta. A delta the state discards surfaces as an
    /// error, so the caller never sees a result that was not recorded.
    async fn apply(&self, action: GameAction, delta: StateDelta) -> Result<(), GameActionError> {
        let mut state = self.state.lock().await;
        if self.cancel.is_cancelled() {
            return Err(GameActionError::TornDown);
        }
        if delta.session_epoch().is_some_and(|epoch| epoch != state.session_epoch()) {
            warn!(%action, "session ended while the request was in flight; result discarded");
            return Err(GameActionError::SessionEnded { action });
        }
        if !state.reduce(delta) {
            let phase = state.session().phase;
            warn!(%action, ?phase, "result no longer applies; discarded");
            return Err(GameActionError::InvalidState { action, phase });
        }
        Ok(())
    }
}
