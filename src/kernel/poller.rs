use std::time::Duration;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{SharedState, StateDelta};
use crate::services::backend::BackendClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Waiting for the next tick (or not running at all).
    Idle,
    /// A fetch is in flight.
    Polling,
}

/// Cancellable recurring telemetry fetch.
///
/// Runs one fetch immediately on activation, then one per interval. Each
/// completed fetch is applied to the shared state as a single delta.
pub struct TelemetryPoller {
    interval_tx: watch::Sender<Duration>,
    phase_rx: watch::Receiver<PollPhase>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TelemetryPoller {
    /// Spawns the poll loop. `cancel` may be shared with other in-flight work;
    /// cancelling it stops the loop and discards any fetch still in flight.
    pub fn activate(
        client: BackendClient,
        state: SharedState,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (interval_tx, interval_rx) = watch::channel(period);
        let (phase_tx, phase_rx) = watch::channel(PollPhase::Idle);

        info!(period_secs = period.as_secs(), "telemetry poller activated");
        let task = tokio::spawn(run(client, state, interval_rx, phase_tx, cancel.clone()));

        Self {
            interval_tx,
            phase_rx,
            cancel,
            task: Some(task),
        }
    }

    /// Reschedules the recurring tick; the next fetch happens one new period from now.
    pub fn set_interval(&self, period: Duration) {
        self.interval_tx.send_replace(period);
    }

    pub fn interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    pub fn phase(&self) -> PollPhase {
        *self.phase_rx.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancels pending ticks and waits for the loop to exit.
    pub async fn deactivate(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "poller task ended abnormally");
            }
        }
        info!("telemetry poller deactivated");
    }
}

impl Drop for TelemetryPoller {
    fn drop(&mut self) {
        // No awaiting here; the loop observes the token and exits on its own
        self.cancel.cancel();
    }
}

fn ticker(period: Duration) -> Interval {
    let mut t = interval_at(Instant::now() + period, period);
    t.set_missed_tick_behavior(MissedTickBehavior::Skip);
    t
}

async fn run(
    client: BackendClient,
    state: SharedState,
    mut interval_rx: watch::Receiver<Duration>,
    phase_tx: watch::Sender<PollPhase>,
    cancel: CancellationToken,
) {
    // Immediate first fetch so state is available without waiting a full period
    poll_once(&client, &state, &phase_tx, &cancel).await;

    let mut period = *interval_rx.borrow_and_update();
    let mut cadence = ticker(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = *interval_rx.borrow_and_update();
                if next != period {
                    info!(
                        from_secs = period.as_secs(),
                        to_secs = next.as_secs(),
                        "poll interval changed"
                    );
                    period = next;
                    cadence = ticker(period);
                }
            }
            _ = cadence.tick() => {
                poll_once(&client, &state, &phase_tx, &cancel).await;
            }
        }
    }

    phase_tx.send_replace(PollPhase::Idle);
}

async fn poll_once(
    client: &BackendClient,
    state: &SharedState,
    phase_tx: &watch::Sender<PollPhase>,
    cancel: &CancellationToken,
) {
    phase_tx.send_replace(PollPhase::Polling);

    let result = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("fetch abandoned on teardown");
            phase_tx.send_replace(PollPhase::Idle);
            return;
        }
        r = client.fetch_telemetry() => r,
    };

    let delta = match result {
        Ok(sample) => {
            debug!(
                heart_rate = sample.heart_rate,
                saturation = sample.oxygen_saturation,
                "sample received"
            );
            StateDelta::SampleReceived { sample, at: Utc::now() }
        }
        Err(e) => {
            warn!(error = %e, "telemetry fetch failed; marking disconnected");
            StateDelta::FetchFailed
        }
    };

    {
        let mut guard = state.lock().await;
        if cancel.is_cancelled() {
            debug!("response arrived after teardown; discarded");
        } else {
            guard.reduce(delta);
        }
    }
    phase_tx.send_replace(PollPhase::Idle);
}
