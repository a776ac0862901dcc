mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;

use athlete_pulse::kernel::config::{ConfigError, ConfigField, DashboardConfig};
use athlete_pulse::kernel::dashboard::{GameAction, GameActionError};
use athlete_pulse::kernel::poller::PollPhase;
use athlete_pulse::kernel::sample::TelemetrySample;
use athlete_pulse::kernel::session::{PassQuality, SessionPhase};
use athlete_pulse::kernel::state::StateDelta;
use athlete_pulse::services::backend::{BackendClient, BackendError};
use athlete_pulse::Dashboard;
use common::{eventually, pass_body, pass_rejected, spawn, telemetry_body, MockBackend, Reply};

const WAIT: Duration = Duration::from_secs(3);

async fn setup() -> (Arc<MockBackend>, Dashboard) {
    let mock = Arc::new(MockBackend::default());
    let url = spawn(mock.clone()).await;
    let dashboard = Dashboard::new(BackendClient::new(&url), DashboardConfig::default()).unwrap();
    (mock, dashboard)
}

#[tokio::test]
async fn test_full_game_flow() {
    let (mock, dashboard) = setup().await;
    mock.push_pass(Reply::Json(pass_body(3, "Bom", 1)));
    mock.push_pass(Reply::Json(pass_body(3, "Bom", 2)));
    mock.push_pass(Reply::Json(pass_body(4, "Perfeito", 3)));
    mock.push_pass(Reply::Json(pass_body(1, "Fraco", 1)));

    dashboard.start_session().await.unwrap();
    for _ in 0..4 {
        dashboard.execute_pass().await.unwrap();
    }

    {
        let state = dashboard.state();
        let guard = state.lock().await;
        let session = guard.session();
        assert_eq!(session.phase, SessionPhase::Running);
        assert_eq!(session.passes_attempted, 4);
        assert_eq!(session.perfect_passes, 1);
        assert_eq!(session.score, 11);
        assert_eq!(session.best_streak, 3);
        assert_eq!(session.current_streak, 1);
        assert_eq!(guard.hitmits().len(), 1);
        assert_eq!(guard.hitmits()[0].points, 4);
    }

    let report = dashboard.stop_session().await.unwrap();
    assert!(report.is_none());
    assert_eq!(dashboard.state().lock().await.session().phase, SessionPhase::Stopped);
    assert_eq!(mock.start_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mock.stop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_actions_outside_valid_phase_are_refused_locally() {
    let (mock, dashboard) = setup().await;

    let stop = dashboard.stop_session().await.unwrap_err();
    assert!(matches!(
        stop,
        GameActionError::InvalidState { action: GameAction::Stop, phase: SessionPhase::Stopped }
    ));
    assert!(matches!(dashboard.execute_pass().await, Err(GameActionError::InvalidState { .. })));

    dashboard.start_session().await.unwrap();
    assert!(matches!(
        dashboard.start_session().await,
        Err(GameActionError::InvalidState {
            action: GameAction::Start,
            phase: SessionPhase::Running
        })
    ));

    // Refused actions never reach the backend
    assert_eq!(mock.stop_calls.load(Ordering::SeqCst), 0);
    assert_eq!(mock.pass_calls.load(Ordering::SeqCst), 0);
    assert_eq!(mock.start_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backend_failure_leaves_state_unchanged() {
    let (mock, dashboard) = setup().await;
    *mock.start.lock().unwrap() = Reply::Status(500);

    let version = dashboard.state().lock().await.version;
    let err = dashboard.start_session().await.unwrap_err();
    assert!(matches!(err, GameActionError::Backend(BackendError::Status(_))));
    assert!(!err.is_rejection());

    let state = dashboard.state();
    let guard = state.lock().await;
    assert_eq!(guard.session().phase, SessionPhase::Stopped);
    assert_eq!(guard.version, version);
}

#[tokio::test]
async fn test_failed_pass_keeps_counters() {
    let (mock, dashboard) = setup().await;
    dashboard.start_session().await.unwrap();

    mock.push_pass(Reply::Json(pass_body(4, "Perfeito", 1)));
    mock.push_pass(Reply::Status(502));
    mock.push_pass(Reply::Json(pass_rejected("Dados da atleta não disponíveis")));

    dashboard.execute_pass().await.unwrap();

    let network = dashboard.execute_pass().await.unwrap_err();
    assert!(!network.is_rejection());

    let rejected = dashboard.execute_pass().await.unwrap_err();
    assert!(rejected.is_rejection());
    assert!(rejected.to_string().contains("não disponíveis"));

    let state = dashboard.state();
    let guard = state.lock().await;
    assert_eq!(guard.session().passes_attempted, 1);
    assert_eq!(guard.session().score, 4);
    assert_eq!(guard.hitmits().len(), 1);
}

#[tokio::test]
async fn test_stop_surfaces_report() {
    let (mock, dashboard) = setup().await;
    *mock.stop.lock().unwrap() = Reply::Json(serde_json::json!({
        "sucesso": true,
        "relatorio": {
            "pontuacao_total": 8,
            "passes_executados": 2,
            "passes_perfeitos": 1,
            "melhor_sequencia": 2,
            "tempo_total": 41
        }
    }));

    dashboard.start_session().await.unwrap();
    let report = dashboard.stop_session().await.unwrap().unwrap();
    assert_eq!(report.total_score, 8);
    assert_eq!(report.total_secs, 41);
}

#[tokio::test]
async fn test_teardown_discards_in_flight_pass() {
    let (mock, dashboard) = setup().await;
    let dashboard = Arc::new(dashboard);
    dashboard.start_session().await.unwrap();

    mock.push_pass(Reply::Delayed(Duration::from_millis(400), pass_body(4, "Perfeito", 1)));
    let pending = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.execute_pass().await })
    };

    let m = mock.clone();
    let ready = eventually(
        || {
            let m = m.clone();
            async move { m.pass_calls.load(Ordering::SeqCst) == 1 }
        },
        WAIT,
    );
    assert!(ready.await);

    dashboard.teardown().await;
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(GameActionError::TornDown)));

    {
        let state = dashboard.state();
        let guard = state.lock().await;
        assert!(guard.is_torn_down());
        assert_eq!(guard.session().passes_attempted, 0);
        assert!(guard.hitmits().is_empty());
    }

    assert!(dashboard.is_torn_down());
    assert!(matches!(dashboard.stop_session().await, Err(GameActionError::TornDown)));
}

#[tokio::test]
async fn test_activate_polls_and_teardown_stops() {
    let (mock, dashboard) = setup().await;
    mock.set_telemetry(Reply::Json(telemetry_body(155, 94.0)));

    dashboard.activate().await;
    dashboard.activate().await;
    assert!(dashboard.is_polling().await);

    let state = dashboard.state();
    let s = state.clone();
    let ready = eventually(
        || {
            let s = s.clone();
            async move { s.lock().await.current().is_some() }
        },
        WAIT,
    );
    assert!(ready.await);

    {
        let guard = state.lock().await;
        assert_eq!(guard.heart_rate_status().unwrap().label(), "Very High");
        assert_eq!(guard.saturation_status().unwrap().label(), "Low");
        assert!(guard.seconds_since_update(Utc::now()).is_some());
    }

    dashboard.teardown().await;
    assert!(!dashboard.is_polling().await);
    assert_eq!(dashboard.poll_phase().await, PollPhase::Idle);

    let calls = mock.telemetry_calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.telemetry_calls(), calls);

    // No restart after teardown
    dashboard.activate().await;
    assert!(!dashboard.is_polling().await);
}

#[tokio::test]
async fn test_capacity_update_truncates_history() {
    let (_mock, dashboard) = setup().await;
    let state = dashboard.state();
    {
        let mut guard = state.lock().await;
        for bpm in 60..100 {
            guard.reduce(StateDelta::SampleReceived {
                sample: TelemetrySample::new("a", bpm, 97.0),
                at: Utc::now(),
            });
        }
        assert_eq!(guard.history().len(), 40);
    }

    let applied = dashboard.update_config(ConfigField::HistoryCapacity(15)).await.unwrap();
    assert_eq!(applied.history_capacity, 15);

    let guard = state.lock().await;
    assert_eq!(guard.history().len(), 15);
    assert_eq!(guard.history().iter().next().map(|s| s.heart_rate), Some(85));
    assert_eq!(guard.config().history_capacity, 15);
}

#[tokio::test]
async fn test_invalid_config_is_not_applied() {
    let (_mock, dashboard) = setup().await;
    let before = dashboard.state().lock().await.config().clone();

    assert!(matches!(
        dashboard.update_config(ConfigField::PollInterval(0)).await,
        Err(ConfigError::PollInterval(0))
    ));
    assert!(dashboard.update_config(ConfigField::HeartRateHigh(90)).await.is_err());

    let mut bad = DashboardConfig::default();
    bad.thresholds.saturation_low = 99.0;
    assert!(dashboard.replace_config(bad).await.is_err());

    assert_eq!(dashboard.state().lock().await.config(), &before);
}

#[tokio::test]
async fn test_interval_update_and_reset() {
    let (_mock, dashboard) = setup().await;
    dashboard.activate().await;

    dashboard.update_config(ConfigField::PollInterval(10)).await.unwrap();
    dashboard.update_config(ConfigField::HeartRateLow(50)).await.unwrap();
    {
        let state = dashboard.state();
        let guard = state.lock().await;
        assert_eq!(guard.config().poll_interval_secs, 10);
        assert_eq!(guard.config().thresholds.heart_rate_low, 50);
    }

    dashboard.reset_config().await.unwrap();
    assert_eq!(dashboard.state().lock().await.config(), &DashboardConfig::default());

    dashboard.teardown().await;
}

#[tokio::test]
async fn test_hitmits_recorded_with_pass_vitals() {
    let (mock, dashboard) = setup().await;
    dashboard.start_session().await.unwrap();
    mock.push_pass(Reply::Json(pass_body(5, "Perfeito", 1)));

    let outcome = dashboard.execute_pass().await.unwrap();
    assert_eq!(outcome.quality, PassQuality::Perfect);

    let state = dashboard.state();
    let guard = state.lock().await;
    let hitmit = &guard.hitmits()[0];
    assert_eq!(hitmit.heart_rate, 130);
    assert_eq!(hitmit.oxygen_saturation, 98.0);
    assert_eq!(hitmit.stars(), 2);
    assert_eq!(guard.hitmit_summary().total_points, 5);
}

#[tokio::test]
async fn test_pass_in_flight_across_restart_is_not_scored() {
    let (mock, dashboard) = setup().await;
    let dashboard = Arc::new(dashboard);
    dashboard.start_session().await.unwrap();

    mock.push_pass(Reply::Delayed(Duration::from_millis(400), pass_body(4, "Perfeito", 7)));
    let pending = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.execute_pass().await })
    };
    let m = mock.clone();
    let sent = eventually(
        || {
            let m = m.clone();
            async move { m.pass_calls.load(Ordering::SeqCst) == 1 }
        },
        WAIT,
    );
    assert!(sent.await);

    dashboard.stop_session().await.unwrap();
    dashboard.start_session().await.unwrap();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(GameActionError::SessionEnded { action: GameAction::Pass })));

    let state = dashboard.state();
    let guard = state.lock().await;
    let session = guard.session();
    assert_eq!(session.phase, SessionPhase::Running);
    assert_eq!(session.score, 0);
    assert_eq!(session.passes_attempted, 0);
    assert_eq!(session.best_streak, 0);
    assert_eq!(session.current_streak, 0);
    assert!(guard.hitmits().is_empty());
}

#[tokio::test]
async fn test_pass_completing_after_stop_reports_no_result() {
    let (mock, dashboard) = setup().await;
    let dashboard = Arc::new(dashboard);
    dashboard.start_session().await.unwrap();

    mock.push_pass(Reply::Delayed(Duration::from_millis(400), pass_body(3, "Bom", 1)));
    let pending = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.execute_pass().await })
    };
    let m = mock.clone();
    let sent = eventually(
        || {
            let m = m.clone();
            async move { m.pass_calls.load(Ordering::SeqCst) == 1 }
        },
        WAIT,
    );
    assert!(sent.await);

    dashboard.stop_session().await.unwrap();

    let result = pending.await.unwrap();
    assert!(matches!(
        result,
        Err(GameActionError::InvalidState {
            action: GameAction::Pass,
            phase: SessionPhase::Stopped
        })
    ));
    assert_eq!(dashboard.state().lock().await.session().passes_attempted, 0);
}

#[tokio::test]
async fn test_concurrent_starts_apply_once() {
    let (mock, dashboard) = setup().await;
    let ack = serde_json::json!({ "sucesso": true });
    *mock.start.lock().unwrap() = Reply::Delayed(Duration::from_millis(100), ack);

    let (first, second) = tokio::join!(dashboard.start_session(), dashboard.start_session());

    let oks = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(oks, 1, "exactly one start takes effect: {:?} / {:?}", first, second);
    let refused = if first.is_err() { first } else { second };
    assert!(matches!(
        refused,
        Err(GameActionError::InvalidState {
            action: GameAction::Start,
            phase: SessionPhase::Running
        })
    ));
    assert_eq!(dashboard.state().lock().await.session_epoch(), 1);
}

#[tokio::test]
async fn test_config_changes_refused_after_teardown() {
    let (_mock, dashboard) = setup().await;
    dashboard.teardown().await;

    assert!(matches!(
        dashboard.update_config(ConfigField::PollInterval(5)).await,
        Err(ConfigError::TornDown)
    ));
    assert!(matches!(dashboard.reset_config().await, Err(ConfigError::TornDown)));
    assert_eq!(dashboard.state().lock().await.config().poll_interval_secs, 2);
}
