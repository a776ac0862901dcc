use std::sync::Arc;
use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use athlete_pulse::kernel::aggregate::{milestones, saturation_axis_bounds};
use athlete_pulse::kernel::config::{ConfigField, DashboardConfig};
use athlete_pulse::kernel::session::format_elapsed;
use athlete_pulse::services::backend::BackendClient;
use athlete_pulse::settings::Settings;
use athlete_pulse::Dashboard;

const HELP: &str = "commands: start | stop | pass | status | history [n] | hitmits | config \
                    | set <field> <value> | reset | quit";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = Settings::from_env()?;
    tracing::info!(backend = %settings.backend_url, "Athlete Pulse booting...");

    let client = BackendClient::new(&settings.backend_url);
    match client.health().await {
        Ok(health) => tracing::info!(
            status = %health.status,
            upstream_connected = health.upstream_connected,
            game_active = health.game_active,
            "backend health"
        ),
        Err(e) => tracing::warn!(error = %e, "backend health probe failed; polling anyway"),
    }

    let dashboard = Arc::new(Dashboard::new(client, settings.dashboard)?);
    dashboard.activate().await;

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&dashboard, line.trim()).await {
                    break;
                }
            }
        }
    }

    dashboard.teardown().await;
    Ok(())
}

/// Returns false when the driver should exit.
async fn handle_command(dashboard: &Dashboard, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => {}
        Some("quit") | Some("exit") => return false,
        Some("start") => match dashboard.start_session().await {
            Ok(()) => println!("[GAME] session started"),
            Err(e) => println!("[GAME] start failed: {}", e),
        },
        Some("stop") => match dashboard.stop_session().await {
            Ok(Some(report)) => println!(
                "[GAME] session stopped: score {} | passes {} | perfect {} | best streak {} | {}s",
                report.total_score,
                report.passes_attempted,
                report.perfect_passes,
                report.best_streak,
                report.total_secs
            ),
            Ok(None) => println!("[GAME] session stopped"),
            Err(e) => println!("[GAME] stop failed: {}", e),
        },
        Some("pass") => match dashboard.execute_pass().await {
            Ok(outcome) => println!(
                "[GAME] {:?} pass: +{} (streak {})",
                outcome.quality, outcome.points, outcome.streak
            ),
            Err(e) if e.is_rejection() => println!("[GAME] pass refused: {}", e),
            Err(e) => println!("[GAME] pass failed: {}", e),
        },
        Some("status") => print_status(dashboard).await,
        Some("history") => {
            let n = parts.next().and_then(|v| v.parse().ok()).unwrap_or(10);
            print_history(dashboard, n).await;
        }
        Some("hitmits") => print_hitmits(dashboard).await,
        Some("config") => {
            let state = dashboard.state();
            let json = state.lock().await.config().to_json_string();
            match json {
                Ok(json) => println!("{}", json),
                Err(e) => println!("[CONFIG] {}", e),
            }
        }
        Some("set") => {
            let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
                println!("usage: set <{}> <value>", ConfigField::NAMES.join("|"));
                return true;
            };
            let result = match ConfigField::parse(name, value) {
                Ok(field) => dashboard.update_config(field).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => println!("[CONFIG] {} = {}", name, value),
                Err(e) => println!("[CONFIG] rejected: {}", e),
            }
        }
        Some("reset") => match dashboard.reset_config().await {
            Ok(()) => println!("[CONFIG] defaults restored: {:?}", DashboardConfig::default()),
            Err(e) => println!("[CONFIG] reset failed: {}", e),
        },
        Some(other) => println!("unknown command `{}`. {}", other, HELP),
    }
    true
}

async fn print_status(dashboard: &Dashboard) {
    let now = Utc::now();
    let phase = dashboard.poll_phase().await;
    let state = dashboard.state();
    let state = state.lock().await;

    let link = if state.is_connected() { "connected" } else { "offline" };
    match state.seconds_since_update(now) {
        Some(secs) => println!("[LINK] {} ({:?}) | last update {}s ago", link, phase, secs),
        None => println!("[LINK] {} ({:?}) | no data yet", link, phase),
    }

    if let (Some(sample), Some(hr), Some(spo2)) =
        (state.current(), state.heart_rate_status(), state.saturation_status())
    {
        println!(
            "[VITALS] {} | {} bpm {} | SpO2 {:.1}% {} | blink {}",
            sample.subject_id,
            sample.heart_rate,
            hr,
            sample.oxygen_saturation,
            spo2,
            sample.blink_state
        );
    }

    let session = state.session();
    let rate = session
        .passes_per_minute(now)
        .map_or_else(|| "-".to_string(), |r| format!("{:.1}", r));
    println!(
        "[GAME] {:?} | {} | score {} | passes {} | perfect {} ({:.0}%) | avg {:.1} | streak {}/{} | {}/min",
        session.phase,
        format_elapsed(session.elapsed_secs(now)),
        session.score,
        session.passes_attempted,
        session.perfect_passes,
        session.perfect_pass_rate() * 100.0,
        session.average_points(),
        session.current_streak,
        session.best_streak,
        rate
    );
}

async fn print_history(dashboard: &Dashboard, n: usize) {
    let state = dashboard.state();
    let state = state.lock().await;
    let summary = state.history_summary();
    let (axis_lo, axis_hi) = saturation_axis_bounds(&summary);

    println!(
        "[HISTORY] {} / {} records | HR avg {:.0} (min {} max {}) | SpO2 avg {:.1}% (min {:.1} max {:.1}) | axis {:.0}..{:.0}",
        summary.count,
        state.history().capacity(),
        summary.mean_heart_rate,
        summary.min_heart_rate,
        summary.max_heart_rate,
        summary.mean_saturation,
        summary.min_saturation,
        summary.max_saturation,
        axis_lo,
        axis_hi
    );
    for sample in state.history().snapshot(n) {
        println!(
            "  {} | {:>3} bpm | {:>5.1}%",
            sample.captured_at.display, sample.heart_rate, sample.oxygen_saturation
        );
    }
}

async fn print_hitmits(dashboard: &Dashboard) {
    let state = dashboard.state();
    let state = state.lock().await;
    let summary = state.hitmit_summary();

    println!(
        "[HITMITS] {} | total {} pts | avg {}",
        summary.count,
        summary.total_points,
        summary.average_points_display()
    );
    for (index, hitmit) in state.hitmits().iter().enumerate().rev() {
        println!(
            "  #{} {} {} | +{} {} | {} bpm | {:.1}%",
            index + 1,
            hitmit.recorded_at,
            hitmit.kind,
            hitmit.points,
            "*".repeat(hitmit.stars() as usize),
            hitmit.heart_rate,
            hitmit.oxygen_saturation
        );
    }
    for milestone in milestones(summary.count) {
        let mark = if milestone.reached { "done" } else { "open" };
        println!("  milestone {} hitmits: {}", milestone.target, mark);
    }
}
