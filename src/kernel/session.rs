use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

pub const PERFECT_PASS_KIND: &str = "Perfect Pass";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    Stopped,
    Running,
}

/// Pass quality as graded by the game backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassQuality {
    #[serde(rename = "Perfeito", alias = "Perfect")]
    Perfect,
    #[serde(rename = "Bom", alias = "Good")]
    Good,
    Regular,
    #[serde(rename = "Fraco", alias = "Weak")]
    Weak,
}

/// A successful pass evaluation reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    pub points: u32,
    pub quality: PassQuality,
    /// Streak after this pass, as computed by the backend.
    pub streak: u32,
    pub heart_rate: u32,
    pub oxygen_saturation: f64,
}

/// A recorded perfect pass with its vitals snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hitmit {
    pub kind: String,
    pub recorded_at: String,
    pub points: u32,
    pub heart_rate: u32,
    pub oxygen_saturation: f64,
}

impl Hitmit {
    pub fn perfect_pass(outcome: &PassOutcome, at: DateTime<Utc>) -> Self {
        Self {
            kind: PERFECT_PASS_KIND.to_string(),
            recorded_at: at.with_timezone(&Local).format("%H:%M:%S").to_string(),
            points: outcome.points,
            heart_rate: outcome.heart_rate,
            oxygen_saturation: outcome.oxygen_saturation,
        }
    }

    /// Star rating shown next to the hitmit, capped at five.
    pub fn stars(&self) -> u32 {
        (self.points / 2).min(5)
    }
}

/// Score and streak counters for one play session.
///
/// Invariants: `current_streak <= best_streak` after every update, and `score`
/// never decreases while Running.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub phase: SessionPhase,
    pub score: u64,
    pub passes_attempted: u32,
    pub perfect_passes: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub best_streak: u32,
    pub current_streak: u32,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Stopped,
            score: 0,
            passes_attempted: 0,
            perfect_passes: 0,
            started_at: None,
            stopped_at: None,
            best_streak: 0,
            current_streak: 0,
        }
    }
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Stopped -> Running with fresh counters. Returns false if already running.
    pub fn begin(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_running() {
            return false;
        }
        *self = Self {
            phase: SessionPhase::Running,
            started_at: Some(at),
            ..Self::default()
        };
        true
    }

    /// Running -> Stopped. Counters are kept for display until the next `begin`.
    pub fn end(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.phase = SessionPhase::Stopped;
        self.stopped_at = Some(at);
        true
    }

    /// Applies a backend-reported pass. Returns false (and changes nothing) when
    /// the session is not running.
    pub fn record_pass(&mut self, outcome: &PassOutcome) -> bool {
        if !self.is_running() {
            return false;
        }
        self.passes_attempted += 1;
        self.score += u64::from(outcome.points);
        if outcome.quality == PassQuality::Perfect {
            self.perfect_passes += 1;
        }
        self.current_streak = outcome.streak;
        self.best_streak = self.best_streak.max(self.current_streak);
        true
    }

    /// Time since start; frozen at the stop instant once Stopped.
    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        match self.started_at {
            Some(start) => {
                let end = self.stopped_at.unwrap_or(now);
                (end - start).max(chrono::Duration::zero())
            }
            None => chrono::Duration::zero(),
        }
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        self.elapsed(now).num_seconds()
    }

    /// Fraction of passes graded Perfect, 0 when no passes were attempted.
    pub fn perfect_pass_rate(&self) -> f64 {
        if self.passes_attempted == 0 {
            return 0.0;
        }
        f64::from(self.perfect_passes) / f64::from(self.passes_attempted)
    }

    pub fn average_points(&self) -> f64 {
        if self.passes_attempted == 0 {
            return 0.0;
        }
        self.score as f64 / f64::from(self.passes_attempted)
    }

    pub fn passes_per_minute(&self, now: DateTime<Utc>) -> Option<f64> {
        let secs = self.elapsed_secs(now);
        if secs <= 0 {
            return None;
        }
        Some(f64::from(self.passes_attempted) / (secs as f64 / 60.0))
    }
}

/// `M:SS` rendering of a session duration.
pub fn format_elapsed(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}
