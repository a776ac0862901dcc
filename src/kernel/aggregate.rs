use super::history::HistoryBuffer;
use super::session::Hitmit;

/// Seed for the heart-rate minimum so an empty history still yields a range.
pub const HEART_RATE_MIN_SENTINEL: u32 = 200;
/// Seed for the saturation minimum.
pub const SATURATION_MIN_SENTINEL: f64 = 100.0;

/// Hitmit counts that unlock an achievement badge.
pub const HITMIT_MILESTONES: [usize; 2] = [5, 10];

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub count: usize,
    pub mean_heart_rate: f64,
    pub mean_saturation: f64,
    pub max_heart_rate: u32,
    pub min_heart_rate: u32,
    pub max_saturation: f64,
    pub min_saturation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitmitSummary {
    pub count: usize,
    pub total_points: u64,
    pub average_points: f64,
}

impl HitmitSummary {
    /// One-decimal average, "0.0" when there are no hitmits.
    pub fn average_points_display(&self) -> String {
        format!("{:.1}", self.average_points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub target: usize,
    pub reached: bool,
}

/// Extremes are folded starting from the sentinels (max from 0, min from
/// 200 bpm / 100 %), so an empty history produces those values.
pub fn summarize_history(history: &HistoryBuffer) -> HistorySummary {
    let mut summary = HistorySummary {
        count: history.len(),
        mean_heart_rate: 0.0,
        mean_saturation: 0.0,
        max_heart_rate: 0,
        min_heart_rate: HEART_RATE_MIN_SENTINEL,
        max_saturation: 0.0,
        min_saturation: SATURATION_MIN_SENTINEL,
    };

    let mut hr_total = 0u64;
    let mut spo2_total = 0.0f64;

    for sample in history.iter() {
        hr_total += u64::from(sample.heart_rate);
        spo2_total += sample.oxygen_saturation;
        summary.max_heart_rate = summary.max_heart_rate.max(sample.heart_rate);
        summary.min_heart_rate = summary.min_heart_rate.min(sample.heart_rate);
        summary.max_saturation = summary.max_saturation.max(sample.oxygen_saturation);
        summary.min_saturation = summary.min_saturation.min(sample.oxygen_saturation);
    }

    if summary.count > 0 {
        summary.mean_heart_rate = hr_total as f64 / summary.count as f64;
        summary.mean_saturation = spo2_total / summary.count as f64;
    }

    summary
}

pub fn summarize_hitmits(hitmits: &[Hitmit]) -> HitmitSummary {
    let total_points: u64 = hitmits.iter().map(|h| u64::from(h.points)).sum();
    let average_points = if hitmits.is_empty() {
        0.0
    } else {
        total_points as f64 / hitmits.len() as f64
    };
    HitmitSummary {
        count: hitmits.len(),
        total_points,
        average_points,
    }
}

pub fn milestones(hitmit_count: usize) -> Vec<Milestone> {
    HITMIT_MILESTONES
        .iter()
        .map(|&target| Milestone { target, reached: hitmit_count >= target })
        .collect()
}

/// Y-axis range for the saturation chart, never narrower than 90..102.
pub fn saturation_axis_bounds(summary: &HistorySummary) -> (f64, f64) {
    (
        (summary.min_saturation - 2.0).min(90.0),
        (summary.max_saturation + 2.0).max(102.0),
    )
}
