//! Interval-based vital-sign classification.
//!
//! Pure functions. Any numeric reading is accepted, including values outside the
//! physiological range; the result only depends on where the reading falls relative
//! to the thresholds.

use super::config::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeartRateTier {
    Low,
    Normal,
    Elevated,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaturationTier {
    Low,
    Good,
    Excellent,
}

pub trait Tier: Copy {
    fn alert_glyph(&self) -> &'static str;
    fn label(&self) -> &'static str;
}

impl Tier for HeartRateTier {
    fn alert_glyph(&self) -> &'static str {
        match self {
            HeartRateTier::Low => "⚠️",
            HeartRateTier::Normal => "✅",
            HeartRateTier::Elevated => "⚡",
            HeartRateTier::VeryHigh => "🚨",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            HeartRateTier::Low => "Low",
            HeartRateTier::Normal => "Normal",
            HeartRateTier::Elevated => "Elevated",
            HeartRateTier::VeryHigh => "Very High",
        }
    }
}

impl Tier for SaturationTier {
    fn alert_glyph(&self) -> &'static str {
        match self {
            SaturationTier::Low => "🚨",
            SaturationTier::Good => "⚠️",
            SaturationTier::Excellent => "✅",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SaturationTier::Low => "Low",
            SaturationTier::Good => "Good",
            SaturationTier::Excellent => "Excellent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification<T: Tier> {
    pub tier: T,
    pub alert_glyph: &'static str,
}

impl<T: Tier> Classification<T> {
    fn of(tier: T) -> Self {
        Self { tier, alert_glyph: tier.alert_glyph() }
    }

    pub fn label(&self) -> &'static str {
        self.tier.label()
    }
}

impl<T: Tier> std::fmt::Display for Classification<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.alert_glyph, self.tier.label())
    }
}

pub fn classify_heart_rate(bpm: impl Into<f64>, t: &Thresholds) -> Classification<HeartRateTier> {
    let bpm = bpm.into();
    let tier = if bpm < f64::from(t.heart_rate_low) {
        HeartRateTier::Low
    } else if bpm < f64::from(t.heart_rate_normal) {
        HeartRateTier::Normal
    } else if bpm < f64::from(t.heart_rate_high) {
        HeartRateTier::Elevated
    } else {
        HeartRateTier::VeryHigh
    };
    Classification::of(tier)
}

pub fn classify_saturation(pct: impl Into<f64>, t: &Thresholds) -> Classification<SaturationTier> {
    let pct = pct.into();
    let tier = if pct >= t.saturation_good {
        SaturationTier::Excellent
    } else if pct >= t.saturation_low {
        SaturationTier::Good
    } else {
        SaturationTier::Low
    };
    Classification::of(tier)
}
