use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// When a sample was captured, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureTime {
    /// Wall-clock display string (e.g. "14:03:27").
    #[serde(rename = "timestamp")]
    pub display: String,
    /// ISO-8601 instant from the upstream broker. May be empty.
    #[serde(rename = "time_instant", default)]
    pub instant: String,
}

/// One telemetry reading for an athlete. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    #[serde(rename = "id")]
    pub subject_id: String,
    #[serde(rename = "tipo", default)]
    pub kind: String,
    #[serde(flatten)]
    pub captured_at: CaptureTime,
    /// Beats per minute. Fractional readings are rounded on receipt.
    #[serde(rename = "batimento", deserialize_with = "deserialize_bpm")]
    pub heart_rate: u32,
    /// SpO2 percent.
    #[serde(rename = "saturacao")]
    pub oxygen_saturation: f64,
    #[serde(rename = "piscar", default)]
    pub blink_state: String,
}

impl TelemetrySample {
    pub fn new(subject_id: &str, heart_rate: u32, oxygen_saturation: f64) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            kind: "Atleta".to_string(),
            captured_at: CaptureTime {
                display: String::new(),
                instant: String::new(),
            },
            heart_rate,
            oxygen_saturation,
            blink_state: String::new(),
        }
    }
}

/// Converts a numeric heart-rate reading to whole beats per minute.
/// `None` for negative, non-finite or out-of-range values.
pub fn bpm_from_reading(value: f64) -> Option<u32> {
    let in_range = value.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&value);
    in_range.then(|| value.round() as u32)
}

fn deserialize_bpm<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    bpm_from_reading(raw).ok_or_else(|| D::Error::custom(format!("invalid heart rate {}", raw)))
}
