use serde::{Deserialize, Serialize};
use crate::kernel::sample::{bpm_from_reading, TelemetrySample};
use crate::kernel::session::{PassOutcome, PassQuality};

#[derive(Debug, Deserialize)]
pub struct TelemetryResponse {
    #[serde(default)]
    pub conectado: bool,
    #[serde(default)]
    pub dados: Option<TelemetrySample>,
}

/// Generic `{sucesso, mensagem}` acknowledgement. Both fields are optional so an
/// empty or unrelated 2xx body still counts as accepted.
#[derive(Debug, Default, Deserialize)]
pub struct ActionAck {
    pub sucesso: Option<bool>,
    pub mensagem: Option<String>,
    pub relatorio: Option<SessionReport>,
}

#[derive(Debug, Deserialize)]
pub struct PassResponse {
    pub sucesso: bool,
    pub pontos: Option<u32>,
    pub qualidade: Option<PassQuality>,
    pub sequencia: Option<u32>,
    pub batimento: Option<f64>,
    pub saturacao: Option<f64>,
    pub mensagem: Option<String>,
}

/// Why a pass reply could not be turned into a [`PassOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum PassReplyError {
    /// `sucesso: false`; the game server refused the pass.
    Rejected(String),
    /// `sucesso: true` but a scoring or vitals field is missing.
    Incomplete(&'static str),
}

impl TryFrom<PassResponse> for PassOutcome {
    type Error = PassReplyError;

    fn try_from(resp: PassResponse) -> Result<Self, Self::Error> {
        if !resp.sucesso {
            return Err(PassReplyError::Rejected(
                resp.mensagem.unwrap_or_else(|| "pass rejected".to_string()),
            ));
        }
        Ok(PassOutcome {
            points: resp.pontos.ok_or(PassReplyError::Incomplete("pontos"))?,
            quality: resp.qualidade.ok_or(PassReplyError::Incomplete("qualidade"))?,
            streak: resp.sequencia.ok_or(PassReplyError::Incomplete("sequencia"))?,
            heart_rate: resp
                .batimento
                .and_then(bpm_from_reading)
                .ok_or(PassReplyError::Incomplete("batimento"))?,
            oxygen_saturation: resp.saturacao.ok_or(PassReplyError::Incomplete("saturacao"))?,
        })
    }
}

/// Final report returned when a session is stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(rename = "pontuacao_total")]
    pub total_score: u64,
    #[serde(rename = "passes_executados")]
    pub passes_attempted: u32,
    #[serde(rename = "passes_perfeitos")]
    pub perfect_passes: u32,
    #[serde(rename = "melhor_sequencia")]
    pub best_streak: u32,
    #[serde(rename = "tempo_total")]
    pub total_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "fiware_connected", default)]
    pub upstream_connected: bool,
    #[serde(default)]
    pub game_active: bool,
    #[serde(default)]
    pub total_records: u64,
}
