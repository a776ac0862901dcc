use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::wire::{
    ActionAck, HealthReport, PassReplyError, PassResponse, SessionReport, TelemetryResponse,
};
use crate::kernel::sample::TelemetrySample;
use crate::kernel::session::PassOutcome;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned HTTP {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The backend answered but refused the action (`sucesso: false`).
    #[error("rejected by backend: {0}")]
    Rejected(String),
}

impl BackendError {
    /// True for failures where the backend could not be reached or understood,
    /// as opposed to a logical refusal.
    pub fn is_connectivity(&self) -> bool {
        !matches!(self, BackendError::Rejected(_))
    }
}

#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// No request timeout is set; the transport default applies.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /atleta/dados`. A body without a sample counts as malformed.
    pub async fn fetch_telemetry(&self) -> Result<TelemetrySample, BackendError> {
        let response = self.client.get(self.url("/atleta/dados")).send().await?;
        let body: TelemetryResponse = Self::decode(response).await?;
        debug!(upstream_connected = body.conectado, "telemetry response");
        body.dados
            .ok_or_else(|| BackendError::Malformed("response carried no sample".to_string()))
    }

    /// `POST /jogo/iniciar`.
    pub async fn start_session(&self) -> Result<(), BackendError> {
        self.post_action("/jogo/iniciar").await.map(|_| ())
    }

    /// `POST /jogo/parar`. Returns the backend's final report when it sends one.
    pub async fn stop_session(&self) -> Result<Option<SessionReport>, BackendError> {
        self.post_action("/jogo/parar").await.map(|ack| ack.relatorio)
    }

    /// `POST /jogo/passe`.
    pub async fn execute_pass(&self) -> Result<PassOutcome, BackendError> {
        let response = self.client.post(self.url("/jogo/passe")).send().await?;
        let body: PassResponse = Self::decode(response).await?;
        PassOutcome::try_from(body).map_err(|e| match e {
            PassReplyError::Rejected(msg) => BackendError::Rejected(msg),
            PassReplyError::Incomplete(field) => {
                BackendError::Malformed(format!("pass reply missing `{}`", field))
            }
        })
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthReport, BackendError> {
        let response = self.client.get(self.url("/health")).send().await?;
        Self::decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_action(&self, path: &str) -> Result<ActionAck, BackendError> {
        let response = self.client.post(self.url(path)).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }
        let bytes = response.bytes().await?;
        // Any 2xx is accepted unless the body explicitly says otherwise
        let ack: ActionAck = serde_json::from_slice(&bytes).unwrap_or_default();
        if ack.sucesso == Some(false) {
            return Err(BackendError::Rejected(
                ack.mensagem.unwrap_or_else(|| format!("{} refused", path)),
            ));
        }
        Ok(ack)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
