//! HTTP contract with the telemetry/game backend.
//!
//! Endpoints:
//! - GET  /atleta/dados  - latest athlete sample
//! - POST /jogo/iniciar  - start a play session
//! - POST /jogo/parar    - stop the play session
//! - POST /jogo/passe    - evaluate one pass
//! - GET  /health        - backend health probe

pub mod client;
pub mod wire;

pub use client::{BackendClient, BackendError};
