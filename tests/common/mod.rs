//! In-process stand-in for the telemetry/game backend.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
    /// 200 with a body that is not JSON.
    Garbage,
    Delayed(Duration, Value),
}

pub struct MockBackend {
    /// Sticky: returned for every telemetry request until replaced.
    pub telemetry: Mutex<Reply>,
    pub start: Mutex<Reply>,
    pub stop: Mutex<Reply>,
    /// Consumed in order; falls back to a rejection when empty.
    pub passes: Mutex<VecDeque<Reply>>,
    pub telemetry_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub pass_calls: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            telemetry: Mutex::new(Reply::Json(telemetry_body(80, 97.5))),
            start: Mutex::new(Reply::Json(json!({
                "sucesso": true,
                "mensagem": "Jogo iniciado com sucesso!"
            }))),
            stop: Mutex::new(Reply::Json(json!({ "sucesso": true }))),
            passes: Mutex::new(VecDeque::new()),
            telemetry_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            pass_calls: AtomicUsize::new(0),
        }
    }
}

impl MockBackend {
    pub fn set_telemetry(&self, reply: Reply) {
        *self.telemetry.lock().unwrap() = reply;
    }

    pub fn push_pass(&self, reply: Reply) {
        self.passes.lock().unwrap().push_back(reply);
    }

    pub fn telemetry_calls(&self) -> usize {
        self.telemetry_calls.load(Ordering::SeqCst)
    }
}

pub fn telemetry_body(heart_rate: u32, saturation: f64) -> Value {
    json!({
        "dados": {
            "id": "urn:ngsi-ld:Atleta:0001",
            "tipo": "Atleta",
            "timestamp": "10:15:30",
            "time_instant": "2026-10-18T10:15:30.000Z",
            "batimento": heart_rate,
            "saturacao": saturation,
            "piscar": "off"
        },
        "status_batimento": { "status": "Normal", "cor": "bpm-normal", "alerta": "✅" },
        "conectado": true,
        "ultima_atualizacao": "2026-10-18T10:15:30"
    })
}

pub fn pass_body(points: u32, quality: &str, streak: u32) -> Value {
    json!({
        "sucesso": true,
        "pontos": points,
        "qualidade": quality,
        "sequencia": streak,
        "batimento": 130,
        "saturacao": 98.0
    })
}

pub fn pass_rejected(message: &str) -> Value {
    json!({ "sucesso": false, "mensagem": message })
}

async fn respond(reply: Reply) -> Response {
    match reply {
        Reply::Json(body) => (StatusCode::OK, Json(body)).into_response(),
        Reply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Reply::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
        Reply::Delayed(delay, body) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, Json(body)).into_response()
        }
    }
}

async fn telemetry(State(mock): State<Arc<MockBackend>>) -> Response {
    mock.telemetry_calls.fetch_add(1, Ordering::SeqCst);
    let reply = mock.telemetry.lock().unwrap().clone();
    respond(reply).await
}

async fn start(State(mock): State<Arc<MockBackend>>) -> Response {
    mock.start_calls.fetch_add(1, Ordering::SeqCst);
    let reply = mock.start.lock().unwrap().clone();
    respond(reply).await
}

async fn stop(State(mock): State<Arc<MockBackend>>) -> Response {
    mock.stop_calls.fetch_add(1, Ordering::SeqCst);
    let reply = mock.stop.lock().unwrap().clone();
    respond(reply).await
}

async fn pass(State(mock): State<Arc<MockBackend>>) -> Response {
    mock.pass_calls.fetch_add(1, Ordering::SeqCst);
    let reply = mock
        .passes
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Reply::Json(pass_rejected("Jogo não está ativo")));
    respond(reply).await
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": "2026-10-18T10:15:30",
        "fiware_connected": true,
        "game_active": false,
        "total_records": 3
    }))
}

/// Binds an ephemeral port and returns the base URL.
pub async fn spawn(mock: Arc<MockBackend>) -> String {
    let app = Router::new()
        .route("/atleta/dados", get(telemetry))
        .route("/jogo/iniciar", post(start))
        .route("/jogo/parar", post(stop))
        .route("/jogo/passe", post(pass))
        .route("/health", get(health))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Polls `check` every 10ms until it holds or `timeout` elapses.
pub async fn eventually<F, Fut>(mut check: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
