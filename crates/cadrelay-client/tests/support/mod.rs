//! Stub tool server shared by the client and bridge integration tests
//!
//! Runs an axum app on 127.0.0.1:0 inside a background tokio runtime so the
//! blocking client under test can call it from the test thread.

#![allow(dead_code)]

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::post;
use parking_lot::Mutex;
use serde_json::Value;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

/// What the stub answers to every POST
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: &Value) -> Self {
        Self::text(status, &body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request the stub received
#[derive(Debug, Clone)]
pub struct Received {
    pub path: String,
    pub body: Value,
}

#[derive(Clone)]
struct StubState {
    reply: Reply,
    received: Arc<Mutex<Vec<Received>>>,
}

pub struct StubServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
}

impl StubServer {
    pub fn start(reply: Reply) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            reply,
            received: received.clone(),
        };
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("stub runtime");
            runtime.block_on(async move {
                let app = Router::new()
                    .route("/call_tool", post(handle))
                    .route("/call_tools", post(handle))
                    .with_state(state);
                let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
                    .await
                    .expect("bind stub");
                tx.send(listener.local_addr().expect("stub addr"))
                    .expect("report stub addr");
                axum::serve(listener, app).await.expect("serve stub");
            });
        });

        let addr = rx.recv().expect("stub server address");
        Self { addr, received }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }
}

async fn handle(State(state): State<StubState>, uri: Uri, body: String) -> (StatusCode, String) {
    let parsed = serde_json::from_str(&body).unwrap_or(Value::String(body));
    state.received.lock().push(Received {
        path: uri.path().to_string(),
        body: parsed,
    });

    if !state.reply.delay.is_zero() {
        tokio::time::sleep(state.reply.delay).await;
    }

    let status = StatusCode::from_u16(state.reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, state.reply.body.clone())
}

/// An address nothing is listening on
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{}/call_tool", addr)
}
