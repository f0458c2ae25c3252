//! Shared fixtures: a deterministic encoder and an in-process Starpoint fake.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use starpoint_search::store::{API_KEY_HEADER, QUERY_PATH};
use starpoint_search::{
    ApiServer, ApiSettings, AppState, ComputeDevice, EmbeddingVector, Error, QueryEncoder,
    Result, SearchHandler, StarpointClient, VectorStoreSettings,
};

/// Dimensionality of [`HashEncoder`] output.
pub const FAKE_DIM: usize = 512;

/// Encoder that derives a pseudo-random vector from the text's bytes.
#[derive(Default)]
pub struct HashEncoder {
    calls: Mutex<Vec<String>>,
}

impl HashEncoder {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl QueryEncoder for HashEncoder {
    fn encode(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.lock().unwrap().push(text.to_string());

        // FNV-1a seed, then an LCG per component
        let mut state = text.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x100_0000_01b3)
        });
        let raw = (0..FAKE_DIM)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
            })
            .collect();
        EmbeddingVector::from_raw(raw)
    }

    fn dimension(&self) -> usize {
        FAKE_DIM
    }

    fn device(&self) -> ComputeDevice {
        ComputeDevice::Cpu
    }

    fn model_name(&self) -> &str {
        "hash-test"
    }
}

/// Encoder whose every call fails, as a broken model would.
pub struct BrokenEncoder;

impl QueryEncoder for BrokenEncoder {
    fn encode(&self, _text: &str) -> Result<EmbeddingVector> {
        Err(Error::Encoding("onnx session poisoned".into()))
    }

    fn dimension(&self) -> usize {
        FAKE_DIM
    }

    fn device(&self) -> ComputeDevice {
        ComputeDevice::Cpu
    }

    fn model_name(&self) -> &str {
        "broken-test"
    }
}

/// One query as received by the fake.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct FakeState {
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
    status: StatusCode,
    reply: Value,
}

/// Minimal Starpoint reader API answering every query with a fixed reply.
pub struct FakeStarpoint {
    pub base_url: String,
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl FakeStarpoint {
    pub async fn start(status: StatusCode, reply: Value) -> Self {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            queries: Arc::clone(&queries),
            status,
            reply,
        };
        let app = Router::new()
            .route(QUERY_PATH, post(fake_query))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            queries,
        }
    }

    pub async fn ok(reply: Value) -> Self {
        Self::start(StatusCode::OK, reply).await
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn client(&self) -> StarpointClient {
        StarpointClient::new(&VectorStoreSettings {
            base_url: self.base_url.clone(),
            request_timeout_secs: 5,
        })
        .unwrap()
    }
}

async fn fake_query(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    state
        .queries
        .lock()
        .unwrap()
        .push(RecordedQuery { api_key, body });
    (state.status, Json(state.reply.clone()))
}

/// Gateway router wired to `encoder` and the fake store.
pub fn gateway_router(encoder: Arc<HashEncoder>, store: &FakeStarpoint) -> Router {
    ApiServer::with_state(ApiSettings::default(), gateway_state(encoder, store)).router()
}

/// Shared state over any encoder and the fake store.
pub fn gateway_state(encoder: Arc<dyn QueryEncoder>, store: &FakeStarpoint) -> AppState {
    AppState::new(SearchHandler::new(encoder, Arc::new(store.client())))
}
