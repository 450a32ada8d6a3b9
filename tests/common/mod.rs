#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use rust_file_uploader::{BackoffPolicy, UploaderConfig};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// How the mock coordinator hands out slots.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SlotShape {
    PresignedPost,
    Multipart { chunk_size: u64 },
}

#[derive(Clone, Debug)]
pub struct RecordedEvent {
    pub action: String,
    pub slug: String,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone, Debug)]
pub struct RecordedPost {
    pub headers: HeaderMap,
    pub fields: BTreeMap<String, String>,
    pub file_name: Option<String>,
    pub file_len: usize,
}

#[derive(Clone, Debug)]
pub struct RecordedPut {
    pub key: String,
    pub part: u32,
    pub headers: HeaderMap,
    pub len: usize,
}

/// Coordinator, storage and polling endpoint in one in-process server.
pub struct MockServer {
    pub base: String,
    pub shape: SlotShape,
    pub events: Mutex<Vec<RecordedEvent>>,
    pub posts: Mutex<Vec<RecordedPost>>,
    pub puts: Mutex<Vec<RecordedPut>>,
    pub polls: AtomicUsize,
    pub poll_times: Mutex<Vec<Instant>>,
    pub poll_auth: Mutex<Vec<String>>,
    /// Responses served before the default `done`.
    pub poll_script: Mutex<VecDeque<(StatusCode, Value)>>,
    pub storage_status: Mutex<StatusCode>,
    pub storage_delay: Mutex<Duration>,
    pub hang_storage: Mutex<bool>,
    /// File names whose storage request never completes.
    pub hang_files: Mutex<Vec<String>>,
    /// Time taken to acknowledge a `failure` event, after recording it.
    pub failure_ack_delay: Mutex<Duration>,
    pub storage_started: AtomicUsize,
    pub storage_in_flight: AtomicUsize,
    pub storage_max_in_flight: AtomicUsize,
}

impl MockServer {
    pub async fn start(shape: SlotShape) -> Arc<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Arc::new(Self {
            base: format!("http://{}", addr),
            shape,
            events: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            puts: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            poll_times: Mutex::new(Vec::new()),
            poll_auth: Mutex::new(Vec::new()),
            poll_script: Mutex::new(VecDeque::new()),
            storage_status: Mutex::new(StatusCode::NO_CONTENT),
            storage_delay: Mutex::new(Duration::ZERO),
            hang_storage: Mutex::new(false),
            hang_files: Mutex::new(Vec::new()),
            failure_ack_delay: Mutex::new(Duration::ZERO),
            storage_started: AtomicUsize::new(0),
            storage_in_flight: AtomicUsize::new(0),
            storage_max_in_flight: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/uploads", post(coordinator))
            .route("/storage", post(storage_post))
            .route("/part/:key/:part", put(storage_put))
            .route("/poll/:key", get(poll))
            .with_state(server.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        server
    }

    /// Client configuration pointing at this server with a fast backoff.
    pub fn config(&self) -> UploaderConfig {
        UploaderConfig::new(format!("{}/api/uploads", self.base), "test-package").with_poll_backoff(
            BackoffPolicy {
                initial_delay: Duration::from_millis(1),
                factor: 2,
                max_delay: Duration::from_millis(50),
            },
        )
    }

    pub fn events(&self, action: &str) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    pub fn script_polls(&self, responses: Vec<(StatusCode, Value)>) {
        self.poll_script.lock().unwrap().extend(responses);
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn slot_for(&self, index: usize, file: &Value) -> Value {
        let name = file["name"].as_str().unwrap_or_default();
        let size = file["size"].as_u64().unwrap_or_default();
        let key = format!("key-{}-{}", index, name.replace('.', "-"));

        let mut slot = json!({
            "key": key,
            "fileName": name,
            "fileType": file["type"],
            "customId": format!("custom-{}", index),
            "pollingUrl": format!("{}/poll/{}", self.base, key),
            "pollingJwt": format!("jwt-{}", key),
        });

        let transfer = match self.shape {
            SlotShape::PresignedPost => json!({
                "url": format!("{}/storage", self.base),
                "fields": { "key": key, "acl": "public-read" },
            }),
            SlotShape::Multipart { chunk_size } => {
                let count = size.div_ceil(chunk_size).max(1);
                let urls: Vec<String> = (1..=count)
                    .map(|part| format!("{}/part/{}/{}", self.base, key, part))
                    .collect();
                json!({
                    "urls": urls,
                    "uploadId": format!("upload-{}", key),
                    "chunkSize": chunk_size,
                    "chunkCount": count,
                })
            }
        };

        if let (Some(slot), Some(transfer)) = (slot.as_object_mut(), transfer.as_object()) {
            slot.extend(transfer.clone());
        }
        slot
    }
}

async fn coordinator(
    State(server): State<Arc<MockServer>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let action = query.get("actionType").cloned().unwrap_or_default();
    server.events.lock().unwrap().push(RecordedEvent {
        action: action.clone(),
        slug: query.get("slug").cloned().unwrap_or_default(),
        headers,
        body: body.clone(),
    });

    match action.as_str() {
        "upload" => {
            let files = body["files"].as_array().cloned().unwrap_or_default();
            let slots: Vec<Value> = files
                .iter()
                .enumerate()
                .map(|(index, file)| server.slot_for(index, file))
                .collect();
            Json(Value::Array(slots)).into_response()
        }
        "failure" => {
            let delay = *server.failure_ack_delay.lock().unwrap();
            tokio::time::sleep(delay).await;
            Json(json!({ "success": true })).into_response()
        }
        "multipart-complete" => Json(json!({ "success": true })).into_response(),
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "message": "unknown action" })))
            .into_response(),
    }
}

async fn storage_post(
    State(server): State<Arc<MockServer>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    server.storage_started.fetch_add(1, Ordering::SeqCst);
    let now = server.storage_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    server.storage_max_in_flight.fetch_max(now, Ordering::SeqCst);

    let mut fields = BTreeMap::new();
    let mut file_name = None;
    let mut file_len = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file_name = field.file_name().map(str::to_string);
            file_len = field.bytes().await.map(|b| b.len()).unwrap_or_default();
        } else {
            fields.insert(name, field.text().await.unwrap_or_default());
        }
    }
    let hang = *server.hang_storage.lock().unwrap()
        || file_name
            .as_ref()
            .is_some_and(|name| server.hang_files.lock().unwrap().contains(name));
    server.posts.lock().unwrap().push(RecordedPost {
        headers,
        fields,
        file_name,
        file_len,
    });

    if hang {
        std::future::pending::<()>().await;
    }
    let delay = *server.storage_delay.lock().unwrap();
    tokio::time::sleep(delay).await;
    server.storage_in_flight.fetch_sub(1, Ordering::SeqCst);

    let status = *server.storage_status.lock().unwrap();
    if status.is_success() {
        status.into_response()
    } else {
        (status, "storage exploded").into_response()
    }
}

async fn storage_put(
    State(server): State<Arc<MockServer>>,
    Path((key, part)): Path<(String, u32)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    server.puts.lock().unwrap().push(RecordedPut {
        key,
        part,
        headers,
        len: body.len(),
    });
    (
        StatusCode::OK,
        [(header::ETAG, format!("\"etag-{}\"", part))],
    )
        .into_response()
}

async fn poll(
    State(server): State<Arc<MockServer>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    server.polls.fetch_add(1, Ordering::SeqCst);
    server.poll_times.lock().unwrap().push(Instant::now());
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    server.poll_auth.lock().unwrap().push(auth);

    let scripted = server.poll_script.lock().unwrap().pop_front();
    match scripted {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => Json(json!({
            "status": "done",
            "callbackData": { "uploadedBy": "tester", "key": key },
        }))
        .into_response(),
    }
}
