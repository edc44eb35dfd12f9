//! Shared test fixtures: scripted mock backend and a recording surface

#![allow(dead_code)]

pub mod log_capture;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchcrop_common::events::EventBus;
use switchcrop_review::services::{
    BatchCoordinator, BoundaryMarker, Heatmap, HttpBackend, RenderSurface, ReviewParams,
};
use tempfile::TempDir;

/// Scripted responses plus a log of what the client sent
pub struct MockScript {
    pub upload: (StatusCode, Value),
    pub file_list: Value,
    pub missing_spectrograms: HashSet<String>,
    pub spectrogram_delays: HashMap<String, Duration>,
    pub batch: (StatusCode, Value),
    pub archive: Vec<u8>,

    pub uploaded_names: Vec<String>,
    pub spectrogram_requests: Vec<String>,
    pub batch_requests: Vec<Value>,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            upload: (StatusCode::OK, upload_body()),
            file_list: file_list_body(),
            missing_spectrograms: HashSet::new(),
            spectrogram_delays: HashMap::new(),
            batch: (
                StatusCode::OK,
                json!({
                    "success": true,
                    "processed_files": 3,
                    "failed_files": 0,
                    "download_url": "/download/processed_audio_20240101.zip",
                    "zip_filename": "processed_audio_20240101.zip"
                }),
            ),
            archive: b"PK\x03\x04 archive".to_vec(),
            uploaded_names: Vec::new(),
            spectrogram_requests: Vec::new(),
            batch_requests: Vec::new(),
        }
    }
}

pub fn key(name: &str) -> String {
    format!("20240101_120000_{}", name)
}

/// Three analyzed files with server keys and a (5.2, 6.8) average
pub fn upload_body() -> Value {
    json!({
        "success": true,
        "weighted_average": { "start": 5.2, "end": 6.8 },
        "total_files": 3,
        "files": [
            { "filename": "a.wav", "unique_filename": key("a.wav"), "duration": 12.0, "detected_start": 5.0, "detected_end": 6.5 },
            { "filename": "b.wav", "unique_filename": key("b.wav"), "duration": 10.0, "detected_start": 5.5, "detected_end": 7.0 },
            { "filename": "c.wav", "unique_filename": key("c.wav"), "duration": 9.0, "detected_start": 5.1, "detected_end": 6.9 }
        ]
    })
}

pub fn file_list_body() -> Value {
    json!([
        { "filename": "a.wav", "unique_filename": key("a.wav"), "detected_interval": [5.0, 6.5] },
        { "filename": "b.wav", "unique_filename": key("b.wav"), "detected_interval": [5.5, 7.0] },
        { "filename": "c.wav", "unique_filename": key("c.wav"), "detected_interval": [5.1, 6.9] }
    ])
}

fn spectrogram_body(unique_filename: &str) -> Value {
    let times: Vec<f64> = (0..=20).map(|i| i as f64 * 0.5).collect();
    let rows: Vec<Vec<f64>> = (0..4)
        .map(|bin| times.iter().map(|t| -80.0 + t * 4.0 + bin as f64).collect())
        .collect();
    let filename = unique_filename
        .strip_prefix("20240101_120000_")
        .unwrap_or(unique_filename);
    json!({
        "filename": filename,
        "time_frames": times,
        "mel_spec_db": rows,
        "sr": 22050
    })
}

type Shared = Arc<Mutex<MockScript>>;

async fn upload(State(script): State<Shared>, mut multipart: Multipart) -> Response {
    let mut names = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("files") {
            names.push(field.file_name().unwrap_or_default().to_string());
        }
        let _ = field.bytes().await;
    }

    let mut script = script.lock().unwrap();
    script.uploaded_names.extend(names);
    let (status, body) = script.upload.clone();
    (status, Json(body)).into_response()
}

async fn file_list(State(script): State<Shared>) -> Json<Value> {
    Json(script.lock().unwrap().file_list.clone())
}

async fn spectrogram(State(script): State<Shared>, Path(unique_filename): Path<String>) -> Response {
    let (delay, missing) = {
        let mut script = script.lock().unwrap();
        script.spectrogram_requests.push(unique_filename.clone());
        (
            script.spectrogram_delays.get(&unique_filename).copied(),
            script.missing_spectrograms.contains(&unique_filename),
        )
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if missing {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "File not found" })),
        )
            .into_response();
    }
    Json(spectrogram_body(&unique_filename)).into_response()
}

async fn process_batch(State(script): State<Shared>, Json(request): Json<Value>) -> Response {
    let mut script = script.lock().unwrap();
    script.batch_requests.push(request);
    let (status, body) = script.batch.clone();
    (status, Json(body)).into_response()
}

async fn download(State(script): State<Shared>, Path(_name): Path<String>) -> Vec<u8> {
    script.lock().unwrap().archive.clone()
}

/// Mock analysis backend on an ephemeral port
pub struct MockBackend {
    pub url: String,
    pub script: Shared,
}

impl MockBackend {
    pub async fn start(script: MockScript) -> Self {
        let script = Arc::new(Mutex::new(script));
        let app = Router::new()
            .route("/upload", post(upload))
            .route("/get_file_list", get(file_list))
            .route("/get_spectrogram/:unique_filename", get(spectrogram))
            .route("/process_batch", post(process_batch))
            .route("/download/:name", get(download))
            .with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            script,
        }
    }

    pub fn client(&self) -> HttpBackend {
        HttpBackend::new(&self.url, Duration::from_secs(5)).unwrap()
    }

    pub fn with_script<T>(&self, f: impl FnOnce(&mut MockScript) -> T) -> T {
        f(&mut self.script.lock().unwrap())
    }
}

/// Surface that remembers every call
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub rendered_titles: Vec<String>,
    pub relayouts: usize,
    pub purges: usize,
    pub markers: Option<[BoundaryMarker; 2]>,
    pub frequencies: Vec<f64>,
}

impl RenderSurface for RecordingSurface {
    fn render(&mut self, heatmap: &Heatmap<'_>, markers: &[BoundaryMarker; 2]) {
        self.rendered_titles.push(heatmap.title.to_string());
        self.frequencies = heatmap.frequencies.clone();
        self.markers = Some(*markers);
    }

    fn relayout(&mut self, markers: &[BoundaryMarker; 2]) {
        self.relayouts += 1;
        self.markers = Some(*markers);
    }

    fn purge(&mut self) {
        self.purges += 1;
        self.markers = None;
    }
}

pub type TestCoordinator = BatchCoordinator<HttpBackend, RecordingSurface>;

pub fn coordinator(backend: &MockBackend) -> TestCoordinator {
    BatchCoordinator::new(
        backend.client(),
        RecordingSurface::default(),
        ReviewParams::default(),
        EventBus::new(100),
    )
}

/// Write small placeholder recordings into a fresh temp dir
pub fn audio_files(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().unwrap();
    let paths = names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, b"RIFF....WAVEfmt ").unwrap();
            path
        })
        .collect();
    (dir, paths)
}
