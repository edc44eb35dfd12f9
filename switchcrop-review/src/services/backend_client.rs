//! Analysis backend client
//!
//! The backend ingests recordings, detects the interval of interest per file,
//! serves spectrograms and crops the batch into a downloadable archive. This
//! module holds the wire shapes, the `AnalysisBackend` seam the coordinator
//! depends on, and the reqwest implementation.
//!
//! Every failure is reported as one message: a non-2xx status or a
//! `success: false` body carrying `error` becomes `BackendRejection` with that
//! message verbatim; anything without a readable message becomes `Transport`.

use crate::error::{ReviewError, ReviewResult};
use crate::models::{
    BatchOutcome, DownloadReference, Interval, SpectrogramPayload, UploadedFile,
    WeightedAverageInterval,
};
use async_trait::async_trait;
use reqwest::{multipart, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("switchcrop/", env!("CARGO_PKG_VERSION"));

/// Multipart field carrying each recording
const UPLOAD_FIELD: &str = "files";

/// Per-file row of the upload detection table
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Detection {
    pub filename: String,
    /// Present on backends that return the server key with the detection
    #[serde(default)]
    pub unique_filename: Option<String>,
    pub duration: f64,
    pub detected_start: f64,
    pub detected_end: f64,
}

/// Parsed successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadAnalysis {
    pub weighted_average: Option<WeightedAverageInterval>,
    pub detections: Vec<Detection>,
    pub total_files: usize,
}

/// Entry of `GET /get_file_list`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileListEntry {
    pub filename: String,
    pub unique_filename: String,
    /// `[start, end]`; either side may be null when detection found nothing
    #[serde(default)]
    pub detected_interval: Option<[Option<f64>; 2]>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    weighted_average: Option<WeightedAverageWire>,
    #[serde(default)]
    files: Vec<Detection>,
    #[serde(default)]
    total_files: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct WeightedAverageWire {
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct SpectrogramResponse {
    #[serde(default)]
    filename: String,
    time_frames: Vec<f64>,
    mel_spec_db: Vec<Vec<f64>>,
    #[serde(default)]
    sr: Option<u32>,
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    start_time: f64,
    end_time: f64,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    processed_files: usize,
    #[serde(default)]
    failed_files: usize,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    zip_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Calls the review workflow makes against the analysis backend
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// `POST /upload` with every staged file in one request
    async fn upload(&self, files: &[UploadedFile]) -> ReviewResult<UploadAnalysis>;

    /// `GET /get_file_list`, in server order
    async fn file_list(&self) -> ReviewResult<Vec<FileListEntry>>;

    /// `GET /get_spectrogram/{unique_filename}`
    async fn spectrogram(&self, unique_filename: &str) -> ReviewResult<SpectrogramPayload>;

    /// `POST /process_batch` with the final interval
    async fn process_batch(&self, interval: Interval) -> ReviewResult<BatchOutcome>;

    /// Fetch the archive bytes behind a download reference
    async fn download(&self, reference: &DownloadReference) -> ReviewResult<Vec<u8>>;
}

/// reqwest implementation of [`AnalysisBackend`]
#[derive(Clone)]
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> ReviewResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            ReviewError::Common(switchcrop_common::Error::Config(format!(
                "invalid backend URL '{}': {}",
                base_url, e
            )))
        })?;
        // Url::join replaces the last segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ReviewError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ReviewResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ReviewError::Transport(format!("invalid endpoint '{}': {}", path, e)))
    }

    fn spectrogram_url(&self, unique_filename: &str) -> ReviewResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReviewError::Transport(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .push("get_spectrogram")
            .push(unique_filename);
        Ok(url)
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn upload(&self, files: &[UploadedFile]) -> ReviewResult<UploadAnalysis> {
        let mut form = multipart::Form::new();
        for file in files {
            let bytes = tokio::fs::read(&file.path).await?;
            let part = multipart::Part::bytes(bytes).file_name(file.filename.clone());
            form = form.part(UPLOAD_FIELD, part);
        }

        let url = self.endpoint("upload")?;
        tracing::info!(url = %url, files = files.len(), "Uploading batch for analysis");

        let response = self.http_client.post(url).multipart(form).send().await?;
        let body: UploadResponse = read_json(response).await?;

        if !body.success {
            return Err(rejection(body.error, "Upload failed"));
        }

        let weighted_average = body
            .weighted_average
            .map(|avg| WeightedAverageInterval::new(avg.start, avg.end))
            .transpose()?;
        let total_files = body.total_files.unwrap_or(body.files.len());

        tracing::info!(
            analyzed = body.files.len(),
            total_files,
            "Upload analyzed"
        );

        Ok(UploadAnalysis {
            weighted_average,
            detections: body.files,
            total_files,
        })
    }

    async fn file_list(&self) -> ReviewResult<Vec<FileListEntry>> {
        let url = self.endpoint("get_file_list")?;
        tracing::debug!(url = %url, "Fetching file list");
        let response = self.http_client.get(url).send().await?;
        read_json(response).await
    }

    async fn spectrogram(&self, unique_filename: &str) -> ReviewResult<SpectrogramPayload> {
        let url = self.spectrogram_url(unique_filename)?;
        tracing::debug!(unique_filename, url = %url, "Fetching spectrogram");

        let response = self.http_client.get(url).send().await?;
        let body: SpectrogramResponse = read_json(response).await?;

        let payload = SpectrogramPayload {
            unique_filename: unique_filename.to_string(),
            filename: body.filename,
            time_frames: body.time_frames,
            mel_spec_db: body.mel_spec_db,
            sample_rate: body.sr,
        };
        payload.validate()?;
        Ok(payload)
    }

    async fn process_batch(&self, interval: Interval) -> ReviewResult<BatchOutcome> {
        let url = self.endpoint("process_batch")?;
        tracing::info!(
            url = %url,
            start = interval.start,
            end = interval.end,
            "Submitting batch crop"
        );

        let response = self
            .http_client
            .post(url)
            .json(&BatchRequest {
                start_time: interval.start,
                end_time: interval.end,
            })
            .send()
            .await?;
        let body: BatchResponse = read_json(response).await?;

        if !body.success {
            return Err(rejection(body.error, "Batch processing failed"));
        }

        let url = body.download_url.ok_or_else(|| {
            ReviewError::BackendRejection("Batch response has no download_url".to_string())
        })?;
        let filename = body
            .zip_filename
            .or_else(|| url.rsplit('/').next().map(str::to_string))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "processed_audio.zip".to_string());

        Ok(BatchOutcome {
            processed_files: body.processed_files,
            failed_files: body.failed_files,
            download: DownloadReference { url, filename },
        })
    }

    async fn download(&self, reference: &DownloadReference) -> ReviewResult<Vec<u8>> {
        let url = self.endpoint(&reference.url)?;
        tracing::info!(url = %url, "Downloading archive");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ReviewResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(status_error(status, &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| ReviewError::Transport(format!("Unreadable backend response: {}", e)))
}

/// Non-2xx: prefer the backend's own `{ "error": ... }` message
fn status_error(status: StatusCode, body: &str) -> ReviewError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) if !error.trim().is_empty() => ReviewError::BackendRejection(error),
        _ => ReviewError::Transport(format!("Backend responded with status {}", status)),
    }
}

fn rejection(message: Option<String>, fallback: &str) -> ReviewError {
    ReviewError::BackendRejection(
        message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string()),
    )
}
