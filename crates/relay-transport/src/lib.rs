//! HTTP transport client for the relay backend.
//!
//! Wraps the backend's JSON envelope API, validates wire payloads at the
//! snapshot-ingestion boundary, and normalizes every failure into
//! [`RelayError`]. Pure request/response: polling cadence and view mutation
//! live in `relay-core` and the frontend.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use relay_core::{
    ClearSummary, FileRef, Message, MessageBody, MessageId, RelayError, RelayErrorKind, Snapshot,
    classify_http_status,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, warn};

const MESSAGES_PATH: &str = "/api/messages";
const FILES_UPLOAD_PATH: &str = "/api/files/upload";
const FILES_DOWNLOAD_PATH: &str = "/api/files/download";
const SYNC_PATH: &str = "/api/sync";
const CLEAR_ALL_PATH: &str = "/api/clear-all";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const UPLOAD_CHUNK_BYTES: usize = 1024 * 1024;

/// Client-side pre-flight upload cap; the server enforces no limit itself.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Default fetch-window size for message polls.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;

/// Fractional upload progress observer, called with values in `[0, 100]`,
/// monotonically increasing per upload.
pub type ProgressSink = Arc<dyn Fn(f64) + Send + Sync>;

/// Acknowledgement for a posted text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Server-assigned message id.
    pub id: MessageId,
}

/// Acknowledgement for a completed file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_id: i64,
    pub file_name: String,
    pub file_size: u64,
    pub storage_key: String,
}

/// File content to upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Downloaded file content with response metadata.
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

/// HTTP client bound to one relay backend.
#[derive(Debug, Clone)]
pub struct RelayApi {
    http: reqwest::Client,
    base_url: String,
}

impl RelayApi {
    /// Build a client for `base_url` (scheme + host, no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| RelayError::Network(format!("failed to build HTTP client: {err}")))?;

        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Fetch one ordered message window as a validated [`Snapshot`].
    ///
    /// A snapshot containing any malformed entry is rejected whole; callers
    /// keep their previous view in that case.
    pub async fn fetch_snapshot(&self, limit: u32, offset: u32) -> Result<Snapshot, RelayError> {
        let url = format!("{}{}", self.base_url, MESSAGES_PATH);
        let response = self
            .http
            .get(url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await
            .map_err(|err| RelayError::Network(format!("fetch messages: {err}")))?;

        let wire: Vec<WireMessage> = parse_envelope(response, "fetch messages").await?;
        let messages = wire
            .into_iter()
            .map(WireMessage::into_message)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(message_count = messages.len(), "fetched message snapshot");
        Ok(Snapshot::from_messages(messages))
    }

    /// Post a text message for `device_id`.
    pub async fn send_message(
        &self,
        content: &str,
        device_id: &str,
    ) -> Result<SendReceipt, RelayError> {
        let url = format!("{}{}", self.base_url, MESSAGES_PATH);
        let response = self
            .http
            .post(url)
            .json(&json!({ "content": content, "deviceId": device_id }))
            .send()
            .await
            .map_err(|err| RelayError::Network(format!("send message: {err}")))?;

        let data: WireSendData = parse_envelope(response, "send message").await?;
        Ok(SendReceipt { id: data.id })
    }

    /// Upload a file as multipart form data, reporting fractional progress per
    /// streamed chunk when a sink is supplied.
    ///
    /// The 10 MiB cap is enforced pre-flight; oversized uploads never reach
    /// the network.
    pub async fn upload_file(
        &self,
        upload: FileUpload,
        device_id: &str,
        progress: Option<ProgressSink>,
    ) -> Result<UploadReceipt, RelayError> {
        let total = upload.bytes.len() as u64;
        if total > MAX_UPLOAD_BYTES {
            return Err(RelayError::SizeLimit {
                limit: MAX_UPLOAD_BYTES,
                actual: total,
            });
        }

        let chunks: Vec<Bytes> = upload
            .bytes
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(Bytes::copy_from_slice)
            .collect();
        // An empty file streams no chunks; progress still terminates at 100.
        if chunks.is_empty()
            && let Some(report) = &progress
        {
            report(100.0);
        }
        let mut sent = 0u64;
        let body_stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(report) = &progress {
                report((sent as f64 / total as f64) * 100.0);
            }
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(body_stream),
            total,
        )
        .file_name(upload.file_name.clone())
        .mime_str(&upload.mime_type)
        .map_err(|err| RelayError::Validation(format!("invalid MIME type: {err}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("deviceId", device_id.to_owned());

        let url = format!("{}{}", self.base_url, FILES_UPLOAD_PATH);
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| RelayError::Network(format!("upload file: {err}")))?;

        let data: WireUploadData = parse_envelope(response, "upload file").await?;
        Ok(UploadReceipt {
            file_id: data.file_id,
            file_name: data.file_name,
            file_size: data.file_size,
            storage_key: data.r2_key,
        })
    }

    /// Navigation URL for a stored file; the actual browser-style download
    /// trigger is a frontend side effect outside reconciliation scope.
    pub fn download_url(&self, storage_key: &str) -> String {
        format!("{}{}/{}", self.base_url, FILES_DOWNLOAD_PATH, storage_key)
    }

    /// Fetch a stored file's raw bytes. Unknown keys yield
    /// [`RelayError::NotFound`].
    pub async fn download_file(&self, storage_key: &str) -> Result<FileDownload, RelayError> {
        let response = self
            .http
            .get(self.download_url(storage_key))
            .send()
            .await
            .map_err(|err| RelayError::Network(format!("download file: {err}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RelayError::NotFound(storage_key.to_owned()));
        }
        if !status.is_success() {
            return Err(RelayError::Network(format!(
                "download file: HTTP {status}"
            )));
        }

        let content_type = header_string(&response, reqwest::header::CONTENT_TYPE);
        let content_length = response.content_length();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RelayError::Network(format!("download file: {err}")))?;

        Ok(FileDownload {
            bytes,
            content_type,
            content_length,
        })
    }

    /// Register this device with the backend. Failures are reported but are
    /// non-fatal to callers by contract.
    pub async fn sync_device(&self, device_id: &str, device_name: &str) -> Result<(), RelayError> {
        let url = format!("{}{}", self.base_url, SYNC_PATH);
        let response = self
            .http
            .post(url)
            .json(&json!({ "deviceId": device_id, "deviceName": device_name }))
            .send()
            .await
            .map_err(|err| RelayError::Network(format!("sync device: {err}")))?;

        let _: Option<serde_json::Value> =
            parse_envelope_allow_missing_data(response, "sync device").await?;
        Ok(())
    }

    /// Destructively clear every message and file on the backend.
    ///
    /// The backend rejects a wrong confirm code with 400, surfaced as
    /// [`RelayError::Validation`].
    pub async fn clear_all(&self, confirm_code: &str) -> Result<ClearSummary, RelayError> {
        let url = format!("{}{}", self.base_url, CLEAR_ALL_PATH);
        let response = self
            .http
            .post(url)
            .json(&json!({ "confirmCode": confirm_code }))
            .send()
            .await
            .map_err(|err| RelayError::Network(format!("clear all: {err}")))?;

        let data: WireClearData = parse_envelope(response, "clear all").await?;
        warn!(
            deleted_messages = data.deleted_messages,
            deleted_files = data.deleted_files,
            "backend cleared all data"
        );
        Ok(ClearSummary {
            deleted_messages: data.deleted_messages,
            deleted_files: data.deleted_files,
            deleted_file_size: data.deleted_file_size,
            deleted_r2_files: data.deleted_r2_files,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSendData {
    id: MessageId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUploadData {
    file_id: i64,
    file_name: String,
    file_size: u64,
    r2_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClearData {
    deleted_messages: u64,
    deleted_files: u64,
    deleted_file_size: u64,
    deleted_r2_files: u64,
}

/// Raw message row as served by the backend; every field optional so that
/// validation happens here with typed errors instead of serde failures.
#[derive(Debug, Clone, Deserialize)]
struct WireMessage {
    id: Option<MessageId>,
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
    device_id: Option<String>,
    timestamp: Option<serde_json::Value>,
    original_name: Option<String>,
    file_size: Option<u64>,
    mime_type: Option<String>,
    r2_key: Option<String>,
}

impl WireMessage {
    fn into_message(self) -> Result<Message, RelayError> {
        let id = self
            .id
            .ok_or_else(|| RelayError::Validation("message entry missing id".to_owned()))?;
        let device_id = self
            .device_id
            .ok_or_else(|| RelayError::Validation(format!("message {id} missing device_id")))?;
        let timestamp_ms = self
            .timestamp
            .as_ref()
            .and_then(parse_timestamp_ms)
            .ok_or_else(|| RelayError::Validation(format!("message {id} missing timestamp")))?;

        let body = match self.kind.as_deref() {
            Some("text") => MessageBody::Text {
                content: self.content.ok_or_else(|| {
                    RelayError::Validation(format!("text message {id} missing content"))
                })?,
            },
            Some("file") => MessageBody::File(FileRef {
                original_name: self.original_name.ok_or_else(|| {
                    RelayError::Validation(format!("file message {id} missing original_name"))
                })?,
                file_size: self.file_size.ok_or_else(|| {
                    RelayError::Validation(format!("file message {id} missing file_size"))
                })?,
                mime_type: self.mime_type.unwrap_or_else(|| "application/octet-stream".to_owned()),
                storage_key: self.r2_key.ok_or_else(|| {
                    RelayError::Validation(format!("file message {id} missing r2_key"))
                })?,
            }),
            other => {
                return Err(RelayError::Validation(format!(
                    "message {id} has unknown type {other:?}"
                )));
            }
        };

        Ok(Message {
            id,
            device_id,
            timestamp_ms,
            body,
        })
    }
}

/// Parse a wire timestamp: epoch milliseconds, RFC 3339, or the backend's
/// SQLite `YYYY-MM-DD HH:MM:SS` form (UTC).
fn parse_timestamp_ms(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(number) => number.as_i64(),
        serde_json::Value::String(text) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.with_timezone(&Utc).timestamp_millis());
            }
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc().timestamp_millis())
        }
        _ => None,
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

async fn parse_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, RelayError> {
    parse_envelope_inner(response, context)
        .await?
        .ok_or_else(|| RelayError::Validation(format!("{context}: response missing data")))
}

async fn parse_envelope_allow_missing_data<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<Option<T>, RelayError> {
    parse_envelope_inner(response, context).await
}

async fn parse_envelope_inner<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<Option<T>, RelayError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<Envelope<serde_json::Value>>()
            .await
            .ok()
            .and_then(|envelope| envelope.error)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(match classify_http_status(status.as_u16()) {
            RelayErrorKind::Validation => RelayError::Validation(detail),
            RelayErrorKind::NotFound => RelayError::NotFound(detail),
            _ => RelayError::Network(format!("{context}: {detail}")),
        });
    }

    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|err| RelayError::Validation(format!("{context}: malformed response: {err}")))?;
    if !envelope.success {
        return Err(RelayError::Validation(envelope.error.unwrap_or_else(|| {
            format!("{context}: server reported failure")
        })));
    }
    Ok(envelope.data)
}
