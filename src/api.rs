use crate::error::{Error, Result};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Per-job metadata as reported by `GET /api/v1/Backup/{id}`. Every field is
/// optional: a job that has never run reports none of them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackupSnapshot {
    pub last_backup_date: Option<String>,
    pub last_error_date: Option<String>,
    pub last_error_message: Option<String>,
    pub last_backup_duration: Option<String>,
    pub source_files_size: Option<u64>,
    pub source_files_count: Option<u64>,
    pub target_files_size: Option<u64>,
    pub target_files_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackupEntry {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Metadata", default)]
    pub metadata: BackupSnapshot,
}

#[derive(Debug, Deserialize)]
struct BackupInfoResponse {
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "data")]
    data: Option<BackupInfoData>,
}

#[derive(Debug, Deserialize)]
struct BackupInfoData {
    #[serde(rename = "Backup")]
    backup: BackupEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInfo {
    #[serde(rename = "ServerVersion")]
    pub server_version: Option<String>,
    #[serde(rename = "APIVersion")]
    pub api_version: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressState {
    #[serde(rename = "Phase")]
    pub phase: Option<String>,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

/// Client for the Duplicati REST backend.
pub struct DuplicatiClient {
    base_url: Url,
    client: Client,
    xsrf_token: Mutex<Option<String>>,
}

impl DuplicatiClient {
    pub fn new(base_url: &str, verify_ssl: bool) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("duplimon/0.1")
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;

        Ok(Self {
            base_url,
            client,
            xsrf_token: Mutex::new(None),
        })
    }

    pub fn host(&self) -> String {
        let host = self.base_url.host_str().unwrap_or_default();
        match self.base_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Fetch the metadata snapshot for one backup job.
    pub async fn get_backup(&self, backup_id: &str) -> Result<BackupEntry> {
        validate_backup_id(backup_id)?;
        let endpoint = format!("/api/v1/Backup/{}", backup_id);
        let body = self.api_request(&endpoint, reqwest::Method::GET).await?;
        let info: BackupInfoResponse = serde_json::from_str(&body)?;
        // A transport-level success can still carry a server-side error.
        if let Some(message) = info.error {
            return Err(Error::ApiResponse(message));
        }
        match info.data {
            Some(data) => Ok(data.backup),
            None => Err(Error::ApiResponse(
                "Response contains neither data nor an error".to_string(),
            )),
        }
    }

    pub async fn get_system_info(&self) -> Result<SystemInfo> {
        let body = self
            .api_request("/api/v1/SystemInfo", reqwest::Method::GET)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get_progress_state(&self) -> Result<ProgressState> {
        let body = self
            .api_request("/api/v1/ProgressState", reqwest::Method::GET)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Ask the server to start a backup run. Refuses while another run is in
    /// progress, matching the server UI behavior.
    pub async fn start_backup(&self, backup_id: &str) -> Result<()> {
        validate_backup_id(backup_id)?;
        let progress = self.get_progress_state().await.unwrap_or_default();
        let phase = progress
            .phase
            .or(progress.error)
            .unwrap_or_else(|| "No active backup".to_string());
        if !matches!(
            phase.as_str(),
            "No active backup" | "Backup_Complete" | "Error"
        ) {
            return Err(Error::ApiResponse(format!(
                "A backup process is already running (phase '{}')",
                phase
            )));
        }
        let endpoint = format!("/api/v1/Backup/{}/run", backup_id);
        self.api_request(&endpoint, reqwest::Method::POST).await?;
        log::debug!("Requested backup run for job '{}'", backup_id);
        Ok(())
    }

    async fn api_request(&self, endpoint: &str, method: reqwest::Method) -> Result<String> {
        let token = self.ensure_token().await?;
        let response = self.send(endpoint, method.clone(), &token).await?;

        // A stale token comes back as 400; refresh once and retry.
        if response.status() == StatusCode::BAD_REQUEST {
            let token = self.fetch_token().await?;
            let response = self.send(endpoint, method, &token).await?;
            return self.read_body(response).await;
        }
        self.read_body(response).await
    }

    async fn send(&self, endpoint: &str, method: reqwest::Method, token: &str) -> Result<Response> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| Error::Internal(format!("Bad endpoint '{}': {}", endpoint, e)))?;
        self.client
            .request(method, url)
            .header("X-XSRF-Token", token)
            .send()
            .await
            .map_err(connect_error)
    }

    async fn read_body(&self, response: Response) -> Result<String> {
        // Keep the freshest token the server hands out.
        if let Some(token) = extract_xsrf_token(&response) {
            *self.xsrf_token.lock().await = Some(token);
        }
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::InvalidAuth(format!("Server returned {}", status)));
        }
        if !status.is_success() {
            return Err(Error::ApiResponse(format!("HTTP error: {}", status)));
        }
        let text = response.text().await.map_err(connect_error)?;
        // Duplicati prefixes its JSON with a UTF-8 BOM.
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }

    async fn ensure_token(&self) -> Result<String> {
        if let Some(token) = self.xsrf_token.lock().await.clone() {
            return Ok(token);
        }
        self.fetch_token().await
    }

    /// The server issues the XSRF token as a cookie on the landing page.
    async fn fetch_token(&self) -> Result<String> {
        let response = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(connect_error)?;
        if !response.status().is_success() {
            return Err(Error::CannotConnect(format!(
                "Failed to retrieve XSRF token: {}",
                response.status()
            )));
        }
        match extract_xsrf_token(&response) {
            Some(token) => {
                log::debug!("XSRF token obtained");
                *self.xsrf_token.lock().await = Some(token.clone());
                Ok(token)
            }
            None => Err(Error::ApiResponse(
                "XSRF token not found in server cookies".to_string(),
            )),
        }
    }
}

fn validate_backup_id(backup_id: &str) -> Result<()> {
    if backup_id.is_empty() || !backup_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::MalformedData(format!(
            "Invalid backup ID format: '{}'",
            backup_id
        )));
    }
    Ok(())
}

fn connect_error(e: reqwest::Error) -> Error {
    if e.is_connect() || e.is_timeout() {
        Error::CannotConnect(e.to_string())
    } else {
        Error::Http(e)
    }
}

fn extract_xsrf_token(response: &Response) -> Option<String> {
    for header in response.headers().get_all("set-cookie") {
        let Ok(raw) = header.to_str() else { continue };
        for cookie in raw.split(';') {
            if let Some((key, value)) = cookie.trim().split_once('=') {
                if key.trim() == "xsrf-token" {
                    return Some(percent_decode(value.trim()));
                }
            }
        }
    }
    None
}

// Cookie values arrive percent-encoded.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&value[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_id_must_be_numeric() {
        assert!(validate_backup_id("3").is_ok());
        assert!(validate_backup_id("120").is_ok());
        assert!(validate_backup_id("").is_err());
        assert!(validate_backup_id("abc").is_err());
        assert!(validate_backup_id("1; DROP").is_err());
    }

    #[test]
    fn percent_decoding_handles_encoded_tokens() {
        assert_eq!(percent_decode("abc123"), "abc123");
        assert_eq!(percent_decode("a%2Bb%3D"), "a+b=");
        // Truncated escapes pass through untouched.
        assert_eq!(percent_decode("a%2"), "a%2");
    }

    #[test]
    fn snapshot_deserializes_from_metadata_json() {
        let raw = r#"{
            "LastBackupDate": "20240101T000000Z",
            "SourceFilesSize": 1024,
            "TargetFilesCount": 7
        }"#;
        let snapshot: BackupSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.last_backup_date.as_deref(), Some("20240101T000000Z"));
        assert_eq!(snapshot.source_files_size, Some(1024));
        assert_eq!(snapshot.target_files_count, Some(7));
        assert_eq!(snapshot.last_error_date, None);
        assert_eq!(snapshot.last_backup_duration, None);
    }
}
