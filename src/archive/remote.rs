use std::time::Duration;

use base64::Engine;

use crate::archive::writer::{ArchiveOutcome, StoredRecord, looks_rate_limited};
use crate::foundation::error::{StampError, StampResult};
use crate::normalize::keymap::KeyMap;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON payload POSTed to the tenant archive endpoint.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    /// Artifact bytes, base64-encoded.
    pub binary_payload: String,
    /// Requested filename.
    pub filename: String,
    /// Form name; keys the per-form sheet remotely.
    pub form_name: String,
    /// Field/value metadata, in form order.
    pub field_data: serde_json::Map<String, serde_json::Value>,
    /// Ordered field names defining the storage path.
    pub folder_structure: Vec<String>,
}

impl UploadPayload {
    /// Build a payload, base64-encoding the artifact bytes.
    pub fn new(
        bytes: &[u8],
        filename: impl Into<String>,
        form_name: impl Into<String>,
        field_data: &[(String, String)],
        folder_structure: &[String],
    ) -> Self {
        let mut map = serde_json::Map::new();
        for (k, v) in field_data {
            map.insert(k.clone(), serde_json::Value::String(v.clone()));
        }
        Self {
            binary_payload: base64::engine::general_purpose::STANDARD.encode(bytes),
            filename: filename.into(),
            form_name: form_name.into(),
            field_data: map,
            folder_structure: folder_structure.to_vec(),
        }
    }
}

/// Per-item response from the archive endpoint.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Whether the endpoint reported success.
    pub success: bool,
    /// Error message when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Stable location of the stored binary.
    #[serde(default)]
    pub file_url: Option<String>,
    /// Name the binary was stored under after collision avoidance.
    #[serde(default)]
    pub saved_filename: Option<String>,
    /// Resolved folder path.
    #[serde(default)]
    pub folder_path: Option<String>,
    /// Sheet the record row landed in.
    #[serde(default)]
    pub sheet_name: Option<String>,
    /// 1-based row position.
    #[serde(default)]
    pub row_number: Option<usize>,
}

#[derive(Debug, serde::Deserialize)]
struct BatchResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Vec<UploadResponse>,
}

#[derive(Debug, serde::Deserialize)]
struct CatalogResponse<T> {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    data: Option<T>,
}

/// Blocking HTTP client for one tenant's archive endpoint.
pub struct RemoteArchiveClient {
    endpoint: String,
    http: reqwest::blocking::Client,
}

impl RemoteArchiveClient {
    /// Build a client for the given endpoint address.
    pub fn new(endpoint: impl Into<String>) -> StampResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| StampError::network(format!("building http client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    /// Endpoint address this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Transmit one artifact.
    pub fn upload(&self, payload: &UploadPayload) -> StampResult<ArchiveOutcome> {
        match self.post_json::<UploadResponse>(payload) {
            Ok(resp) => outcome_from(resp),
            Err(e) => classify_failure(e),
        }
    }

    /// Transmit all artifacts in one call. The endpoint answers with an
    /// aggregate: all stored, or one failure for the whole batch.
    pub fn upload_batch(&self, payloads: &[UploadPayload]) -> StampResult<Vec<ArchiveOutcome>> {
        let resp = match self.post_json::<BatchResponse>(&payloads) {
            Ok(resp) => resp,
            Err(e) => {
                return classify_failure(e).map(|outcome| vec![outcome; payloads.len()]);
            }
        };
        if !resp.success {
            let msg = resp.error.unwrap_or_else(|| "unspecified remote error".to_string());
            return classify_failure(StampError::archive(msg))
                .map(|outcome| vec![outcome; payloads.len()]);
        }
        if resp.data.len() != payloads.len() {
            return Err(StampError::protocol(format!(
                "batch response holds {} results for {} payloads",
                resp.data.len(),
                payloads.len()
            )));
        }
        resp.data.into_iter().map(outcome_from).collect()
    }

    /// Form names known to the tenant.
    pub fn form_names(&self) -> StampResult<Vec<String>> {
        self.get_catalog("forms")
    }

    /// Site names known to the tenant.
    pub fn site_names(&self) -> StampResult<Vec<String>> {
        self.get_catalog("sites")
    }

    /// The tenant's master vocabulary for field-name normalization.
    pub fn key_map(&self) -> StampResult<KeyMap> {
        self.get_catalog("keymaps")
    }

    fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        body: &impl serde::Serialize,
    ) -> StampResult<T> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(body)
            .send()
            .map_err(|e| StampError::network(format!("posting to archive endpoint: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| StampError::network(format!("reading endpoint response: {e}")))?;
        if !status.is_success() {
            return Err(StampError::archive(format!(
                "endpoint answered {status}: {text}"
            )));
        }
        serde_json::from_str(&text)
            .map_err(|e| StampError::protocol(format!("malformed endpoint response: {e}")))
    }

    fn get_catalog<T: serde::de::DeserializeOwned>(&self, action: &str) -> StampResult<T> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("action", action)])
            .send()
            .map_err(|e| StampError::network(format!("querying catalog '{action}': {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| StampError::network(format!("reading catalog response: {e}")))?;
        if !status.is_success() {
            return Err(StampError::archive(format!(
                "catalog '{action}' answered {status}: {text}"
            )));
        }
        let parsed: CatalogResponse<T> = serde_json::from_str(&text)
            .map_err(|e| StampError::protocol(format!("malformed catalog response: {e}")))?;
        if !parsed.success {
            return Err(StampError::archive(
                parsed
                    .error
                    .unwrap_or_else(|| format!("catalog '{action}' reported failure")),
            ));
        }
        parsed
            .data
            .ok_or_else(|| StampError::protocol("catalog response missing data"))
    }
}

fn outcome_from(resp: UploadResponse) -> StampResult<ArchiveOutcome> {
    if !resp.success {
        let msg = resp.error.unwrap_or_else(|| "unspecified remote error".to_string());
        return classify_failure(StampError::archive(msg));
    }
    let missing = |field: &str| StampError::protocol(format!("successful response missing {field}"));
    Ok(ArchiveOutcome::Stored(StoredRecord {
        file_url: resp.file_url.ok_or_else(|| missing("fileUrl"))?,
        saved_filename: resp.saved_filename.ok_or_else(|| missing("savedFilename"))?,
        folder_path: resp.folder_path.ok_or_else(|| missing("folderPath"))?,
        sheet_name: resp.sheet_name.ok_or_else(|| missing("sheetName"))?,
        row_number: resp.row_number.ok_or_else(|| missing("rowNumber"))?,
    }))
}

// Rate-limit-shaped archive errors become ambiguous outcomes; everything else
// stays a hard failure.
fn classify_failure(e: StampError) -> StampResult<ArchiveOutcome> {
    if let StampError::Archive(msg) = &e {
        if looks_rate_limited(msg) {
            tracing::warn!(error = %msg, "rate-limited endpoint response treated as probable success");
            return Ok(ArchiveOutcome::Ambiguous {
                warning: format!(
                    "the endpoint answered rate-limited ({msg}); the upload most likely \
                     succeeded — verify the archived file and sheet row manually before retrying"
                ),
            });
        }
    }
    Err(e)
}

#[cfg(test)]
#[path = "../../tests/unit/archive/remote.rs"]
mod tests;
