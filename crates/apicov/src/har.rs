//! HAR (HTTP Archive) log model.
//!
//! Reads the HAR 1.2 format produced by browser recorders and test-runner
//! request loggers. Only the parts coverage needs are modelled; every other
//! field is ignored on input. Recorders differ in how much they write, so all
//! fields except the request method and URL are optional.

use crate::result::{CoverageError, CoverageResult};
use serde::{Deserialize, Serialize};

/// HAR file root structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Har {
    /// HAR log container
    pub log: HarLog,
}

impl Har {
    /// Create a new empty HAR file
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse HAR from JSON string
    pub fn from_json(json: &str) -> CoverageResult<Self> {
        serde_json::from_str(json).map_err(|e| CoverageError::har(e.to_string()))
    }

    /// Serialize HAR to JSON string
    pub fn to_json(&self) -> CoverageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Get number of entries
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.log.entries.len()
    }

    /// Add an entry
    pub fn add_entry(&mut self, entry: HarEntry) {
        self.log.entries.push(entry);
    }

    /// Entries in recording order
    #[must_use]
    pub fn entries(&self) -> &[HarEntry] {
        &self.log.entries
    }
}

/// HAR log structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarLog {
    /// HAR format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Creator application info
    #[serde(default)]
    pub creator: HarCreator,
    /// List of recorded entries
    #[serde(default)]
    pub entries: Vec<HarEntry>,
}

impl Default for HarLog {
    fn default() -> Self {
        Self {
            version: default_version(),
            creator: HarCreator::default(),
            entries: Vec::new(),
        }
    }
}

fn default_version() -> String {
    "1.2".to_string()
}

/// Creator information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarCreator {
    /// Creator name
    #[serde(default)]
    pub name: String,
    /// Creator version
    #[serde(default)]
    pub version: String,
}

impl Default for HarCreator {
    fn default() -> Self {
        Self {
            name: "apicov".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A single HAR entry (request/response pair)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarEntry {
    /// Start time, as written by the recorder
    #[serde(rename = "startedDateTime", default, skip_serializing_if = "Option::is_none")]
    pub started_date_time: Option<serde_json::Value>,
    /// Total time in milliseconds
    #[serde(default)]
    pub time: f64,
    /// Request details
    pub request: HarRequest,
    /// Response details
    #[serde(default)]
    pub response: HarResponse,
}

impl HarEntry {
    /// Create a new entry
    #[must_use]
    pub fn new(request: HarRequest, response: HarResponse) -> Self {
        Self {
            started_date_time: None,
            time: 0.0,
            request,
            response,
        }
    }
}

/// HTTP request in HAR format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarRequest {
    /// HTTP method
    pub method: String,
    /// Full request URL, query string included
    pub url: String,
    /// HTTP version
    #[serde(rename = "httpVersion", default)]
    pub http_version: String,
}

impl HarRequest {
    /// Create a GET request
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Create a POST request
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    /// Create a new request
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            http_version: "HTTP/1.1".to_string(),
        }
    }
}

/// HTTP response in HAR format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarResponse {
    /// HTTP status code, 0 when the request never completed
    #[serde(default)]
    pub status: u16,
    /// Status text
    #[serde(rename = "statusText", default)]
    pub status_text: String,
}

impl HarResponse {
    /// Create a successful response
    #[must_use]
    pub fn ok() -> Self {
        Self::new(200, "OK")
    }

    /// Create a not found response
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    /// Create a new response
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_har_is_empty() {
        let har = Har::new();
        assert_eq!(har.log.version, "1.2");
        assert_eq!(har.entry_count(), 0);
    }

    #[test]
    fn test_add_entry() {
        let mut har = Har::new();
        har.add_entry(HarEntry::new(
            HarRequest::get("http://example.com"),
            HarResponse::ok(),
        ));
        assert_eq!(har.entry_count(), 1);
        assert_eq!(har.entries()[0].request.method, "GET");
    }

    #[test]
    fn test_minimal_request_log_parses() {
        // Shape written by test-runner request loggers: no cache, timings, headers
        let json = r#"{"log": {"version": "1.2", "pages": [], "entries": [
            {"startedDateTime": 1700000000000, "time": 12,
             "request": {"method": "GET", "url": "https://api.example.com/pets?limit=1"},
             "response": {"status": 200, "statusText": "OK"}}
        ]}}"#;
        let har = Har::from_json(json).unwrap();
        assert_eq!(har.entry_count(), 1);
        assert_eq!(har.entries()[0].response.status, 200);
    }

    #[test]
    fn test_full_recorder_entry_parses() {
        let json = r#"{"log": {"version": "1.2",
            "creator": {"name": "recorder", "version": "5"},
            "entries": [{
                "startedDateTime": "2024-01-01T00:00:00.000Z", "time": 1.5,
                "request": {"method": "POST", "url": "https://api.example.com/pets",
                    "httpVersion": "HTTP/2", "headers": [], "cookies": [], "queryString": [],
                    "headersSize": -1, "bodySize": 0},
                "response": {"status": 201, "statusText": "Created", "httpVersion": "HTTP/2",
                    "headers": [], "cookies": [], "content": {"size": 0, "mimeType": "text/plain"},
                    "redirectURL": "", "headersSize": -1, "bodySize": 0},
                "cache": {}, "timings": {"send": 0, "wait": 1, "receive": 0}
            }]}}"#;
        let har = Har::from_json(json).unwrap();
        assert_eq!(har.log.creator.name, "recorder");
        assert_eq!(har.entries()[0].request.http_version, "HTTP/2");
    }

    #[test]
    fn test_missing_response_defaults_to_status_zero() {
        let json = r#"{"log": {"entries": [{"request": {"method": "GET", "url": "http://x/a"}}]}}"#;
        let har = Har::from_json(json).unwrap();
        assert_eq!(har.entries()[0].response.status, 0);
    }

    #[test]
    fn test_parse_error() {
        let err = Har::from_json("not json").unwrap_err();
        assert!(err.to_string().contains("HAR parse error"));
    }

    #[test]
    fn test_to_json_parses_back() {
        let mut har = Har::new();
        har.add_entry(HarEntry::new(HarRequest::post("http://x/a"), HarResponse::not_found()));
        let parsed = Har::from_json(&har.to_json().unwrap()).unwrap();
        assert_eq!(parsed.entries()[0].response.status, 404);
    }
}
