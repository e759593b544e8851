//! HTTP upload of decoded readings.

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use url::Url;

/// Issues one POST per reading to the configured database URL.
pub struct Uploader {
    client: Client,
    url: Url,
}

/// Remote store verdict for one reading.
#[derive(Debug, PartialEq)]
pub enum UploadOutcome {
    /// HTTP 200. `name` carries the record identifier when the response body contains one,
    /// such as the key Firebase assigns to a pushed record.
    Accepted { name: Option<String> },
    /// Any other HTTP status. The body is kept verbatim for diagnostics.
    Rejected { status: StatusCode, body: String },
}

impl Uploader {
    pub fn new(url: Url) -> Self {
        Uploader {
            client: Client::new(),
            url,
        }
    }

    /// POST one reading as JSON.
    ///
    /// Transport failures surface as `Err`. The reading is never retried either way.
    pub async fn upload(
        &self,
        reading: &Map<String, Value>,
    ) -> Result<UploadOutcome, reqwest::Error> {
        let resp = self
            .client
            .post(self.url.clone())
            .json(reading)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            return Ok(UploadOutcome::Rejected { status, body });
        }

        let name = match serde_json::from_str::<Value>(body.as_str()) {
            Err(_) => None,
            Ok(value) => match value.get("name") {
                None => None,
                Some(name) => match name.as_str() {
                    None => None,
                    Some(name) => Some(name.to_string()),
                },
            },
        };
        Ok(UploadOutcome::Accepted { name })
    }
}
