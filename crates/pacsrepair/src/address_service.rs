//! Client for the external address-structuring service.
//!
//! The service accepts one address fragment as a multipart file upload and
//! answers with a JSON object holding a single address key whose value maps
//! sub-field names to values. One request per call, no retry.

use indexmap::IndexMap;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::envelope::XML_CONTENT_TYPE;
use crate::repair::AddressSuggestion;

const UPLOAD_FIELD: &str = "file";
const UPLOAD_FILE_NAME: &str = "address.xml";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("address service answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("address service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("address service sent an unusable response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
pub struct AddressServiceClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AddressServiceClient {
    /// Client posting to `endpoint` with the HTTP client's default timeouts
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_client(http, endpoint))
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send an unstructured address fragment and read back its sub-fields
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn structure(&self, fragment: &str) -> Result<AddressSuggestion, ServiceError> {
        let part = Part::text(fragment.to_string())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(XML_CONTENT_TYPE)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .inspect_err(|err| warn!(%err, "address service request failed"))?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "address service answered");
        parse_service_response(status, &body)
    }
}

/// Turn a raw service answer into a suggestion.
///
/// Only a 2xx status with a JSON object holding exactly one key, whose
/// value is itself an object, is accepted. Non-string values are written in
/// their JSON form; `null` becomes empty.
pub fn parse_service_response(
    status: StatusCode,
    body: &str,
) -> Result<AddressSuggestion, ServiceError> {
    if !status.is_success() {
        warn!(%status, "address service rejected the request");
        return Err(ServiceError::Status {
            status,
            body: body.to_string(),
        });
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|err| ServiceError::InvalidResponse(format!("body is not JSON: {err}")))?;
    let Value::Object(top) = value else {
        return Err(ServiceError::InvalidResponse(
            "body is not a JSON object".to_string(),
        ));
    };
    if top.len() != 1 {
        return Err(ServiceError::InvalidResponse(format!(
            "expected one address key, found {}",
            top.len()
        )));
    }
    let Some((key, Value::Object(address))) = top.into_iter().next() else {
        return Err(ServiceError::InvalidResponse(
            "address value is not an object".to_string(),
        ));
    };
    debug!(key = %key, fields = address.len(), "address structured");

    let fields: IndexMap<String, String> = address
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(text) => text,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (name, text)
        })
        .collect();
    Ok(AddressSuggestion { fields })
}
