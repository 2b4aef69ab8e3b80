//! HTTP summarization backend.
//!
//! Talks to a HuggingFace-Inference-style summarization endpoint:
//!
//! ```text
//! POST {endpoint}
//! {"inputs": "...", "parameters": {"min_length": 30, "max_length": 130, "do_sample": false}}
//!
//! 200 OK
//! [{"summary_text": "..."}]
//! ```
//!
//! Calls are blocking. The client timeout doubles as the per-chunk deadline:
//! a request that runs over it surfaces as [`ModelError::Timeout`].

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::summarizer::{LengthBounds, SummaryModel};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

#[derive(Serialize)]
struct Parameters {
    min_length: usize,
    max_length: usize,
    do_sample: bool,
}

#[derive(Deserialize)]
struct SummaryPayload {
    summary_text: String,
}

/// A remote summarization model.
#[derive(Debug, Clone)]
pub struct HttpSummaryModel {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpSummaryModel {
    /// Create a backend for `endpoint` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Http`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ModelError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: None,
        })
    }

    /// Send `token` as a bearer token with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SummaryModel for HttpSummaryModel {
    fn generate(&self, text: &str, bounds: LengthBounds) -> Result<String, ModelError> {
        let mut request = self.client.post(&self.endpoint).json(&request_body(text, bounds));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(classify)?;
        let status = response.status();
        let body = response.text().map_err(classify)?;
        if !status.is_success() {
            return Err(ModelError::Inference(format!(
                "endpoint returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        parse_summary(&body)
    }
}

fn request_body(text: &str, bounds: LengthBounds) -> SummarizeRequest<'_> {
    SummarizeRequest {
        inputs: text,
        parameters: Parameters {
            min_length: bounds.min,
            max_length: bounds.max,
            do_sample: false,
        },
    }
}

fn classify(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout
    } else {
        ModelError::Http(err)
    }
}

fn parse_summary(body: &str) -> Result<String, ModelError> {
    let payloads: Vec<SummaryPayload> = serde_json::from_str(body)
        .map_err(|e| ModelError::MalformedResponse(format!("{e}")))?;
    payloads
        .into_iter()
        .next()
        .map(|p| p.summary_text)
        .ok_or_else(|| ModelError::MalformedResponse("empty summary list".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = request_body("Some text.", LengthBounds { min: 30, max: 70 });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inputs": "Some text.",
                "parameters": {"min_length": 30, "max_length": 70, "do_sample": false}
            })
        );
    }

    #[test]
    fn test_parse_summary() {
        let summary = parse_summary(r#"[{"summary_text": "Short version."}]"#).unwrap();
        assert_eq!(summary, "Short version.");
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_summary(r#"{"error": "model loading"}"#),
            Err(ModelError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_summary("[]"),
            Err(ModelError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_error() {
        let model = HttpSummaryModel::new("http://127.0.0.1:9/summarize", Duration::from_secs(2))
            .unwrap();
        let bounds = LengthBounds { min: 30, max: 70 };
        assert!(model.generate("text", bounds).is_err());
    }
}
