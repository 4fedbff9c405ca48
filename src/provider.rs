// Image generation provider: the seam the endpoint calls through, and the
// Replicate implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::generation::GenerationInput;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request to provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("prediction {status}: {detail}")]
    PredictionFailed { status: String, detail: String },

    #[error("unexpected output from provider: {0}")]
    MalformedOutput(String),

    #[error("provider returned no output")]
    EmptyOutput,
}

/// Detail reported for a failed prediction that carries no error text.
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Anything that can turn an image plus generation parameters into an
/// ordered list of output references.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        image: Vec<u8>,
        input: &GenerationInput,
    ) -> Result<Vec<String>, ProviderError>;
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    #[serde(flatten)]
    params: &'a GenerationInput,
    image: String,
}

#[derive(Serialize)]
struct PredictionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    input: PredictionInput<'a>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: String,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: String,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }
}

/// Client for Replicate's predictions API.
#[derive(Clone)]
pub struct ReplicateClient {
    http: reqwest::Client,
    api_base: String,
    api_token: String,
    model: String,
    poll_interval: Duration,
}

impl ReplicateClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            model: config.model.clone(),
            poll_interval: config.poll_interval,
        })
    }

    async fn create_prediction(&self, body: &PredictionRequest<'_>) -> Result<Prediction, ProviderError> {
        let (url, _) = prediction_endpoint(&self.api_base, &self.model);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(body)
            .send()
            .await?;
        read_prediction(response).await
    }

    async fn fetch_prediction(&self, url: &str) -> Result<Prediction, ProviderError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        read_prediction(response).await
    }
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    async fn generate(
        &self,
        image: Vec<u8>,
        input: &GenerationInput,
    ) -> Result<Vec<String>, ProviderError> {
        let (_, version) = prediction_endpoint(&self.api_base, &self.model);
        let body = PredictionRequest {
            version,
            input: PredictionInput {
                params: input,
                image: data_uri(&image),
            },
        };

        tracing::info!(model = %self.model, image_bytes = image.len(), "creating prediction");
        let mut prediction = self.create_prediction(&body).await?;

        while !prediction.is_terminal() {
            let Some(urls) = prediction.urls.as_ref() else {
                return Err(ProviderError::MalformedOutput(format!(
                    "prediction {} is {} but has no status URL",
                    prediction.id, prediction.status
                )));
            };
            let poll_url = urls.get.clone();
            tracing::debug!(id = %prediction.id, status = %prediction.status, "waiting on prediction");
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.fetch_prediction(&poll_url).await?;
        }

        if prediction.status != "succeeded" {
            let detail = value_text(&prediction.error);
            let detail = if detail.trim().is_empty() { UNKNOWN_ERROR.to_string() } else { detail };
            return Err(ProviderError::PredictionFailed {
                detail,
                status: prediction.status,
            });
        }

        tracing::info!(id = %prediction.id, "prediction succeeded");
        output_urls(prediction.output)
    }
}

async fn read_prediction(response: reqwest::Response) -> Result<Prediction, ProviderError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ProviderError::MalformedOutput(e.to_string()))
}

/// Resolve the create-prediction URL for a model reference. `owner/name:version`
/// targets the versioned endpoint; a bare `owner/name` uses the model's latest
/// deployment.
pub fn prediction_endpoint<'a>(api_base: &str, model: &'a str) -> (String, Option<&'a str>) {
    match model.split_once(':') {
        Some((_, version)) => (format!("{}/predictions", api_base), Some(version)),
        None => (format!("{}/models/{}/predictions", api_base, model), None),
    }
}

/// Embed raw image bytes as a data URI, sniffing the media type.
pub fn data_uri(bytes: &[u8]) -> String {
    let mime = match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        _ => "application/octet-stream",
    };
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// Normalise a prediction's output into an ordered list of strings.
pub fn output_urls(output: Value) -> Result<Vec<String>, ProviderError> {
    match output {
        Value::Array(items) => Ok(items.iter().map(value_text).collect()),
        Value::String(url) => Ok(vec![url]),
        Value::Null => Err(ProviderError::EmptyOutput),
        other => Err(ProviderError::MalformedOutput(other.to_string())),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
