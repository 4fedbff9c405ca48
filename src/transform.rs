// POST /api/sketchToImage
//
// One endpoint, two request encodings: a JSON body carrying the frame as a
// data URL, or a multipart form carrying it as a file part.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap},
    response::Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::TransformError;
use crate::generation::GenerationInput;
use crate::provider::ProviderError;

pub const TRANSFORM_PATH: &str = "/api/sketchToImage";

/// How the frame arrived, and therefore how to turn it into raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    DataUrl(String),
    Upload(Bytes),
}

impl ImagePayload {
    pub fn is_empty(&self) -> bool {
        match self {
            ImagePayload::DataUrl(s) => s.is_empty(),
            ImagePayload::Upload(b) => b.is_empty(),
        }
    }

    pub fn decode(self) -> Result<Vec<u8>, TransformError> {
        match self {
            ImagePayload::DataUrl(s) => Ok(decode_data_url(&s)?),
            ImagePayload::Upload(b) => Ok(b.to_vec()),
        }
    }
}

/// Strip everything up to the first comma and base64-decode the rest. A
/// string with no comma is taken to be bare base64.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = data_url.split_once(',').map_or(data_url, |(_, data)| data);
    general_purpose::STANDARD.decode(encoded.trim())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub image: ImagePayload,
    pub prompt: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct JsonTransformBody {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrlResponse {
    pub image_url: String,
}

impl From<JsonTransformBody> for TransformRequest {
    fn from(body: JsonTransformBody) -> Self {
        TransformRequest {
            image: ImagePayload::DataUrl(body.image.unwrap_or_default()),
            prompt: body.prompt.unwrap_or_default(),
        }
    }
}

impl TransformRequest {
    pub fn validate(&self) -> Result<(), TransformError> {
        if self.image.is_empty() || self.prompt.is_empty() {
            return Err(TransformError::MissingInput);
        }
        Ok(())
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, TransformError> {
        let mut image = Bytes::new();
        let mut prompt = String::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| TransformError::MalformedBody(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => {
                    image = field
                        .bytes()
                        .await
                        .map_err(|e| TransformError::MalformedBody(e.to_string()))?;
                }
                "prompt" => {
                    prompt = field
                        .text()
                        .await
                        .map_err(|e| TransformError::MalformedBody(e.to_string()))?;
                }
                _ => {}
            }
        }

        Ok(TransformRequest {
            image: ImagePayload::Upload(image),
            prompt,
        })
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for TransformRequest
where
    S: Send + Sync,
{
    type Rejection = TransformError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(req.headers()) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| TransformError::MalformedBody(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        // Any non-multipart body is read as JSON, whatever its Content-Type says.
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| TransformError::MalformedBody(e.body_text()))?;
        let Json(body) = Json::<JsonTransformBody>::from_bytes(&bytes)
            .map_err(|e| TransformError::MalformedBody(e.body_text()))?;
        Ok(body.into())
    }
}

pub async fn sketch_to_image(
    State(state): State<AppState>,
    request: TransformRequest,
) -> Result<Json<ImageUrlResponse>, TransformError> {
    request.validate()?;

    let TransformRequest { image, prompt } = request;
    let image = image.decode()?;
    let input = GenerationInput::for_prompt(&prompt);

    tracing::info!(prompt = %prompt, image_bytes = image.len(), "transforming sketch");

    let outputs = state.generator.generate(image, &input).await?;
    let image_url = outputs.into_iter().next().ok_or(ProviderError::EmptyOutput)?;

    tracing::info!(image_url = %image_url, "sketch transformed");
    Ok(Json(ImageUrlResponse { image_url }))
}

pub async fn method_not_allowed() -> TransformError {
    TransformError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(decode_data_url("data:image/jpeg;base64,AAAA").unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn bare_base64_is_accepted() {
        assert_eq!(decode_data_url("aGk=").unwrap(), b"hi".to_vec());
    }

    #[test]
    fn invalid_base64_is_an_error() {
        assert!(decode_data_url("data:image/jpeg;base64,***").is_err());
    }

    #[test]
    fn upload_bytes_pass_through() {
        let payload = ImagePayload::Upload(Bytes::from_static(b"\x89PNG"));
        assert_eq!(payload.decode().unwrap(), b"\x89PNG".to_vec());
    }

    #[test]
    fn empty_fields_fail_validation() {
        let missing_image = TransformRequest {
            image: ImagePayload::DataUrl(String::new()),
            prompt: "dog".into(),
        };
        assert!(matches!(missing_image.validate(), Err(TransformError::MissingInput)));

        let missing_prompt = TransformRequest {
            image: ImagePayload::Upload(Bytes::from_static(b"x")),
            prompt: String::new(),
        };
        assert!(matches!(missing_prompt.validate(), Err(TransformError::MissingInput)));

        let ok = TransformRequest {
            image: ImagePayload::DataUrl("data:image/jpeg;base64,AAAA".into()),
            prompt: "dog".into(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn json_nulls_become_empty() {
        let body: JsonTransformBody = serde_json::from_str(r#"{"image": null}"#).unwrap();
        let request = TransformRequest::from(body);
        assert_eq!(request.image, ImagePayload::DataUrl(String::new()));
        assert_eq!(request.prompt, "");
    }

    #[test]
    fn multipart_detection_ignores_case_and_boundary() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("Multipart/Form-Data; boundary=xyz"),
        );
        assert!(is_multipart(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_multipart(&headers));
    }
}
