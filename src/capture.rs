// Capture client: freeze a frame from a camera-like source, pair it with a
// prompt and submit it to the transform endpoint.
//
// The camera and the network sit behind `FrameSource` and
// `TransformTransport` so the submission flow runs without either.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageOutputFormat};
use thiserror::Error;

use crate::transform::{ImageUrlResponse, JsonTransformBody, TRANSFORM_PATH};

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;
const JPEG_QUALITY: u8 = 92;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("camera has not been started")]
    NotStarted,

    #[error("frame encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(u16),
}

/// A video device, or anything standing in for one.
pub trait FrameSource: Send {
    /// Acquire the device. Called once per `start_camera`.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Grab the current frame.
    fn acquire_frame(&mut self) -> Result<DynamicImage, CaptureError>;
}

#[async_trait]
pub trait TransformTransport: Send + Sync {
    /// Submit a data-URL frame and prompt, returning the generated image URL.
    async fn submit(&self, image: &str, prompt: &str) -> Result<String, TransportError>;
}

/// Scale a frame onto the fixed capture surface and encode it as a JPEG data URL.
pub fn encode_frame(frame: &DynamicImage) -> Result<String, CaptureError> {
    let scaled = frame.resize_exact(FRAME_WIDTH, FRAME_HEIGHT, FilterType::Triangle);
    let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());

    let mut jpeg_bytes = Vec::new();
    rgb.write_to(
        &mut Cursor::new(&mut jpeg_bytes),
        ImageOutputFormat::Jpeg(JPEG_QUALITY),
    )?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(&jpeg_bytes)
    ))
}

/// What the capture screen shows at a given moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureView<'a> {
    pub captured_image: Option<&'a str>,
    pub prompt: &'a str,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
    pub result_image: Option<&'a str>,
}

pub struct CaptureClient<F, T> {
    source: F,
    transport: T,
    camera_live: bool,
    captured_image: Option<String>,
    prompt: String,
    result_image: Option<String>,
    loading: bool,
}

impl<F, T> CaptureClient<F, T>
where
    F: FrameSource,
    T: TransformTransport,
{
    pub fn new(source: F, transport: T) -> Self {
        Self {
            source,
            transport,
            camera_live: false,
            captured_image: None,
            prompt: String::new(),
            result_image: None,
            loading: false,
        }
    }

    pub fn start_camera(&mut self) {
        match self.source.start() {
            Ok(()) => self.camera_live = true,
            Err(e) => tracing::error!(error = %e, "error accessing camera"),
        }
    }

    /// Freeze the current frame as the pending capture, replacing any earlier one.
    pub fn capture_image(&mut self) {
        if !self.camera_live {
            tracing::debug!("capture requested before camera start");
            return;
        }

        match self.source.acquire_frame().and_then(|frame| encode_frame(&frame)) {
            Ok(data_url) => self.captured_image = Some(data_url),
            Err(e) => tracing::error!(error = %e, "error capturing frame"),
        }
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub async fn send_image(&mut self) {
        let Some(image) = self.captured_image.as_deref() else {
            return;
        };
        if self.prompt.is_empty() || self.loading {
            return;
        }

        self.loading = true;
        match self.transport.submit(image, &self.prompt).await {
            Ok(url) => self.result_image = Some(url),
            Err(e) => {
                tracing::error!(error = %e, "error sending image");
                self.result_image = None;
            }
        }
        self.loading = false;
    }

    pub fn captured_image(&self) -> Option<&str> {
        self.captured_image.as_deref()
    }

    pub fn result_image(&self) -> Option<&str> {
        self.result_image.as_deref()
    }

    pub fn is_camera_live(&self) -> bool {
        self.camera_live
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn view(&self) -> CaptureView<'_> {
        CaptureView {
            captured_image: self.captured_image.as_deref(),
            prompt: &self.prompt,
            submit_enabled: !self.loading,
            submit_label: if self.loading { "Processing..." } else { "Send to API" },
            result_image: self.result_image.as_deref(),
        }
    }
}

/// Posts the JSON encoding to a running server.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(server: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}{}", server.trim_end_matches('/'), TRANSFORM_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TransformTransport for HttpTransport {
    async fn submit(&self, image: &str, prompt: &str) -> Result<String, TransportError> {
        let body = JsonTransformBody {
            image: Some(image.to_string()),
            prompt: Some(prompt.to_string()),
        };

        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let data: ImageUrlResponse = response.json().await?;
        Ok(data.image_url)
    }
}

/// Uses a still image on disk as the camera. Starting the "camera" loads the file.
pub struct StillFrameSource {
    path: PathBuf,
    frame: Option<DynamicImage>,
}

impl StillFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }
}

impl FrameSource for StillFrameSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        let frame = image::open(&self.path)
            .map_err(|e| CaptureError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        self.frame = Some(frame);
        Ok(())
    }

    fn acquire_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        self.frame.clone().ok_or(CaptureError::NotStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    struct FakeCamera {
        denied: bool,
        grabs: usize,
    }

    impl FakeCamera {
        fn working() -> Self {
            Self { denied: false, grabs: 0 }
        }

        fn denied() -> Self {
            Self { denied: true, grabs: 0 }
        }
    }

    impl FrameSource for FakeCamera {
        fn start(&mut self) -> Result<(), CaptureError> {
            if self.denied {
                return Err(CaptureError::Unavailable("permission denied".into()));
            }
            Ok(())
        }

        fn acquire_frame(&mut self) -> Result<DynamicImage, CaptureError> {
            self.grabs += 1;
            let shade = (self.grabs * 40) as u8;
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                320,
                240,
                Rgba([shade, shade, shade, 255]),
            )))
        }
    }

    #[derive(Clone)]
    struct FakeTransport {
        reply: Result<String, u16>,
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeTransport {
        fn replying(reply: Result<&str, u16>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TransformTransport for FakeTransport {
        async fn submit(&self, image: &str, prompt: &str) -> Result<String, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((image.to_string(), prompt.to_string()));
            self.reply.clone().map_err(TransportError::Status)
        }
    }

    #[test]
    fn encoded_frame_is_640_by_480_jpeg() {
        let frame = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 50, Rgba([10, 20, 30, 255])));
        let data_url = encode_frame(&frame).unwrap();
        let encoded = data_url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let bytes = general_purpose::STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));
    }

    #[test]
    fn denied_camera_leaves_state_unchanged() {
        let mut client = CaptureClient::new(FakeCamera::denied(), FakeTransport::replying(Ok("x")));
        client.start_camera();
        assert!(!client.is_camera_live());

        client.capture_image();
        assert_eq!(client.captured_image(), None);
    }

    #[test]
    fn repeated_capture_overwrites() {
        let mut client = CaptureClient::new(FakeCamera::working(), FakeTransport::replying(Ok("x")));
        client.start_camera();
        client.capture_image();
        let first = client.captured_image().unwrap().to_string();
        client.capture_image();
        let second = client.captured_image().unwrap().to_string();
        assert_ne!(first, second);
        assert!(second.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn send_without_capture_or_prompt_is_a_noop() {
        let transport = FakeTransport::replying(Ok("https://example.com/out.png"));
        let mut client = CaptureClient::new(FakeCamera::working(), transport.clone());
        client.set_prompt("dog");
        client.send_image().await;
        assert_eq!(transport.call_count(), 0);

        client.start_camera();
        client.capture_image();
        client.set_prompt("");
        client.send_image().await;
        assert_eq!(transport.call_count(), 0);
        assert_eq!(client.result_image(), None);
    }

    #[tokio::test]
    async fn successful_send_shows_result() {
        let transport = FakeTransport::replying(Ok("https://example.com/out.png"));
        let mut client = CaptureClient::new(FakeCamera::working(), transport.clone());
        client.start_camera();
        client.capture_image();
        client.set_prompt("dog");
        client.send_image().await;

        assert_eq!(transport.call_count(), 1);
        let (image, prompt) = transport.calls.lock().unwrap()[0].clone();
        assert_eq!(Some(image.as_str()), client.captured_image());
        assert_eq!(prompt, "dog");

        let view = client.view();
        assert_eq!(view.result_image, Some("https://example.com/out.png"));
        assert!(view.submit_enabled);
        assert_eq!(view.submit_label, "Send to API");
        assert!(!client.is_loading());
    }

    #[tokio::test]
    async fn failed_send_clears_previous_result() {
        let good = FakeTransport::replying(Ok("https://example.com/first.png"));
        let mut client = CaptureClient::new(FakeCamera::working(), good);
        client.start_camera();
        client.capture_image();
        client.set_prompt("dog");
        client.send_image().await;
        assert!(client.result_image().is_some());

        let mut client = CaptureClient {
            transport: FakeTransport::replying(Err(500)),
            ..client
        };
        client.send_image().await;
        assert_eq!(client.result_image(), None);
        assert!(!client.is_loading());
        assert!(client.view().submit_enabled);
    }

    #[test]
    fn still_source_reports_missing_file() {
        let mut source = StillFrameSource::new("/nonexistent/frame.png");
        assert!(matches!(source.start(), Err(CaptureError::Unavailable(_))));
        assert!(matches!(source.acquire_frame(), Err(CaptureError::NotStarted)));
    }

    struct FixedGenerator;

    #[async_trait]
    impl crate::provider::ImageGenerator for FixedGenerator {
        async fn generate(
            &self,
            _image: Vec<u8>,
            _input: &crate::generation::GenerationInput,
        ) -> Result<Vec<String>, crate::provider::ProviderError> {
            Ok(vec!["https://example.com/out.png".to_string()])
        }
    }

    async fn serve_router() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = crate::app::router(crate::app::AppState::new(Arc::new(FixedGenerator)));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    #[tokio::test]
    async fn transport_returns_generated_url() {
        let transport = HttpTransport::new(&serve_router().await);
        let url = transport
            .submit("data:image/jpeg;base64,AAAA", "dog")
            .await
            .unwrap();
        assert_eq!(url, "https://example.com/out.png");
    }

    #[tokio::test]
    async fn transport_maps_rejection_to_status() {
        let transport = HttpTransport::new(&serve_router().await);
        let err = transport.submit("", "dog").await.unwrap_err();
        assert!(matches!(err, TransportError::Status(400)));
        assert_eq!(err.to_string(), "HTTP error! status: 400");
    }

    #[tokio::test]
    async fn client_clears_result_after_server_rejection() {
        let base = serve_router().await;
        let mut client = CaptureClient::new(FakeCamera::working(), HttpTransport::new(&base));
        client.start_camera();
        client.capture_image();
        client.set_prompt("dog");
        client.send_image().await;
        assert_eq!(client.result_image(), Some("https://example.com/out.png"));

        let mut client = CaptureClient {
            transport: HttpTransport::new(&format!("{}/missing", base)),
            ..client
        };
        client.send_image().await;
        assert_eq!(client.result_image(), None);
        assert!(!client.is_loading());
    }

    #[test]
    fn transport_targets_transform_route() {
        let transport = HttpTransport::new("http://localhost:3000/");
        assert_eq!(transport.endpoint(), "http://localhost:3000/api/sketchToImage");
    }
}
