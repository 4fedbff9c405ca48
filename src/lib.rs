// Sketch to Image: capture a camera frame, send it with a prompt to a hosted
// image model, get back a generated image URL.

pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod generation;
pub mod page;
pub mod provider;
pub mod transform;

pub use app::{router, AppState};
pub use config::{Config, ConfigError, ProviderConfig};
pub use error::TransformError;
pub use generation::GenerationInput;
pub use provider::{ImageGenerator, ProviderError, ReplicateClient};
