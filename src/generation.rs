// Fixed generation parameters sent to the image model

use serde::Serialize;

pub const OUTPUT_WIDTH: u32 = 768;
pub const OUTPUT_HEIGHT: u32 = 768;
pub const NEGATIVE_PROMPT: &str = "oversized, full-canvas, distorted proportions, cartoon";

/// Frame the caller's subject as a request for a lifelike rendering of the sketch.
pub fn realistic_prompt(subject: &str) -> String {
    format!(
        "A realistic {} matching the size and proportions of the original sketch. Maintain lifelike textures and subtle fur details.",
        subject
    )
}

/// Sampler used for every prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scheduler {
    #[serde(rename = "DDIM")]
    Ddim,
}

/// Model input, minus the image itself. The provider attaches the image in
/// whatever encoding its API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationInput {
    pub width: u32,
    pub height: u32,
    pub prompt: String,
    pub negative_prompt: String,
    pub scheduler: Scheduler,
    pub num_outputs: u32,
    pub guidance_scale: f64,
    pub apply_watermark: bool,
    pub prompt_strength: f64,
    pub num_inference_steps: u32,
    pub adapter_conditioning_scale: f64,
}

impl GenerationInput {
    pub fn for_prompt(subject: &str) -> Self {
        Self {
            width: OUTPUT_WIDTH,
            height: OUTPUT_HEIGHT,
            prompt: realistic_prompt(subject),
            negative_prompt: NEGATIVE_PROMPT.to_string(),
            scheduler: Scheduler::Ddim,
            num_outputs: 1,
            guidance_scale: 7.5,
            apply_watermark: false,
            prompt_strength: 0.6,
            num_inference_steps: 70,
            adapter_conditioning_scale: 0.8,
        }
    }
}
