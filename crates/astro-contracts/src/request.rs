use serde::Serialize;

pub const NOISE_LEVEL_MIN: f64 = 0.0;
pub const NOISE_LEVEL_MAX: f64 = 50.0;
pub const DEFAULT_NOISE_LEVEL: f64 = 20.0;
pub const DEFAULT_UPLOAD_FILENAME: &str = "image.png";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("image is empty")]
    EmptyImage,
    #[error("model name is required")]
    MissingModel,
    #[error("preset is required")]
    MissingPreset,
    #[error("noise level {0} is outside [0, 50]")]
    NoiseLevelOutOfRange(f64),
}

/// Raw user inputs, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementInputs {
    pub image: Vec<u8>,
    pub filename: String,
    pub model_name: String,
    pub preset: String,
    pub custom_prompt: Option<String>,
    pub noise_level: f64,
    pub scientific_mode: bool,
}

/// A validated enhancement submission.
///
/// The image is non-empty, the noise level is finite and within bounds, and a
/// present custom prompt is never the empty string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancementRequest {
    #[serde(skip)]
    image: Vec<u8>,
    filename: String,
    model_name: String,
    preset: String,
    custom_prompt: Option<String>,
    noise_level: f64,
    scientific_mode: bool,
}

impl EnhancementRequest {
    pub fn new(inputs: EnhancementInputs) -> Result<Self, RequestError> {
        if inputs.image.is_empty() {
            return Err(RequestError::EmptyImage);
        }
        if inputs.model_name.trim().is_empty() {
            return Err(RequestError::MissingModel);
        }
        if inputs.preset.trim().is_empty() {
            return Err(RequestError::MissingPreset);
        }
        if !inputs.noise_level.is_finite()
            || !(NOISE_LEVEL_MIN..=NOISE_LEVEL_MAX).contains(&inputs.noise_level)
        {
            return Err(RequestError::NoiseLevelOutOfRange(inputs.noise_level));
        }

        let filename = if inputs.filename.trim().is_empty() {
            DEFAULT_UPLOAD_FILENAME.to_string()
        } else {
            inputs.filename
        };

        Ok(Self {
            image: inputs.image,
            filename,
            model_name: inputs.model_name,
            preset: inputs.preset,
            custom_prompt: normalize_custom_prompt(inputs.custom_prompt),
            noise_level: inputs.noise_level,
            scientific_mode: inputs.scientific_mode,
        })
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    pub fn custom_prompt(&self) -> Option<&str> {
        self.custom_prompt.as_deref()
    }

    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }

    pub fn scientific_mode(&self) -> bool {
        self.scientific_mode
    }
}

/// The empty string means "no custom prompt".
pub fn normalize_custom_prompt(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}
