use std::io::Cursor;

use astro_contracts::catalog::{BUILTIN_MODELS, BUILTIN_PRESETS};
use image::imageops::FilterType;
use image::ImageFormat;
use serde_json::json;

use crate::catalog_client::{MODELS_PATH, PRESETS_PATH};
use crate::codec::{data_url, encode_image_bytes};
use crate::enhance_client::ENHANCE_PATH;
use crate::transport::{MultipartPayload, ServiceReply, ServiceTransport, TransportError};

const DRYRUN_SCALE: u32 = 2;
const DRYRUN_MAX_EDGE: u32 = 4096;

/// In-process stand-in for the enhancement service.
///
/// Serves the built-in catalog and answers enhancement requests with a 2x
/// Lanczos upscale of the uploaded image.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryrunTransport;

impl DryrunTransport {
    pub fn new() -> Self {
        Self
    }

    fn enhance(&self, payload: &MultipartPayload) -> ServiceReply {
        let (Some(model_name), Some(preset)) = (
            payload.fields.get("model_name"),
            payload.fields.get("preset"),
        ) else {
            return detail_reply(422, "model_name and preset are required");
        };

        let source = match image::load_from_memory(&payload.file_bytes) {
            Ok(source) => source,
            Err(err) => return detail_reply(400, &format!("Invalid image: {err}")),
        };
        let (width, height) = scaled_dimensions(source.width(), source.height());
        let upscaled = source.resize_exact(width, height, FilterType::Lanczos3);

        let mut enhanced = Cursor::new(Vec::new());
        if let Err(err) = upscaled.write_to(&mut enhanced, ImageFormat::Png) {
            return detail_reply(500, &format!("Encoding failed: {err}"));
        }
        let enhanced = enhanced.into_inner();

        let mut prompt = format!("{preset} enhancement with {model_name}");
        if let Some(custom) = payload.fields.get("custom_prompt") {
            prompt.push_str(&format!(", {custom}"));
        }
        if payload.fields.get("scientific_mode").map(String::as_str) == Some("true") {
            prompt.push_str(", preserve scientific accuracy, no added structures");
        }
        if let Some(noise) = payload.fields.get("noise_level") {
            prompt.push_str(&format!(" (noise level {noise})"));
        }

        let body = json!({
            "enhanced_image": data_url("image/png", &enhanced),
            "prompt_used": prompt,
            "before_after": [
                encode_image_bytes(&payload.file_bytes),
                data_url("image/png", &enhanced),
            ],
        });
        ServiceReply::new(200, body.to_string())
    }
}

impl ServiceTransport for DryrunTransport {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn get(&self, path: &str) -> Result<ServiceReply, TransportError> {
        let reply = match path {
            MODELS_PATH => ServiceReply::new(200, json!(BUILTIN_MODELS).to_string()),
            PRESETS_PATH => ServiceReply::new(200, json!(BUILTIN_PRESETS).to_string()),
            _ => detail_reply(404, "Not Found"),
        };
        Ok(reply)
    }

    fn post_multipart(
        &self,
        path: &str,
        payload: &MultipartPayload,
    ) -> Result<ServiceReply, TransportError> {
        if path != ENHANCE_PATH {
            return Ok(detail_reply(404, "Not Found"));
        }
        Ok(self.enhance(payload))
    }
}

/// Output size for the dryrun upscale. One factor applies to both axes so the
/// aspect ratio survives the `DRYRUN_MAX_EDGE` cap.
fn scaled_dimensions(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height).max(1) as f64;
    let factor = (DRYRUN_SCALE as f64).min(DRYRUN_MAX_EDGE as f64 / longest);
    let scale = |edge: u32| ((edge as f64 * factor).round() as u32).clamp(1, DRYRUN_MAX_EDGE);
    (scale(width), scale(height))
}

fn detail_reply(status: u16, detail: &str) -> ServiceReply {
    ServiceReply::new(status, json!({ "detail": detail }).to_string())
}
