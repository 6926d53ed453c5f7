use astro_contracts::diagnostics::{Diagnostic, DiagnosticSink, DiagnosticSource};
use astro_contracts::request::EnhancementRequest;
use astro_contracts::result::{BeforeAfter, DecodedImage, EnhancementResult};
use astro_contracts::session::{Session, SessionError, SessionSnapshot};
use chrono::Local;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::codec::decode_image_text;
use crate::images::probe_image;
use crate::transport::{truncate_text, MultipartPayload, ServiceTransport, TransportError};

pub const ENHANCE_PATH: &str = "/enhance_image";
pub const IMAGE_FIELD: &str = "image";
pub const UPLOAD_CONTENT_TYPE: &str = "image/png";

const MAX_FORMAT_DETAIL_CHARS: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("service returned status {status}: {body}")]
    Service { status: u16, body: String },
    #[error("unexpected response format: {0}")]
    ResponseFormat(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<TransportError> for EnhanceError {
    fn from(err: TransportError) -> Self {
        if err.timed_out {
            Self::Timeout(err.message)
        } else {
            Self::Transport(err.message)
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnhanceResponseBody {
    enhanced_image: String,
    prompt_used: String,
    before_after: Vec<String>,
}

/// Scalar form fields exactly as they go on the wire.
///
/// `custom_prompt` appears only when the request carries one.
pub fn form_fields(request: &EnhancementRequest) -> IndexMap<String, String> {
    let mut fields = IndexMap::new();
    fields.insert("model_name".to_string(), request.model_name().to_string());
    fields.insert("preset".to_string(), request.preset().to_string());
    fields.insert(
        "noise_level".to_string(),
        format_noise_level(request.noise_level()),
    );
    fields.insert(
        "scientific_mode".to_string(),
        request.scientific_mode().to_string(),
    );
    if let Some(prompt) = request.custom_prompt() {
        fields.insert("custom_prompt".to_string(), prompt.to_string());
    }
    fields
}

/// Decimal form that keeps a trailing `.0` on whole numbers (`20.0`).
pub fn format_noise_level(value: f64) -> String {
    format!("{value:?}")
}

pub fn multipart_payload(request: &EnhancementRequest) -> MultipartPayload {
    MultipartPayload {
        fields: form_fields(request),
        file_field: IMAGE_FIELD.to_string(),
        file_name: request.filename().to_string(),
        content_type: UPLOAD_CONTENT_TYPE.to_string(),
        file_bytes: request.image().to_vec(),
    }
}

/// Parses a 200 body into a fully populated result, or fails as a whole.
pub fn parse_enhance_response(body: &str) -> Result<EnhancementResult, EnhanceError> {
    let parsed: EnhanceResponseBody = serde_json::from_str(body).map_err(|err| {
        EnhanceError::ResponseFormat(format!(
            "{err} in {}",
            truncate_text(body, MAX_FORMAT_DETAIL_CHARS)
        ))
    })?;

    let [original_text, enhanced_text]: [String; 2] =
        parsed.before_after.try_into().map_err(|items: Vec<String>| {
            EnhanceError::ResponseFormat(format!(
                "before_after must hold exactly 2 images, got {}",
                items.len()
            ))
        })?;

    let enhanced_image = decode_image(&parsed.enhanced_image, "enhanced_image")?;
    let original = decode_image(&original_text, "before_after[0]")?;
    let enhanced = decode_image(&enhanced_text, "before_after[1]")?;

    Ok(EnhancementResult {
        enhanced_image,
        prompt_used: parsed.prompt_used,
        before_after: BeforeAfter { original, enhanced },
    })
}

fn decode_image(text: &str, field: &str) -> Result<DecodedImage, EnhanceError> {
    let bytes = decode_image_text(text)
        .map_err(|err| EnhanceError::ResponseFormat(format!("{field}: {err}")))?;
    probe_image(bytes).map_err(|err| EnhanceError::ResponseFormat(format!("{field}: {err}")))
}

pub struct EnhanceClient<'t> {
    transport: &'t dyn ServiceTransport,
}

impl<'t> EnhanceClient<'t> {
    pub fn new(transport: &'t dyn ServiceTransport) -> Self {
        Self { transport }
    }

    /// One synchronous POST; no retries.
    ///
    /// Every failure is reported to `sink` before it is returned.
    pub fn enhance(
        &self,
        request: &EnhancementRequest,
        sink: &dyn DiagnosticSink,
    ) -> Result<EnhancementResult, EnhanceError> {
        let payload = multipart_payload(request);
        let reply = match self.transport.post_multipart(ENHANCE_PATH, &payload) {
            Ok(reply) => reply,
            Err(err) => {
                report(sink, format!("Error connecting to API: {err}"));
                return Err(err.into());
            }
        };

        if !reply.is_success() {
            report(sink, format!("Error enhancing image: {}", reply.body));
            return Err(EnhanceError::Service {
                status: reply.status,
                body: reply.body,
            });
        }

        parse_enhance_response(&reply.body).map_err(|err| {
            report(sink, format!("Error enhancing image: {err}"));
            err
        })
    }

    /// Runs `enhance` under the session's submission guard.
    ///
    /// The session snapshot is replaced only on success.
    pub fn submit<'s>(
        &self,
        session: &'s mut Session,
        request: &EnhancementRequest,
        sink: &dyn DiagnosticSink,
    ) -> Result<&'s SessionSnapshot, EnhanceError> {
        let ticket = match session.begin_submission() {
            Ok(ticket) => ticket,
            Err(err) => {
                sink.report(&Diagnostic::new(DiagnosticSource::Session, err.to_string()));
                return Err(err.into());
            }
        };

        match self.enhance(request, sink) {
            Ok(result) => Ok(session.complete(ticket, result, Local::now())?),
            Err(err) => {
                session.abandon(ticket)?;
                Err(err)
            }
        }
    }
}

fn report(sink: &dyn DiagnosticSink, message: String) {
    sink.report(&Diagnostic::new(DiagnosticSource::Enhance, message));
}
