use serde::Serialize;

/// Image bytes exactly as received, plus the header facts probed from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedImage {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

impl DecodedImage {
    pub fn dimensions_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn is_png(&self) -> bool {
        self.mime_type == "image/png"
    }
}

/// The comparison pair returned alongside the primary result.
///
/// Field order mirrors the wire order `[original, enhanced]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeforeAfter {
    pub original: DecodedImage,
    pub enhanced: DecodedImage,
}

impl BeforeAfter {
    pub fn as_pair(&self) -> [&DecodedImage; 2] {
        [&self.original, &self.enhanced]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancementResult {
    pub enhanced_image: DecodedImage,
    pub prompt_used: String,
    pub before_after: BeforeAfter,
}
