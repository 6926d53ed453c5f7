use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use astro_contracts::result::DecodedImage;
use astro_contracts::session::SessionSnapshot;
use image::{ImageFormat, ImageReader};

pub const BEFORE_FILE_NAME: &str = "before.png";
pub const AFTER_FILE_NAME: &str = "after.png";

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("bytes are not a recognized image format")]
    UnknownFormat,
    #[error("failed reading image header: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed reading image header: {0}")]
    Image(#[from] image::ImageError),
}

/// Wraps raw image bytes after checking they carry a readable image header.
pub fn probe_image(bytes: Vec<u8>) -> Result<DecodedImage, ProbeError> {
    let reader = ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?;
    let format = reader.format().ok_or(ProbeError::UnknownFormat)?;
    let (width, height) = reader.into_dimensions()?;
    Ok(DecodedImage {
        width,
        height,
        mime_type: format.to_mime_type().to_string(),
        bytes,
    })
}

/// PNG bytes for download. PNG input is returned untouched.
pub fn png_bytes(image: &DecodedImage) -> Result<Vec<u8>> {
    if image.is_png() {
        return Ok(image.bytes.clone());
    }
    let decoded = image::load_from_memory(&image.bytes)
        .with_context(|| format!("failed decoding {} image", image.mime_type))?;
    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageFormat::Png)
        .context("failed encoding PNG download")?;
    Ok(out.into_inner())
}

/// Writes the enhanced image under its timestamped download name.
pub fn write_download(dir: &Path, snapshot: &SessionSnapshot) -> Result<PathBuf> {
    let path = dir.join(snapshot.download_file_name());
    write_png(&path, &snapshot.result.enhanced_image)?;
    Ok(path)
}

/// Writes the comparison pair as `before.png` and `after.png`.
pub fn write_comparison(dir: &Path, snapshot: &SessionSnapshot) -> Result<(PathBuf, PathBuf)> {
    let pair = &snapshot.result.before_after;
    let before = dir.join(BEFORE_FILE_NAME);
    let after = dir.join(AFTER_FILE_NAME);
    write_png(&before, &pair.original)?;
    write_png(&after, &pair.enhanced)?;
    Ok((before, after))
}

fn write_png(path: &Path, image: &DecodedImage) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, png_bytes(image)?)
        .with_context(|| format!("failed to write {}", path.display()))
}
