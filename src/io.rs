use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageError, RgbaImage};

use crate::canvas::PixelSurface;

// ============================================================================
// EXPORT ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Encode(ImageError),
    /// The surface has no drawable rows to export.
    EmptyRegion,
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
            ExportError::Encode(e) => write!(f, "Encoding error: {}", e),
            ExportError::EmptyRegion => write!(f, "Nothing to export: drawable region is empty"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(e) => Some(e),
            ExportError::Encode(e) => Some(e),
            ExportError::EmptyRegion => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<ImageError> for ExportError {
    fn from(e: ImageError) -> Self {
        ExportError::Encode(e)
    }
}

// ============================================================================
// EXPORT
// ============================================================================

/// The drawable region (everything below the toolbar band) as its own image.
pub fn drawable_image(surface: &PixelSurface) -> Result<RgbaImage, ExportError> {
    let (rect, bytes) = surface.extract_region_rgba(surface.drawable_rect());
    if rect.is_empty() {
        return Err(ExportError::EmptyRegion);
    }
    RgbaImage::from_raw(rect.width, rect.height, bytes).ok_or(ExportError::EmptyRegion)
}

/// `drawing_<unix-seconds>.png`
pub fn export_file_name(unix_secs: u64) -> String {
    format!("drawing_{}.png", unix_secs)
}

/// Encode the drawable region as PNG at `path`.
pub fn export_png_to(surface: &PixelSurface, path: &Path) -> Result<(), ExportError> {
    let image = drawable_image(surface)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    writer.flush()?;
    log_info!("Export: wrote {}×{} to {}", image.width(), image.height(), path.display());
    Ok(())
}

/// Export into `dir` under a timestamped name, returning the written path.
pub fn export_png(surface: &PixelSurface, dir: &Path) -> Result<PathBuf, ExportError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(export_file_name(secs));
    export_png_to(surface, &path)?;
    Ok(path)
}
