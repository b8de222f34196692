//! Resolves attached images into gallery blocks.
//!
//! Every input produces exactly one [`ImageOutcome`], in input order. Missing,
//! corrupt or unsupported files become placeholder blocks instead of errors.

use std::path::{Path, PathBuf};

use crate::model::{AttachedImage, ContentBlock, ImageId, ReportImage};

pub const UNAVAILABLE_NOTICE: &str = "Image unavailable";
pub const DECODE_FAILED_NOTICE: &str = "Image could not be decoded";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttachmentKind {
    Image,
    Document,
    Unsupported,
}

/// Classify an attachment by its file extension (case-insensitive).
pub fn classify(path: &Path) -> AttachmentKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png" | "jpg" | "jpeg" | "gif") => AttachmentKind::Image,
        Some("pdf") => AttachmentKind::Document,
        _ => AttachmentKind::Unsupported,
    }
}

/// Classify by the stored file's extension, falling back to the uploaded
/// name when storage drops the extension.
pub fn classify_attachment(stored: &Path, original_filename: &str) -> AttachmentKind {
    if stored.extension().is_some() {
        classify(stored)
    } else {
        classify(Path::new(original_filename))
    }
}

/// Scale `(width, height)` uniformly so it fits `area`.
///
/// Without `cap_at_native` the result always touches the area's limiting edge,
/// which enlarges images smaller than the area.
pub fn fit_to_area(intrinsic: (u32, u32), area: (f32, f32), cap_at_native: bool) -> (f32, f32) {
    let (w, h) = (intrinsic.0 as f32, intrinsic.1 as f32);
    let mut scale = (area.0 / w).min(area.1 / h);
    if cap_at_native {
        scale = scale.min(1.0);
    }
    (w * scale, h * scale)
}

#[derive(Debug)]
pub enum ImageOutcome {
    Rendered(ReportImage),
    Document { filename: String, caption: String },
    Unavailable { filename: String },
    DecodeFailed { filename: String, reason: String },
    Unsupported { filename: String },
}

impl ImageOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, ImageOutcome::Rendered(_))
    }

    pub fn into_block(self) -> ContentBlock {
        match self {
            ImageOutcome::Rendered(img) => ContentBlock::Image(img),
            ImageOutcome::Document { filename, caption } => {
                ContentBlock::DocumentReference { filename, caption }
            }
            ImageOutcome::Unavailable { filename } | ImageOutcome::Unsupported { filename } => {
                ContentBlock::Placeholder {
                    filename,
                    notice: UNAVAILABLE_NOTICE.to_string(),
                }
            }
            ImageOutcome::DecodeFailed { filename, .. } => ContentBlock::Placeholder {
                filename,
                notice: DECODE_FAILED_NOTICE.to_string(),
            },
        }
    }
}

pub struct ImageNormalizer {
    upload_dir: PathBuf,
    usable_area: (f32, f32),
    cap_at_native: bool,
}

impl ImageNormalizer {
    pub fn new(upload_dir: impl Into<PathBuf>, usable_area: (f32, f32), cap_at_native: bool) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            usable_area,
            cap_at_native,
        }
    }

    pub fn resolve_path(&self, storage_path: &str) -> PathBuf {
        let path = Path::new(storage_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.upload_dir.join(path)
        }
    }

    pub fn normalize(&self, images: &[AttachedImage]) -> Vec<ImageOutcome> {
        let t0 = std::time::Instant::now();
        let outcomes: Vec<ImageOutcome> = images.iter().map(|img| self.normalize_one(img)).collect();
        let rendered = outcomes.iter().filter(|o| o.is_rendered()).count();
        log::debug!(
            "Normalized {} attachments ({} rendered) in {:.1}ms",
            outcomes.len(),
            rendered,
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        outcomes
    }

    fn normalize_one(&self, attached: &AttachedImage) -> ImageOutcome {
        let filename = attached.original_filename.clone();
        let path = self.resolve_path(&attached.storage_path);

        if !path.is_file() {
            log::warn!(
                "Attachment {} ({filename}) not found at {}",
                attached.id,
                path.display()
            );
            return ImageOutcome::Unavailable { filename };
        }

        let caption = caption_for(attached);
        match classify_attachment(&path, &attached.original_filename) {
            AttachmentKind::Document => ImageOutcome::Document { filename, caption },
            AttachmentKind::Unsupported => {
                log::warn!(
                    "Attachment {} ({filename}) has an unsupported file type",
                    attached.id
                );
                ImageOutcome::Unsupported { filename }
            }
            AttachmentKind::Image => match self.decode(&path, caption) {
                Ok(img) => ImageOutcome::Rendered(img),
                Err(reason) => {
                    log_decode_failure(attached.id, &filename, &reason);
                    ImageOutcome::DecodeFailed { filename, reason }
                }
            },
        }
    }

    fn decode(&self, path: &Path, caption: String) -> Result<ReportImage, String> {
        let decoded = image::ImageReader::open(path)
            .map_err(|e| e.to_string())?
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .decode()
            .map_err(|e| e.to_string())?;

        let rgba = decoded.to_rgba8();
        let (w, h) = (rgba.width(), rgba.height());
        if w == 0 || h == 0 {
            return Err(format!("image has no pixels ({w}x{h})"));
        }

        let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
        let rgb: Vec<u8> = rgba
            .pixels()
            .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
            .collect();
        let alpha = has_alpha.then(|| rgba.pixels().map(|p| p.0[3]).collect());

        let (display_width, display_height) = fit_to_area((w, h), self.usable_area, self.cap_at_native);

        Ok(ReportImage {
            rgb,
            alpha,
            pixel_width: w,
            pixel_height: h,
            display_width,
            display_height,
            caption,
        })
    }
}

fn caption_for(attached: &AttachedImage) -> String {
    attached
        .caption
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&attached.original_filename)
        .to_string()
}

fn log_decode_failure(id: ImageId, filename: &str, reason: &str) {
    log::warn!("Attachment {id} ({filename}) failed to decode: {reason}");
}
