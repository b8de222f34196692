use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

/// 1 inch.
pub const DEFAULT_MARGIN: f32 = 72.0;
/// US Letter.
pub const LETTER: (f32, f32) = (612.0, 792.0);

pub const DEFAULT_SUPPORT_LINE: &str = "Questions about this work order? Contact field service support.";

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: LETTER.0,
            page_height: LETTER.1,
            margin: DEFAULT_MARGIN,
        }
    }
}

impl PageGeometry {
    /// Content box available to blocks: page size minus a margin on each side.
    pub fn usable_area(&self) -> (f32, f32) {
        (
            self.page_width - 2.0 * self.margin,
            self.page_height - 2.0 * self.margin,
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub page: PageGeometry,
    pub upload_dir: PathBuf,
    /// Where transient render files live. `None` means the OS temp dir.
    pub transient_dir: Option<PathBuf>,
    pub support_line: String,
    /// Never scale an image above its native size.
    pub cap_image_scale: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page: PageGeometry::default(),
            upload_dir: PathBuf::from("uploads"),
            transient_dir: None,
            support_line: DEFAULT_SUPPORT_LINE.to_string(),
            cap_image_scale: false,
        }
    }
}

impl ReportConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: ReportConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let (w, h) = self.page.usable_area();
        if !(w > 0.0 && h > 0.0) || self.page.margin < 0.0 {
            return Err(Error::Config(format!(
                "page {}x{} with margin {} leaves no usable area",
                self.page.page_width, self.page.page_height, self.page.margin
            )));
        }
        Ok(())
    }

    pub fn transient_dir(&self) -> PathBuf {
        self.transient_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_usable_area_is_two_inches_smaller() {
        let page = PageGeometry::default();
        assert_eq!(page.usable_area(), (468.0, 648.0));
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ReportConfig::from_toml_str("").unwrap();
        assert_eq!(config.page, PageGeometry::default());
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert!(!config.cap_image_scale);
        assert_eq!(config.support_line, DEFAULT_SUPPORT_LINE);
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = ReportConfig::from_toml_str(
            r#"
            upload_dir = "/srv/sow/uploads"
            cap_image_scale = true

            [page]
            page_width = 595.0
            page_height = 842.0
            "#,
        )
        .unwrap();
        assert_eq!(config.upload_dir, PathBuf::from("/srv/sow/uploads"));
        assert!(config.cap_image_scale);
        assert_eq!(config.page.margin, DEFAULT_MARGIN);
        assert_eq!(config.page.usable_area(), (451.0, 698.0));
    }

    #[test]
    fn margins_larger_than_page_are_rejected() {
        let err = ReportConfig::from_toml_str("[page]\nmargin = 400.0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = ReportConfig::from_toml_str("upload_dir = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
