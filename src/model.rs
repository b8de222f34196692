use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OrderId = i64;
pub type CustomerId = i64;
pub type ImageId = i64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaintenanceOrder {
    pub id: OrderId,
    pub title: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub parts: Option<String>,
    #[serde(default)]
    pub tools: Option<String>,
    #[serde(default)]
    pub documents: Option<String>,
    #[serde(default)]
    pub service_instructions: Option<String>,
    pub charger_type_id: i64,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub checkin_contact: Option<String>,
    #[serde(default)]
    pub checkin_phone: Option<String>,
    #[serde(default)]
    pub checkin_instructions: Option<String>,
    #[serde(default)]
    pub checkout_contact: Option<String>,
    #[serde(default)]
    pub checkout_phone: Option<String>,
    #[serde(default)]
    pub checkout_instructions: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttachedImage {
    pub id: ImageId,
    pub order_id: OrderId,
    /// Relative paths resolve against the configured upload directory.
    pub storage_path: String,
    pub original_filename: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Decoded image ready for embedding. Pixels are 8-bit RGB, row-major.
#[derive(Clone)]
pub struct ReportImage {
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub display_width: f32,  // points
    pub display_height: f32, // points
    pub caption: String,
}

impl std::fmt::Debug for ReportImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportImage")
            .field("pixel_width", &self.pixel_width)
            .field("pixel_height", &self.pixel_height)
            .field("display_width", &self.display_width)
            .field("display_height", &self.display_height)
            .field("caption", &self.caption)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub enum ContentBlock {
    Header {
        generated_at: String,
        support_line: String,
    },
    Title(String),
    Heading(String),
    Body(String),
    ContactLine {
        label: &'static str,
        value: String,
    },
    Image(ReportImage),
    DocumentReference {
        filename: String,
        caption: String,
    },
    Placeholder {
        filename: String,
        notice: String,
    },
    PageBreak,
}

impl ContentBlock {
    /// Heading text, if this block is a heading.
    pub fn heading(&self) -> Option<&str> {
        match self {
            ContentBlock::Heading(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_page_break(&self) -> bool {
        matches!(self, ContentBlock::PageBreak)
    }
}
