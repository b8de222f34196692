#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use sow_report::model::{AttachedImage, CustomerProfile, MaintenanceOrder};
use sow_report::{RecordStore, ReportConfig};
use tempfile::TempDir;

/// Scratch area for one test: `uploads/` for attachments, `transient/` for
/// render files, `out/` for written reports.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        for sub in ["uploads", "transient", "out"] {
            std::fs::create_dir_all(dir.path().join(sub)).expect("create subdir");
        }
        Self { dir }
    }

    pub fn uploads(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn transient(&self) -> PathBuf {
        self.dir.path().join("transient")
    }

    pub fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn config(&self) -> ReportConfig {
        ReportConfig {
            upload_dir: self.uploads(),
            transient_dir: Some(self.transient()),
            ..ReportConfig::default()
        }
    }

    pub fn write_png(&self, name: &str, w: u32, h: u32) {
        image::RgbImage::from_pixel(w, h, image::Rgb([40, 90, 160]))
            .save(self.uploads().join(name))
            .expect("write png");
    }

    pub fn write_raw(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.uploads().join(name), bytes).expect("write file");
    }

    pub fn transient_entries(&self) -> usize {
        entries(&self.transient())
    }
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 2, 9, minute, 0).unwrap()
}

pub fn order(id: i64, title: &str) -> MaintenanceOrder {
    MaintenanceOrder {
        id,
        title: title.to_string(),
        scope: None,
        parts: None,
        tools: None,
        documents: None,
        service_instructions: None,
        charger_type_id: 1,
        customer_id: None,
        created_at: at(0),
        updated_at: at(0),
    }
}

pub fn customer(id: i64, name: &str) -> CustomerProfile {
    CustomerProfile {
        id,
        name: name.to_string(),
        checkin_contact: Some("Front desk".into()),
        checkin_phone: Some("555-0100".into()),
        checkin_instructions: None,
        checkout_contact: None,
        checkout_phone: None,
        checkout_instructions: Some("Return badge at gate".into()),
    }
}

pub fn image(id: i64, order_id: i64, file: &str, minute: u32) -> AttachedImage {
    AttachedImage {
        id,
        order_id,
        storage_path: file.to_string(),
        original_filename: file.to_string(),
        caption: None,
        uploaded_at: at(minute),
    }
}

pub fn store_with(order: MaintenanceOrder, images: Vec<AttachedImage>) -> RecordStore {
    let mut store = RecordStore::new();
    store.insert_order(order);
    for img in images {
        store.attach_image(img).expect("attach image");
    }
    store
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

pub fn page_count(pdf: &[u8]) -> usize {
    count(pdf, b"/Type /Page") - count(pdf, b"/Type /Pages")
}

pub fn image_xobject_count(pdf: &[u8]) -> usize {
    count(pdf, b"/Subtype /Image")
}

pub fn contains(pdf: &[u8], needle: &str) -> bool {
    count(pdf, needle.as_bytes()) > 0
}
