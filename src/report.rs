use chrono::{DateTime, Local};

use crate::config::ReportConfig;
use crate::error::Error;
use crate::images::{ImageNormalizer, ImageOutcome};
use crate::model::{ContentBlock, CustomerId, CustomerProfile, OrderId};
use crate::package::{OutputPackager, PackagedReport};
use crate::pdf::{self, DocumentMeta};
use crate::sections::SectionBuilder;
use crate::store::RecordLoader;

pub const GALLERY_HEADING: &str = "REFERENCE IMAGES";

/// Final block order: text sections as built, then the gallery behind its own
/// page break and heading. An empty gallery adds nothing.
pub fn assemble_blocks(sections: Vec<ContentBlock>, gallery: Vec<ImageOutcome>) -> Vec<ContentBlock> {
    let mut blocks = sections;
    if gallery.is_empty() {
        return blocks;
    }
    blocks.reserve(gallery.len() + 2);
    blocks.push(ContentBlock::PageBreak);
    blocks.push(ContentBlock::Heading(GALLERY_HEADING.to_string()));
    blocks.extend(gallery.into_iter().map(ImageOutcome::into_block));
    blocks
}

pub struct ReportGenerator<'a, L: RecordLoader> {
    loader: &'a L,
    config: ReportConfig,
}

impl<'a, L: RecordLoader> ReportGenerator<'a, L> {
    pub fn new(loader: &'a L, config: ReportConfig) -> Self {
        Self { loader, config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Generate the report for `order_id`. `customer_id` overrides the
    /// order's own customer reference when given.
    pub fn generate(
        &self,
        order_id: OrderId,
        customer_id: Option<CustomerId>,
    ) -> Result<PackagedReport, Error> {
        self.generate_at(order_id, customer_id, Local::now())
    }

    pub fn generate_at(
        &self,
        order_id: OrderId,
        customer_id: Option<CustomerId>,
        now: DateTime<Local>,
    ) -> Result<PackagedReport, Error> {
        let t0 = std::time::Instant::now();

        let order = self
            .loader
            .get_order(order_id)
            .ok_or(Error::OrderNotFound(order_id))?;
        let customer = self.resolve_customer(customer_id.or(order.customer_id));
        let images = self.loader.list_images(order_id);

        let sections =
            SectionBuilder::new(&self.config.support_line).build(&order, customer.as_ref(), now);
        let normalizer = ImageNormalizer::new(
            &self.config.upload_dir,
            self.config.page.usable_area(),
            self.config.cap_image_scale,
        );
        let gallery = normalizer.normalize(&images);
        let blocks = assemble_blocks(sections, gallery);
        let t_blocks = t0.elapsed();

        let packager = OutputPackager::new(self.config.transient_dir());
        let meta = DocumentMeta {
            title: &order.title,
            created: now,
        };
        let report = packager.package(&order.title, || {
            pdf::render(&blocks, &self.config.page, &meta)
        })?;

        log::info!(
            "Generated {} for order {order_id}: {} blocks, {} bytes (blocks={:.1}ms, total={:.1}ms)",
            report.filename(),
            blocks.len(),
            report.len(),
            t_blocks.as_secs_f64() * 1000.0,
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(report)
    }

    fn resolve_customer(&self, customer_id: Option<CustomerId>) -> Option<CustomerProfile> {
        let id = customer_id?;
        let customer = self.loader.get_customer(id);
        if customer.is_none() {
            log::warn!("Customer {id} not found; customer section omitted");
        }
        customer
    }
}
