pub mod config;
mod error;
mod fonts;
pub mod images;
pub mod model;
pub mod package;
pub mod pdf;
pub mod report;
pub mod sections;
pub mod store;

pub use config::{PageGeometry, ReportConfig};
pub use error::Error;
pub use model::{AttachedImage, ContentBlock, CustomerProfile, MaintenanceOrder};
pub use package::PackagedReport;
pub use report::ReportGenerator;
pub use store::{RecordLoader, RecordStore};

use std::path::{Path, PathBuf};
use std::time::Instant;

use model::{CustomerId, OrderId};

/// Generate a report from `loader` and write it into `output_dir` under its
/// suggested filename. Returns the written path.
pub fn write_report<L: RecordLoader>(
    loader: &L,
    config: ReportConfig,
    order_id: OrderId,
    customer_id: Option<CustomerId>,
    output_dir: &Path,
) -> Result<PathBuf, Error> {
    let t0 = Instant::now();

    let report = ReportGenerator::new(loader, config).generate(order_id, customer_id)?;
    let t_generate = t0.elapsed();

    let output = output_dir.join(report.filename());
    let annotate = |e: std::io::Error, path: &Path| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
    };

    // Staged next to the output; only a complete report takes the final name.
    let mut staged = tempfile::Builder::new()
        .prefix(".sow-partial-")
        .tempfile_in(output_dir)
        .map_err(|e| annotate(e, output_dir))?;
    let bytes = report.stream_to(staged.as_file_mut())?;
    staged
        .persist(&output)
        .map_err(|e| annotate(e.error, &output))?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: generate={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_generate.as_secs_f64() * 1000.0,
        (t_total - t_generate).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes,
    );

    Ok(output)
}

/// [`write_report`] for a JSON record store on disk.
pub fn write_report_from_store(
    store_path: &Path,
    config: ReportConfig,
    order_id: OrderId,
    customer_id: Option<CustomerId>,
    output_dir: &Path,
) -> Result<PathBuf, Error> {
    let store = RecordStore::from_json_file(store_path)?;
    write_report(&store, config, order_id, customer_id, output_dir)
}
