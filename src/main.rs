use std::path::PathBuf;
use std::process;

use clap::Parser;
use sow_report::ReportConfig;

#[derive(Parser)]
#[command(name = "sow-report", about = "Render a maintenance order report to PDF", version)]
struct Cli {
    /// JSON export with orders, customers and images
    #[arg(long)]
    store: PathBuf,

    /// Maintenance order to render
    #[arg(long)]
    order: i64,

    /// Customer whose contact details are included (defaults to the order's customer)
    #[arg(long)]
    customer: Option<i64>,

    /// TOML report configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the finished report is written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ReportConfig::from_toml_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(2);
            }
        },
        None => ReportConfig::default(),
    };

    match sow_report::write_report_from_store(
        &cli.store,
        config,
        cli.order,
        cli.customer,
        &cli.output_dir,
    ) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
