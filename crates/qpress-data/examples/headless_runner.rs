//! Headless runner: loads a data directory, runs every scenario and prints
//! the KPI table for each.
//!
//! ```text
//! cargo run -p qpress-data --example headless_runner -- [DATA_DIR]
//! RUST_LOG=qpress_core=debug cargo run -p qpress-data --example headless_runner
//! ```

use std::path::PathBuf;

use qpress_data::load_data_dir;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("qpress_data=info".parse()?))
        .init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"));
    let data = load_data_dir(&dir)?;

    for (name, result) in data.run_all() {
        println!("== {name}");
        match result {
            Ok(output) => {
                for (metric, value) in output.kpis.metrics() {
                    println!("  {metric:<28} {value}");
                }
                for warning in &output.warnings {
                    println!("  warning: {warning:?}");
                }
                println!("  log rows: {}", output.log.len());
            }
            Err(e) => println!("  error: {e}"),
        }
    }

    Ok(())
}
