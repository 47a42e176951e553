//! One-shot telemetry dump
//!
//! Prints one JSON snapshot per GPU and exits.
//!
//! Run with: cargo run --example snapshot [path/to/libnvidia-ml.so.1]

use gpumon::config::ConfigBuilder;
use gpumon::{GpuMonitor, MonitorError};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    if let Err(e) = run() {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), MonitorError> {
    let config = ConfigBuilder::new()
        .with_file(None)
        .with_env()
        .with_library_path(std::env::args_os().nth(1).map(PathBuf::from))
        .build();

    let mut monitor = GpuMonitor::from_config(&config)?;
    println!("Detected {} GPU device(s)", monitor.device_count());

    for index in 0..monitor.device_count() {
        let snapshot = monitor.snapshot(index)?;
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{}", json),
            Err(e) => log::warn!("Failed to serialize GPU {}: {}", index, e),
        }
    }

    monitor.close()
}
