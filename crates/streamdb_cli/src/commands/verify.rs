//! Verify command implementation.

use super::open_existing;
use std::path::Path;
use streamdb_core::VerifyReport;

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying store at {:?}", path);
    println!();

    let store = open_existing(path)?;
    let report = store.verify()?;
    store.close()?;

    print_report(&report);

    println!();
    if report.is_ok() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

fn print_report(report: &VerifyReport) {
    println!(
        "  Log entries checked: {} ({} events, {} snapshots) over {} bytes",
        report.entries, report.events, report.snapshots, report.log_size
    );
    println!(
        "  Streams: {}, unpublished events: {}",
        report.streams, report.unpublished
    );
    for problem in &report.problems {
        println!("    ERROR: {}", problem);
    }
}
