//! CSV export for execution records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::{ExecutionRecord, Outcome};

/// Column header for CSV record export.
const HEADER: &str = "time_s,equipment,event,outcome,state,power_w,\
                       pump_w,compressor_w,sensor_w,reason";

/// Exports execution records to a CSV file at the given path.
///
/// Writes a header row followed by one data row per record. Sub-load
/// columns are empty for equipment without a repartition; `reason` is
/// empty unless the event was rejected. Produces deterministic output for
/// identical inputs.
///
/// # Arguments
///
/// * `records` - Records in handling order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[ExecutionRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

/// Writes execution records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[ExecutionRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        let (pump, compressor, sensor) = match &r.repartition {
            Some(p) => (
                format!("{:.4}", p.pump_w),
                format!("{:.4}", p.compressor_w),
                format!("{:.4}", p.sensor_w),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        let reason = match &r.outcome {
            Outcome::Rejected(reason) => reason.as_str(),
            _ => "",
        };
        wtr.write_record([
            format!("{:.3}", r.time.as_secs()).as_str(),
            r.equipment.as_str(),
            r.kind.as_str(),
            r.outcome.as_str(),
            r.state.as_str(),
            format!("{:.4}", r.power_w).as_str(),
            pump.as_str(),
            compressor.as_str(),
            sensor.as_str(),
            reason,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
