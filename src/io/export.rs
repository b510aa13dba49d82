//! CSV export of the optimized hourly schedule.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::optimizer::SolutionRow;

/// Column header for the solution CSV.
const HEADER: &str = "hour,ac_charge,dc_charge,discharge_allowed,ev_charge,\
                       pv_wh,load_wh,appliance_wh,grid_import_wh,grid_export_wh,\
                       losses_wh,electricity_price,cost,revenue,\
                       battery_soc_percent,ev_soc_percent";

/// Exports the solution frame to a CSV file at the given path.
///
/// Writes a header row followed by one data row per simulated hour. SOC
/// columns are left empty when the device is absent. Produces deterministic
/// output for identical inputs.
///
/// # Arguments
///
/// * `rows` - Solution frame, one row per hour
/// * `path` - Output file path
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be created and `Error::Csv` if
/// writing fails.
pub fn export_csv(rows: &[SolutionRow], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(rows, io::BufWriter::new(file))
}

/// Writes the solution frame as CSV to any writer.
///
/// # Errors
///
/// Returns `Error::Csv` if writing fails.
pub fn write_csv(rows: &[SolutionRow], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    let soc = |v: Option<f64>| v.map(|s| format!("{s:.4}")).unwrap_or_default();
    for r in rows {
        wtr.write_record(&[
            r.hour.to_string(),
            format!("{:.4}", r.ac_charge),
            format!("{:.0}", r.dc_charge),
            r.discharge_allowed.to_string(),
            format!("{:.4}", r.ev_charge),
            format!("{:.4}", r.pv_wh),
            format!("{:.4}", r.load_wh),
            format!("{:.4}", r.appliance_wh),
            format!("{:.4}", r.grid_import_wh),
            format!("{:.4}", r.grid_export_wh),
            format!("{:.4}", r.losses_wh),
            format!("{:.8}", r.electricity_price),
            format!("{:.6}", r.cost),
            format!("{:.6}", r.revenue),
            soc(r.battery_soc_percent),
            soc(r.ev_soc_percent),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
