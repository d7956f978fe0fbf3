use std::io::{self, Write};
use std::path::Path;

use crate::control::axis::AxisSample;

/// One controller sample of one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisTraceRow {
    pub time: f64,
    pub axis: String,
    pub error: f64,  // deg
    pub rate: f64,   // deg/s
    pub action: f64, // deg/s^2
    pub output: f64,
}

impl AxisTraceRow {
    pub fn new(time: f64, axis: &str, sample: &AxisSample) -> Self {
        AxisTraceRow {
            time,
            axis: axis.to_owned(),
            error: sample.error,
            rate: sample.rate,
            action: sample.action,
            output: sample.output,
        }
    }
}

/// Write attitude controller traces as CSV.
///
/// Columns: time, axis, error_deg, rate_deg_s, action_deg_s2, output
pub fn write_axis_trace<W: Write>(writer: &mut W, rows: &[AxisTraceRow]) -> io::Result<()> {
    writeln!(writer, "time,axis,error_deg,rate_deg_s,action_deg_s2,output")?;

    for r in rows {
        writeln!(
            writer,
            "{:.4},{},{:.6},{:.6},{:.6},{:.6}",
            r.time, r.axis, r.error, r.rate, r.action, r.output,
        )?;
    }

    Ok(())
}

/// Write the trace to a CSV file at the given path.
pub fn write_axis_trace_file<P: AsRef<Path>>(path: P, rows: &[AxisTraceRow]) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_axis_trace(&mut file, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_output_has_header_and_rows() {
        let sample = AxisSample { error: 1.5, rate: -0.25, action: 0.1, output: -0.2 };
        let rows = vec![
            AxisTraceRow::new(0.0, "pitch", &sample),
            AxisTraceRow::new(0.02, "yaw", &sample),
        ];

        let mut buf = Vec::new();
        write_axis_trace(&mut buf, &rows).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("time,axis,"));
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert_eq!(lines[1], "0.0000,pitch,1.500000,-0.250000,0.100000,-0.200000");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        write_axis_trace_file(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
