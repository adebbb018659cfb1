use log::debug;

use std::path::Path;

use snafu::prelude::*;
use synthesis::RawTable;

use crate::synth::io_common::TableSource;
use crate::synth::*;

/// Comma-separated tables, as written by the survey aggregation scripts.
pub struct CsvSource {}

impl TableSource for CsvSource {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn read_file(&self, path: &Path) -> SynthResult<RawTable> {
        let path_s = path.display().to_string();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .context(CsvOpenSnafu { path: path_s.clone() })?;
        let headers: Vec<String> = rdr
            .headers()
            .context(CsvLineParseSnafu {
                path: path_s.clone(),
                lineno: 1_usize,
            })?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let mut records: Vec<Vec<String>> = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.context(CsvLineParseSnafu {
                path: path_s.clone(),
                lineno: idx + 2,
            })?;
            records.push(record.iter().map(|s| s.to_string()).collect());
        }
        debug!("read_file: {}: {} records", path_s, records.len());
        Ok(RawTable::new(headers, records))
    }
}
