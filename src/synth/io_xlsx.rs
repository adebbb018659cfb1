use log::debug;

use std::path::Path;

use calamine::{open_workbook, DataType, Reader, Xlsx};
use snafu::prelude::*;
use synthesis::RawTable;

use crate::synth::io_common::TableSource;
use crate::synth::*;

/// Excel workbooks. Only the first worksheet is read.
pub struct XlsxSource {}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Empty => String::new(),
        // Formula errors are missing values.
        DataType::Error(_) => String::new(),
        x => x.to_string(),
    }
}

impl TableSource for XlsxSource {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn read_file(&self, path: &Path) -> SynthResult<RawTable> {
        let path_s = path.display().to_string();
        let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu {
            path: path_s.clone(),
        })?;
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {
                path: path_s.clone(),
            })?
            .context(OpeningExcelSnafu {
                path: path_s.clone(),
            })?;
        let mut rows = wrange.rows();
        let headers: Vec<String> = rows
            .next()
            .context(EmptyExcelSnafu {
                path: path_s.clone(),
            })?
            .iter()
            .map(cell_to_string)
            .collect();
        debug!("read_file: {}: header: {:?}", path_s, headers);
        let records: Vec<Vec<String>> = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        Ok(RawTable::new(headers, records))
    }
}
