use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::error::ExportError;

/// Destination for converted cells. Row and column are zero-based.
pub trait CellSink {
    fn set_cell(&mut self, row: u32, col: u16, value: &str) -> Result<(), ExportError>;
}

impl CellSink for Worksheet {
    fn set_cell(&mut self, row: u32, col: u16, value: &str) -> Result<(), ExportError> {
        self.write_string(row, col, value)?;
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Copy every field of a comma-delimited stream into `sink` at the same
/// position, header row included. Returns the number of rows copied.
pub fn write_csv_cells<R: Read, S: CellSink>(input: R, sink: &mut S) -> Result<u32, ExportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut rows: u32 = 0;
    for record in reader.records() {
        let record = record?;
        for (c, field) in record.iter().enumerate() {
            let col = u16::try_from(c)
                .map_err(|_| ExportError::Xlsx(format!("row {} has too many columns", rows + 1)))?;
            sink.set_cell(rows, col, field)?;
        }
        rows += 1;
    }
    Ok(rows)
}

/// Convert a delimited file into a single-sheet workbook. Every cell holds
/// the field text verbatim; no type inference is done.
pub fn convert_csv_to_xlsx(input: &Path, output: &Path) -> Result<u32> {
    let file = fs::File::open(input)
        .map_err(ExportError::from)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    ensure_parent_dir(output)?;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let rows = write_csv_cells(file, sheet)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    workbook
        .save(output)
        .map_err(ExportError::from)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::debug!(
        "Converted {} row(s) from {} to {}",
        rows,
        input.display(),
        output.display()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Cells(Vec<(u32, u16, String)>);

    impl CellSink for Cells {
        fn set_cell(&mut self, row: u32, col: u16, value: &str) -> Result<(), ExportError> {
            self.0.push((row, col, value.to_string()));
            Ok(())
        }
    }

    #[test]
    fn cells_keep_position_and_text() {
        let data = "a,b\n1,\"x,y\"\n007,\n";
        let mut cells = Cells::default();
        let rows = write_csv_cells(data.as_bytes(), &mut cells).unwrap();
        assert_eq!(rows, 3);
        assert_eq!(
            cells.0,
            vec![
                (0, 0, "a".to_string()),
                (0, 1, "b".to_string()),
                (1, 0, "1".to_string()),
                (1, 1, "x,y".to_string()),
                (2, 0, "007".to_string()),
                (2, 1, "".to_string()),
            ]
        );
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let mut cells = Cells::default();
        let rows = write_csv_cells("a\nb,c,d\n".as_bytes(), &mut cells).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(cells.0.len(), 4);
        assert_eq!(cells.0[3], (1, 2, "d".to_string()));
    }

    #[test]
    fn converts_file_to_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.csv");
        std::fs::write(&input, "h1,h2\nA,1\nB,2\n").unwrap();
        let output = dir.path().join("nested").join("data.csv.xlsx");
        let rows = convert_csv_to_xlsx(&input, &output).unwrap();
        assert_eq!(rows, 3);
        let bytes = std::fs::read(&output).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_csv_to_xlsx(&dir.path().join("nope.csv"), &dir.path().join("o.xlsx"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::Io(_))
        ));
    }
}
