use crate::error::ExportError;
use crate::results::ScrapeResult;
use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Column title written above the scraped rows
pub const COLUMN_HEADER: &str = "Scraped Text";

/// File formats a result can be saved as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Xlsx,
}

impl ExportFormat {
    /// Field separator for the delimited text formats
    pub fn delimiter(self) -> Option<char> {
        match self {
            ExportFormat::Csv => Some(','),
            ExportFormat::Tsv => Some('\t'),
            ExportFormat::Xlsx => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_field<W: Write>(w: &mut W, field: &str, sep: char) -> io::Result<()> {
    if needs_quotes(field, sep) {
        write!(w, "\"{}\"", field.replace('"', "\"\""))?;
    } else {
        write!(w, "{field}")?;
    }
    writeln!(w)
}

/// Write a header plus one row per item to any writer, separated by `sep`.
pub fn write_delimited<W: Write>(mut w: W, result: &ScrapeResult, sep: char) -> io::Result<()> {
    write_field(&mut w, COLUMN_HEADER, sep)?;
    for item in result.items() {
        write_field(&mut w, item, sep)?;
    }
    w.flush()
}

/// Save a result as a single-column file. An empty result is refused.
pub fn export(result: &ScrapeResult, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
    if result.is_empty() {
        return Err(ExportError::Empty);
    }

    match format.delimiter() {
        Some(sep) => {
            let io_error = |source| ExportError::Io {
                path: path.display().to_string(),
                source,
            };
            let file = File::create(path).map_err(io_error)?;
            write_delimited(BufWriter::new(file), result, sep).map_err(io_error)?;
        }
        None => write_workbook(result, path).map_err(|source| ExportError::Workbook {
            path: path.display().to_string(),
            source,
        })?,
    }

    ::log::info!("Saved {} rows to {}", result.len(), path.display());
    Ok(())
}

/// One worksheet: the header cell in A1, then one row per item.
fn write_workbook(result: &ScrapeResult, path: &Path) -> Result<(), rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, COLUMN_HEADER)?;
    for (row, item) in (1u32..).zip(result.items()) {
        worksheet.write_string(row, 0, item)?;
    }
    workbook.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::PageResult;
    use calamine::{Reader, Xlsx, open_workbook};

    fn result(items: &[&str]) -> ScrapeResult {
        let mut result = ScrapeResult::new();
        result.append(PageResult::from_texts(items));
        result
    }

    #[test]
    fn test_csv_quoting() {
        let mut out = Vec::new();
        write_delimited(&mut out, &result(&["plain", "a, b", "say \"hi\""]), ',').unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Scraped Text\nplain\n\"a, b\"\n\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn test_tsv_only_quotes_tabs() {
        let mut out = Vec::new();
        write_delimited(&mut out, &result(&["a, b", "c\td"]), '\t').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Scraped Text\na, b\n\"c\td\"\n");
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        export(&result(&["A1", "A2"]), &path, ExportFormat::Csv).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Scraped Text\nA1\nA2\n");
    }

    #[test]
    fn test_export_refuses_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let err = export(&ScrapeResult::new(), &path, ExportFormat::Csv).unwrap_err();
        assert!(matches!(err, ExportError::Empty));
        assert!(!path.exists());
    }

    #[test]
    fn test_export_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let err = export(&result(&["x"]), &path, ExportFormat::Tsv).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    #[test]
    fn test_export_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        export(&result(&["A1", "a, \"quoted\" b"]), &path, ExportFormat::Xlsx).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let sheets = workbook.sheet_names();
        assert_eq!(sheets.len(), 1);
        let range = workbook.worksheet_range(&sheets[0]).unwrap();
        let cells: Vec<String> = range.rows().map(|row| row[0].to_string()).collect();
        assert_eq!(cells, ["Scraped Text", "A1", "a, \"quoted\" b"]);
    }

    #[test]
    fn test_workbook_refuses_empty_result_and_bad_path() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("out.xlsx");
        let err = export(&ScrapeResult::new(), &path, ExportFormat::Xlsx).unwrap_err();
        assert!(matches!(err, ExportError::Empty));
        assert!(!path.exists());

        let path = dir.path().join("missing").join("out.xlsx");
        let err = export(&result(&["x"]), &path, ExportFormat::Xlsx).unwrap_err();
        assert!(matches!(err, ExportError::Workbook { .. }));
    }
}
