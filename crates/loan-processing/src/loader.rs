//! Reading raw exports and writing cleaned datasets.
//!
//! The loan export is not guaranteed to be UTF-8: free-text columns of older
//! snapshots are Windows-1252. Bytes that are not valid UTF-8 are transcoded
//! before parsing, so a single stray byte does not abort the whole load.

use crate::error::{CleaningError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Decode raw bytes as UTF-8, falling back to Windows-1252.
///
/// Windows-1252 is a superset of the printable ISO-8859-1 range, so Latin-1
/// input decodes the same way. A leading byte-order mark is dropped.
pub fn decode_input(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug!("Input is not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(err.as_bytes());
            decoded.into_owned()
        }
    };

    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Parse CSV bytes with a header row, inferring types over every row.
pub fn read_loan_csv(bytes: Vec<u8>) -> Result<DataFrame> {
    let text = decode_input(bytes);
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(text))
        .finish()
        .context("Failed to parse CSV input")
}

/// Load a raw export from disk (CSV, or Parquet by extension).
pub fn load_loan_data(path: &Path) -> Result<DataFrame> {
    let df = match extension(path).as_str() {
        "parquet" => {
            let file = File::open(path)?;
            ParquetReader::new(file)
                .finish()
                .context(format!("Failed to read Parquet file: {}", path.display()))?
        }
        _ => {
            let bytes = std::fs::read(path)
                .map_err(|e| CleaningError::Io(e).with_context(format!("Failed to read {}", path.display())))?;
            read_loan_csv(bytes).context(format!("Failed to load {}", path.display()))?
        }
    };

    info!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Save a dataset to file (CSV or Parquet based on extension).
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    match extension(path).as_str() {
        "csv" => {
            let mut file = File::create(path)?;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(df)
                .context(format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = File::create(path)?;
            ParquetWriter::new(file)
                .finish(df)
                .context(format!("Failed to write Parquet file: {}", path.display()))?;
        }
        other => {
            return Err(CleaningError::InvalidConfig(format!(
                "Unsupported output format: '{}'. Supported formats: csv, parquet",
                other
            )));
        }
    }

    info!("Dataset saved: {}", path.display());
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_utf8_unchanged() {
        let text = decode_input("addr_state,emp_title\nCA,Café\n".as_bytes().to_vec());
        assert_eq!(text, "addr_state,emp_title\nCA,Café\n");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        // "Café" with a Latin-1 encoded é
        let bytes = vec![b'C', b'a', b'f', 0xE9];
        assert_eq!(decode_input(bytes), "Café");
    }

    #[test]
    fn test_decode_strips_byte_order_mark() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"id\n1\n");
        assert_eq!(decode_input(bytes), "id\n1\n");
    }

    #[test]
    fn test_read_loan_csv_infers_types() {
        let csv = "loan_amnt,int_rate,emp_length\n5000,10.65%,10+ years\n2500,15.27%,\n";
        let df = read_loan_csv(csv.as_bytes().to_vec()).unwrap();

        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("loan_amnt").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("int_rate").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("emp_length").unwrap().null_count(), 1);
    }

    #[test]
    fn test_save_dataset_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut df = df!["a" => [1, 2]].unwrap();
        let err = save_dataset(&mut df, &dir.path().join("out.xlsx")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_load_malformed_csv_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "loan_amnt,grade\n5000,B,extra,fields\n").unwrap();

        let err = load_loan_data(&path).unwrap_err();
        assert_eq!(err.error_code(), "POLARS_ERROR");
        assert!(err.to_string().starts_with("Failed to load"));
        assert!(err.to_string().contains("ragged.csv"));
    }

    #[test]
    fn test_save_and_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.csv");
        let mut df = df!["grade" => ["A", "B"], "dti" => [1.5, 2.5]].unwrap();

        save_dataset(&mut df, &path).unwrap();
        let loaded = load_loan_data(&path).unwrap();
        assert!(loaded.equals_missing(&df));
    }
}
