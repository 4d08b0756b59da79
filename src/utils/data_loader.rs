//! Data loading and saving utilities

use crate::config::MIN_INFER_SCHEMA_LENGTH;
use crate::error::{EdaError, Result};
use crate::schema;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const USER_AGENT: &str = concat!("airbnb-eda/", env!("CARGO_PKG_VERSION"));

/// Loads the raw listings snapshot from a URL or a local path
pub struct DataLoader {
    /// Rows inspected before column types are fixed
    infer_schema_length: usize,
    /// Timeout for remote fetches
    http_timeout: Duration,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: 10_000,
            http_timeout: Duration::from_secs(300),
        }
    }

    /// Set the type-inference window; never below [`MIN_INFER_SCHEMA_LENGTH`]
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(MIN_INFER_SCHEMA_LENGTH);
        self
    }

    /// Set the HTTP timeout
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn infer_schema_length(&self) -> usize {
        self.infer_schema_length
    }

    /// Fetch the snapshot and parse it, checking that every column the
    /// pipeline consumes is present.
    pub fn load_listings(&self, locator: &str) -> Result<DataFrame> {
        let start = Instant::now();
        let bytes = self.fetch(locator)?;
        let df = self.parse_csv(bytes)?;

        let missing = schema::missing_columns(&df, &schema::selected_column_names());
        if !missing.is_empty() {
            return Err(EdaError::ParseError(format!(
                "{} is missing required columns: {}",
                locator,
                missing.join(", ")
            )));
        }

        info!(
            source = %locator,
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded listings snapshot"
        );
        Ok(df)
    }

    /// Read the raw bytes behind `locator`
    pub fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        if is_remote(locator) {
            self.fetch_http(locator)
        } else {
            std::fs::read(locator).map_err(|e| EdaError::SourceUnavailable {
                locator: locator.to_string(),
                reason: e.to_string(),
            })
        }
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>> {
        let unavailable = |reason: String| EdaError::SourceUnavailable {
            locator: url.to_string(),
            reason,
        };

        info!(url = %url, "Downloading listings snapshot");

        let client = reqwest::blocking::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| unavailable(format!("failed to create HTTP client: {e}")))?;

        let response = client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .map_err(|e| unavailable(format!("download failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| unavailable(format!("failed to read response body: {e}")))?;

        info!(size_bytes = bytes.len(), "Snapshot downloaded");
        Ok(bytes.to_vec())
    }

    /// Parse CSV bytes with a header row. Gzip input is decompressed by the reader.
    pub fn parse_csv(&self, bytes: Vec<u8>) -> Result<DataFrame> {
        if bytes.starts_with(&GZIP_MAGIC) {
            debug!(compressed_bytes = bytes.len(), "Source is gzip-compressed");
        }

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| EdaError::ParseError(e.to_string()))
    }

    /// Load a CSV, JSON or Parquet file, picking the reader from the extension
    pub fn load_auto(&self, path: &Path) -> Result<DataFrame> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "parquet" | "pq" => {
                let file = File::open(path).map_err(|e| EdaError::SourceUnavailable {
                    locator: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                ParquetReader::new(file)
                    .finish()
                    .map_err(|e| EdaError::ParseError(e.to_string()))
            }
            "json" => {
                let file = File::open(path).map_err(|e| EdaError::SourceUnavailable {
                    locator: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                JsonReader::new(file)
                    .finish()
                    .map_err(|e| EdaError::ParseError(e.to_string()))
            }
            "csv" | "gz" => {
                let bytes = self.fetch(&path.to_string_lossy())?;
                self.parse_csv(bytes)
            }
            other => Err(EdaError::ParseError(format!(
                "unsupported file format: {:?}",
                other
            ))),
        }
    }
}

fn is_remote(locator: &str) -> bool {
    let lower = locator.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Save DataFrames atomically: write to a sibling temp file, then rename
pub struct DataSaver;

impl DataSaver {
    /// Save as uncompressed CSV
    pub fn save_csv(df: &DataFrame, path: &Path) -> Result<()> {
        Self::write_atomic(path, |file| {
            CsvWriter::new(file).finish(&mut df.clone())
        })
    }

    /// Save as Parquet
    pub fn save_parquet(df: &DataFrame, path: &Path) -> Result<()> {
        Self::write_atomic(path, |file| {
            ParquetWriter::new(file).finish(&mut df.clone()).map(|_| ())
        })
    }

    /// Save any serializable value as pretty-printed JSON
    pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
        Self::write_atomic(path, |file| serde_json::to_writer_pretty(file, value))
    }

    fn write_atomic<F, E>(path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut File) -> std::result::Result<(), E>,
        E: std::fmt::Display,
    {
        let write_error = |reason: String| EdaError::WriteError {
            path: path.display().to_string(),
            reason,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".airbnb-eda-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| write_error(e.to_string()))?;

        write(tmp.as_file_mut()).map_err(|e| write_error(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| write_error(e.to_string()))?;
        tmp.persist(path).map_err(|e| write_error(e.error.to_string()))?;

        debug!(path = %path.display(), "Artifact written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "id,price,host_is_superhost").unwrap();
        writeln!(file, "1,\"$1,234.00\",t").unwrap();
        writeln!(file, "2,$45.00,f").unwrap();
        writeln!(file, "3,$80.00,").unwrap();
        file
    }

    #[test]
    fn test_load_auto_csv_keeps_price_as_text() {
        let file = create_test_csv();
        let df = DataLoader::new().load_auto(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("price").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_missing_source_is_unavailable() {
        let err = DataLoader::new()
            .fetch("/definitely/not/here/listings.csv.gz")
            .unwrap_err();
        assert!(matches!(err, EdaError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_load_listings_reports_missing_columns() {
        let file = create_test_csv();
        let err = DataLoader::new()
            .load_listings(file.path().to_str().unwrap())
            .unwrap_err();

        match err {
            EdaError::ParseError(msg) => {
                assert!(msg.contains("host_id"));
                assert!(msg.contains("review_scores_rating"));
            }
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_infer_window_has_floor() {
        let loader = DataLoader::new().with_infer_schema_length(10);
        assert_eq!(loader.infer_schema_length(), MIN_INFER_SCHEMA_LENGTH);
    }

    #[test]
    fn test_save_parquet_round_trip() {
        let df = df!(
            "a" => &[1i64, 2, 3],
            "b" => &["x", "y", "z"]
        ).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.parquet");
        DataSaver::save_parquet(&df, &path).unwrap();

        let loaded = DataLoader::new().load_auto(&path).unwrap();
        assert!(loaded.equals(&df));

        // Only the artifact remains; the temp file was renamed into place.
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let blocker = NamedTempFile::new().unwrap();
        let path = blocker.path().join("out.parquet");
        let df = df!("a" => &[1i64]).unwrap();

        let err = DataSaver::save_parquet(&df, &path).unwrap_err();
        assert!(matches!(err, EdaError::WriteError { .. }));
    }

    #[test]
    fn test_http_error_status_is_unavailable() {
        use std::io::{BufRead, BufReader};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let mut stream = stream;
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });

        let url = format!("http://{addr}/listings.csv.gz");
        let err = DataLoader::new()
            .with_http_timeout(Duration::from_secs(10))
            .fetch(&url)
            .unwrap_err();
        server.join().unwrap();

        match err {
            EdaError::SourceUnavailable { locator, reason } => {
                assert_eq!(locator, url);
                assert!(reason.contains("404"), "{reason}");
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }
}
