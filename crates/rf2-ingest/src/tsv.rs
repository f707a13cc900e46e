//! Tab-separated RF2 streams.
//!
//! RF2 files are plain tab-separated text: no quoting, CRLF line endings,
//! and a header row. Rows may carry empty trailing columns, so the reader is
//! flexible about record width and leaves shape checks to the callers.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use rf2_model::Row;

use crate::error::{IngestError, Result};

/// Header plus data rows of a fully loaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Streaming reader over one RF2 file.
pub struct TsvReader<R: Read> {
    name: String,
    inner: csv::Reader<R>,
    record: StringRecord,
    first: bool,
}

impl<R: Read> TsvReader<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        let inner = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(reader);
        Self {
            name: name.into(),
            inner,
            record: StringRecord::new(),
            first: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next line as columns, `None` at end of stream.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        let more = self
            .inner
            .read_record(&mut self.record)
            .map_err(|source| IngestError::TsvParse {
                name: self.name.clone(),
                source,
            })?;
        if !more {
            return Ok(None);
        }
        let mut row: Row = self.record.iter().map(str::to_string).collect();
        if self.first {
            self.first = false;
            if let Some(first) = row.first_mut() {
                *first = first.trim_start_matches('\u{feff}').to_string();
            }
        }
        Ok(Some(row))
    }

    /// Read the header row; an empty stream is an error.
    pub fn read_header(&mut self) -> Result<Vec<String>> {
        match self.next_row()? {
            Some(header) => Ok(header.into_iter().map(|c| c.trim().to_string()).collect()),
            None => Err(IngestError::EmptyFile {
                name: self.name.clone(),
            }),
        }
    }
}

impl<R: Read> Iterator for TsvReader<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

pub fn open_tsv(path: &Path) -> Result<TsvReader<BufReader<File>>> {
    let file = File::open(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(TsvReader::new(file_label(path), BufReader::new(file)))
}

/// Load a whole stream, header first.
pub fn read_tsv<R: Read>(name: &str, reader: R) -> Result<TsvTable> {
    let mut reader = TsvReader::new(name, reader);
    let headers = reader.read_header()?;
    let rows = reader.collect::<Result<Vec<_>>>()?;
    Ok(TsvTable { headers, rows })
}

pub fn read_tsv_path(path: &Path) -> Result<TsvTable> {
    let mut reader = open_tsv(path)?;
    let headers = reader.read_header()?;
    let rows = reader.collect::<Result<Vec<_>>>()?;
    Ok(TsvTable { headers, rows })
}

/// Read only the header row of a file.
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    open_tsv(path)?.read_header()
}

/// Writer emitting RF2 lines: tab separated, unquoted, CRLF terminated.
pub struct TsvWriter<W: Write> {
    name: String,
    inner: csv::Writer<W>,
    rows_written: usize,
}

impl<W: Write> TsvWriter<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        let inner = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::CRLF)
            .flexible(true)
            .from_writer(writer);
        Self {
            name: name.into(),
            inner,
            rows_written: 0,
        }
    }

    pub fn write_header(&mut self, header: &[String]) -> Result<()> {
        self.write(header)
    }

    pub fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.write(row)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Data rows written so far, header excluded.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().map_err(|source| IngestError::TsvWrite {
            name: self.name.clone(),
            source: source.into(),
        })?;
        let name = self.name;
        self.inner
            .into_inner()
            .map_err(|err| IngestError::TsvWrite {
                name,
                source: err.into_error().into(),
            })
    }

    fn write(&mut self, fields: &[String]) -> Result<()> {
        self.inner
            .write_record(fields)
            .map_err(|source| IngestError::TsvWrite {
                name: self.name.clone(),
                source,
            })
    }
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_rows_without_quoting() {
        let input = "id\teffectiveTime\tactive\tmoduleId\tterm\r\n\
                     1\t20250131\t1\t900000000000207008\t\"quoted\" term\r\n\
                     2\t20250131\t0\t900000000000207008\t\r\n";
        let table = read_tsv("concepts", input.as_bytes()).expect("read");
        assert_eq!(table.headers.len(), 5);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][4], "\"quoted\" term");
        assert_eq!(table.rows[1][4], "");
    }

    #[test]
    fn empty_stream_has_no_header() {
        assert!(matches!(
            read_tsv("empty", "".as_bytes()),
            Err(IngestError::EmptyFile { .. })
        ));
    }

    #[test]
    fn strips_byte_order_mark() {
        let table = read_tsv("bom", "\u{feff}id\teffectiveTime\n".as_bytes()).expect("read");
        assert_eq!(table.headers[0], "id");
    }

    #[test]
    fn writes_crlf_unquoted() {
        let mut writer = TsvWriter::new("out", Vec::new());
        writer
            .write_header(&["id".to_string(), "term".to_string()])
            .expect("header");
        writer
            .write_row(&["1".to_string(), "a \"b\"".to_string()])
            .expect("row");
        assert_eq!(writer.rows_written(), 1);
        let bytes = writer.finish().expect("finish");
        assert_eq!(String::from_utf8(bytes).expect("utf8"), "id\tterm\r\n1\ta \"b\"\r\n");
    }
}
