//! Ordered chains of line transformations and their application to files.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use rf2_ingest::{TsvReader, TsvWriter};
use rf2_model::{Result, Rf2Error, Row};
use tracing::{debug, info, warn};

use crate::line::LineTransformation;

/// Counts reported after transforming one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub rows: usize,
    /// Rows dropped because an identical row was already written.
    pub duplicates: usize,
    pub duration_ms: u128,
}

/// Transformations applied, in order, to every data row of a table.
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    name: String,
    transformations: Vec<LineTransformation>,
}

impl TransformPipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transformations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(mut self, transformation: LineTransformation) -> Self {
        self.transformations.push(transformation);
        self
    }

    /// Run a transformation before everything already in the pipeline.
    pub fn add_front(mut self, transformation: LineTransformation) -> Self {
        self.transformations.insert(0, transformation);
        self
    }

    pub fn transformations(&self) -> &[LineTransformation] {
        &self.transformations
    }

    pub fn len(&self) -> usize {
        self.transformations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    pub fn transform_row(&self, row: &mut Row) -> Result<()> {
        for transformation in &self.transformations {
            transformation.apply(row)?;
        }
        Ok(())
    }

    /// Copy `reader` to `writer`, transforming every line after the header.
    ///
    /// A transformed row identical to one already written is dropped, so
    /// restated members that derive the same id load once. The first failing
    /// row aborts the stream.
    pub fn transform_stream<R: Read, W: Write>(
        &self,
        file_name: &str,
        reader: R,
        writer: W,
    ) -> Result<TransformStats> {
        let start = Instant::now();
        let mut reader = TsvReader::new(file_name, reader);
        let mut writer = TsvWriter::new(file_name, writer);

        let Some(header) = reader.next_row()? else {
            warn!(file = %file_name, "nothing to transform, stream is empty");
            return Ok(TransformStats::default());
        };
        writer.write_header(&header)?;

        let mut written: HashSet<Row> = HashSet::new();
        let mut duplicates = 0usize;
        let mut line_number = 1usize;
        while let Some(mut row) = reader.next_row()? {
            line_number += 1;
            if row.len() != header.len() {
                return Err(Rf2Error::transformation(format!(
                    "{file_name} line {line_number}: {} columns, header has {}",
                    row.len(),
                    header.len()
                )));
            }
            self.transform_row(&mut row).map_err(|err| match err {
                Rf2Error::Transformation { message } => Rf2Error::transformation(format!(
                    "{file_name} line {line_number}: {message}"
                )),
                other => other,
            })?;
            if written.contains(&row) {
                warn!(file = %file_name, line = line_number, "dropping duplicate row");
                duplicates += 1;
                continue;
            }
            writer.write_row(&row)?;
            written.insert(row);
        }

        let rows = writer.rows_written();
        let mut inner = writer.finish()?;
        inner.flush()?;
        let stats = TransformStats {
            rows,
            duplicates,
            duration_ms: start.elapsed().as_millis(),
        };
        debug!(file = %file_name, pipeline = %self.name, rows, duplicates, "stream transformed");
        Ok(stats)
    }

    /// Transform `input` into `output` through a temporary file next to
    /// `output`; `output` only appears once every row has been written.
    pub fn transform_file(&self, input: &Path, output: &Path) -> Result<TransformStats> {
        let file_name = output
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let dir = output
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let source = BufReader::new(File::open(input)?);
        let mut temp = tempfile::Builder::new()
            .prefix(".transform-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        let stats = self.transform_stream(&file_name, source, BufWriter::new(temp.as_file_mut()))?;
        temp.as_file().sync_all()?;
        temp.persist(output).map_err(|err| Rf2Error::Io(err.error))?;

        info!(
            file = %file_name,
            rows = stats.rows,
            duration_ms = stats.duration_ms,
            "file transformed"
        );
        Ok(stats)
    }

    /// Transform a file where it lies; the original stays untouched unless
    /// the whole file transforms cleanly.
    pub fn transform_in_place(&self, path: &Path) -> Result<TransformStats> {
        self.transform_file(path, path)
    }
}
