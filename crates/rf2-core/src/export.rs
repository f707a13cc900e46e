//! Writing Full, Snapshot and Delta views of a table.

use std::io::{BufWriter, Write};
use std::path::Path;

use rf2_ingest::TsvWriter;
use rf2_model::{ReleaseKind, Result, Rf2Error, Row};
use tracing::debug;

use crate::store::TableStore;

/// What a table view should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest<'a> {
    pub kind: ReleaseKind,
    pub effective_time: &'a str,
    pub snapshot_active_only: bool,
}

/// Write the header and then `rows`, CRLF terminated. Returns the row count.
pub fn write_rows<W: Write>(
    name: &str,
    header: &[String],
    rows: impl Iterator<Item = Row>,
    writer: W,
) -> Result<usize> {
    let mut tsv = TsvWriter::new(name, writer);
    tsv.write_header(header)?;
    for row in rows {
        tsv.write_row(&row)?;
    }
    let written = tsv.rows_written();
    let mut inner = tsv.finish()?;
    inner.flush()?;
    Ok(written)
}

/// Stream one view of `table` to `writer`.
pub fn write_table<W: Write>(
    store: &dyn TableStore,
    table: &str,
    request: ExportRequest<'_>,
    writer: W,
) -> Result<usize> {
    let header = store.schema(table)?.columns.clone();
    let rows = match request.kind {
        ReleaseKind::Full => store.select_full(table)?,
        ReleaseKind::Snapshot => {
            store.select_snapshot(table, request.effective_time, request.snapshot_active_only)?
        }
        ReleaseKind::Delta => store.select_delta(table, request.effective_time)?,
    };
    write_rows(table, &header, rows, writer)
}

/// Write one view of `table` to a file at `path`; the file only appears once
/// complete.
pub fn write_table_file(
    store: &dyn TableStore,
    table: &str,
    request: ExportRequest<'_>,
    path: &Path,
) -> Result<usize> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".export-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    let written = write_table(store, table, request, BufWriter::new(temp.as_file_mut()))?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| Rf2Error::Io(err.error))?;
    debug!(table = %table, kind = %request.kind, rows = written, path = %path.display(), "table exported");
    Ok(written)
}
