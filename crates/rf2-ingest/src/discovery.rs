//! Input file discovery.

use std::path::{Path, PathBuf};

use rf2_model::TableSchema;
use rf2_model::constants::TXT_FILE_EXTENSION;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::schema::recognise;
use crate::tsv::{file_label, read_header};

/// An input file with the outcome of schema recognition.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub name: String,
    /// Recognised table schema.
    pub schema: Option<TableSchema>,
    /// Why the file was not recognised.
    pub problem: Option<String>,
}

impl DiscoveredFile {
    pub fn is_recognised(&self) -> bool {
        self.schema.is_some()
    }
}

/// Lists all RF2 text files in a directory.
///
/// Returns files sorted by filename.
pub fn list_rf2_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_txt = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(TXT_FILE_EXTENSION));
        if is_txt {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Lists and recognises every input file in a directory.
///
/// Files that cannot be recognised are returned with the reason instead of
/// failing the whole scan.
pub fn discover_inputs(dir: &Path) -> Result<Vec<DiscoveredFile>> {
    let mut discovered = Vec::new();
    for path in list_rf2_files(dir)? {
        let name = file_label(&path);
        let outcome = read_header(&path).and_then(|header| recognise(&name, &header));
        let (schema, problem) = match outcome {
            Ok(schema) => (Some(schema), None),
            Err(err) => {
                debug!(file = %name, error = %err, "input not recognised");
                (None, Some(err.to_string()))
            }
        };
        discovered.push(DiscoveredFile {
            path,
            name,
            schema,
            problem,
        });
    }
    Ok(discovered)
}

/// Find the file of a directory whose name matches `stem` up to the version
/// date, e.g. the previous release's copy of a table.
pub fn find_by_stem(dir: &Path, stem: &str) -> Result<Option<PathBuf>> {
    let prefix = format!("{stem}{}", rf2_model::constants::FILE_NAME_SEPARATOR);
    let mut matches: Vec<PathBuf> = list_rf2_files(dir)?
        .into_iter()
        .filter(|path| file_label(path).starts_with(&prefix))
        .collect();
    // Latest version date wins when several releases sit side by side.
    matches.sort();
    Ok(matches.pop())
}
