pub mod discovery;
pub mod error;
pub mod filename;
pub mod schema;
pub mod tsv;

pub use discovery::{DiscoveredFile, discover_inputs, find_by_stem, list_rf2_files};
pub use error::{IngestError, Result};
pub use filename::{ContentKind, Rf2FileName};
pub use schema::{component_type, recognise, required_column_count};
pub use tsv::{TsvReader, TsvTable, TsvWriter, open_tsv, read_header, read_tsv, read_tsv_path};
