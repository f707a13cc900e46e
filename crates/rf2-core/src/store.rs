//! Versioned table store.
//!
//! A table maps (identifier, effectiveTime) keys to complete rows. History is
//! append-only: a new release adds rows for new effectiveTimes but never
//! redefines an existing pair. Full, Snapshot and Delta views are read off
//! the key order.

use std::collections::BTreeMap;
use std::io::Read;

use rf2_ingest::{Rf2FileName, TsvReader, component_type, recognise};
use rf2_model::row::is_active;
use rf2_model::{Key, Result, Rf2Error, Row, TableSchema};
use tracing::{debug, trace};

/// Rows handed out by selections, in key order.
pub type RowStream<'a> = Box<dyn Iterator<Item = Row> + 'a>;

/// One RF2 table and its accumulated history.
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<Key, Row>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn key_of(&self, row: &[String]) -> Result<Key> {
        if row.len() != self.schema.column_count() {
            return Err(Rf2Error::malformed_table(
                self.schema.filename.clone(),
                format!(
                    "row has {} columns, schema has {}",
                    row.len(),
                    self.schema.column_count()
                ),
            ));
        }
        Key::from_columns(self.schema.id_type(), &row[0], &row[1])
    }

    /// Add one row; an existing (identifier, effectiveTime) pair is never
    /// overwritten.
    pub fn insert(&mut self, row: Row) -> Result<()> {
        let key = self.key_of(&row)?;
        if self.rows.contains_key(&key) {
            return Err(Rf2Error::DuplicateKey {
                table: self.schema.filename.clone(),
                key: key.to_string(),
            });
        }
        trace!(table = %self.schema.filename, %key, "insert");
        self.rows.insert(key, row);
        Ok(())
    }

    pub fn full(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Latest row per identifier with effectiveTime not after `as_of`.
    ///
    /// Rows without an effectiveTime sort first and count as released.
    /// With `active_only`, identifiers whose latest state is inactive are
    /// left out.
    pub fn snapshot(&self, as_of: &str, active_only: bool) -> Vec<&Row> {
        let mut selected = Vec::new();
        let mut current: Option<(&Key, &Row)> = None;
        for (key, row) in &self.rows {
            if let Some((previous_key, previous_row)) = current {
                if !previous_key.same_component(key) {
                    if !active_only || is_active(previous_row) {
                        selected.push(previous_row);
                    }
                    current = None;
                }
            }
            let released = key.effective_time().is_none_or(|et| et <= as_of);
            if released {
                current = Some((key, row));
            }
        }
        if let Some((_, row)) = current {
            if !active_only || is_active(row) {
                selected.push(row);
            }
        }
        selected
    }

    pub fn delta(&self, effective_time: &str) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|(key, _)| key.effective_time() == Some(effective_time))
            .map(|(_, row)| row)
            .collect()
    }

    /// Take every row with the given effectiveTime out of the table.
    pub fn remove_effective_time(&mut self, effective_time: &str) -> Vec<Row> {
        let keys: Vec<Key> = self
            .rows
            .keys()
            .filter(|key| key.effective_time() == Some(effective_time))
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|key| self.rows.remove(&key))
            .collect()
    }

    /// Drop rows at `effective_time` that restate what `previous_snapshot`
    /// already published for the same identifier. Returns the number removed.
    pub fn discard_already_published(
        &mut self,
        previous_snapshot: &[Row],
        effective_time: &str,
    ) -> Result<usize> {
        let id_type = self.schema.id_type();
        let mut removed = 0;
        for previous in previous_snapshot {
            if previous.len() < 2 {
                continue;
            }
            let key = Key::from_columns(id_type, &previous[0], effective_time)?;
            let unchanged = self
                .rows
                .get(&key)
                .is_some_and(|current| current.get(2..) == previous.get(2..));
            if unchanged {
                debug!(table = %self.schema.filename, %key, "removing already published delta state");
                self.rows.remove(&key);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Storage for the tables of one build.
///
/// Selections never mutate state; inserts fail on the first bad row and are
/// not retried.
pub trait TableStore {
    /// Create a table from a stream, establishing its schema from the header
    /// row (or from the component's standard columns when the stream has
    /// none). An empty stream is a [`Rf2Error::MalformedTable`].
    fn create_table(
        &mut self,
        name: &str,
        reader: &mut dyn Read,
        first_line_is_header: bool,
    ) -> Result<TableSchema>;

    fn schema(&self, table: &str) -> Result<&TableSchema>;

    fn insert_or_merge(&mut self, table: &str, rows: Vec<Row>) -> Result<usize>;

    /// Add the rows of another file of the same table, discarding its header.
    fn append(&mut self, table: &str, reader: &mut dyn Read) -> Result<usize>;

    fn select_full(&self, table: &str) -> Result<RowStream<'_>>;

    fn select_snapshot(&self, table: &str, as_of: &str, active_only: bool)
    -> Result<RowStream<'_>>;

    fn select_delta(&self, table: &str, effective_time: &str) -> Result<RowStream<'_>>;

    fn take_effective_time(&mut self, table: &str, effective_time: &str) -> Result<Vec<Row>>;

    fn discard_already_published(
        &mut self,
        table: &str,
        previous_snapshot: &[Row],
        effective_time: &str,
    ) -> Result<usize>;

    fn row_count(&self, table: &str) -> Result<usize>;
}

/// Ordered in-memory store, one `BTreeMap` per table.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: BTreeMap<String, Table>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables.get(name).ok_or_else(|| unknown_table(name))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables.get_mut(name).ok_or_else(|| unknown_table(name))
    }

    pub fn create_table_with_schema(&mut self, schema: TableSchema) -> Result<()> {
        if self.tables.contains_key(&schema.filename) {
            return Err(Rf2Error::malformed_table(
                schema.filename.clone(),
                "table already exists",
            ));
        }
        self.tables.insert(schema.filename.clone(), Table::new(schema));
        Ok(())
    }
}

impl TableStore for MemoryTableStore {
    fn create_table(
        &mut self,
        name: &str,
        reader: &mut dyn Read,
        first_line_is_header: bool,
    ) -> Result<TableSchema> {
        let mut reader = TsvReader::new(name, reader);
        let first = reader
            .next_row()?
            .ok_or_else(|| Rf2Error::malformed_table(name, "stream is empty, no header row"))?;

        let (schema, pending) = if first_line_is_header {
            let header: Vec<String> = first.iter().map(|c| c.trim().to_string()).collect();
            (recognise(name, &header)?, None)
        } else {
            let file_name = Rf2FileName::parse(name)?;
            let component = component_type(&file_name).ok_or_else(|| {
                Rf2Error::malformed_table(name, "cannot derive a schema without a header row")
            })?;
            let mut columns: Vec<String> = component
                .required_columns()
                .iter()
                .map(|c| (*c).to_string())
                .collect();
            for extra in columns.len()..first.len() {
                columns.push(format!("field{extra}"));
            }
            (TableSchema::new(name, component, columns), Some(first))
        };

        self.create_table_with_schema(schema.clone())?;
        let table = self.table_mut(name)?;
        let mut inserted = 0usize;
        if let Some(row) = pending {
            table.insert(row)?;
            inserted += 1;
        }
        inserted += insert_stream(table, &mut reader)?;
        debug!(table = %name, rows = inserted, "table created");
        Ok(schema)
    }

    fn schema(&self, table: &str) -> Result<&TableSchema> {
        Ok(self.table(table)?.schema())
    }

    fn insert_or_merge(&mut self, table: &str, rows: Vec<Row>) -> Result<usize> {
        let table = self.table_mut(table)?;
        let count = rows.len();
        for row in rows {
            table.insert(row)?;
        }
        Ok(count)
    }

    fn append(&mut self, table: &str, reader: &mut dyn Read) -> Result<usize> {
        let table = self.table_mut(table)?;
        let mut reader = TsvReader::new(table.schema().filename.clone(), reader);
        if reader.next_row()?.is_none() {
            return Ok(0);
        }
        insert_stream(table, &mut reader)
    }

    fn select_full(&self, table: &str) -> Result<RowStream<'_>> {
        Ok(Box::new(self.table(table)?.full().cloned()))
    }

    fn select_snapshot(
        &self,
        table: &str,
        as_of: &str,
        active_only: bool,
    ) -> Result<RowStream<'_>> {
        let rows = self.table(table)?.snapshot(as_of, active_only);
        Ok(Box::new(rows.into_iter().cloned()))
    }

    fn select_delta(&self, table: &str, effective_time: &str) -> Result<RowStream<'_>> {
        let rows = self.table(table)?.delta(effective_time);
        Ok(Box::new(rows.into_iter().cloned()))
    }

    fn take_effective_time(&mut self, table: &str, effective_time: &str) -> Result<Vec<Row>> {
        Ok(self.table_mut(table)?.remove_effective_time(effective_time))
    }

    fn discard_already_published(
        &mut self,
        table: &str,
        previous_snapshot: &[Row],
        effective_time: &str,
    ) -> Result<usize> {
        self.table_mut(table)?
            .discard_already_published(previous_snapshot, effective_time)
    }

    fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.table(table)?.len())
    }
}

fn insert_stream<R: Read>(table: &mut Table, reader: &mut TsvReader<R>) -> Result<usize> {
    let mut inserted = 0;
    while let Some(row) = reader.next_row()? {
        if row.iter().all(String::is_empty) {
            continue;
        }
        table.insert(row)?;
        inserted += 1;
    }
    Ok(inserted)
}

fn unknown_table(name: &str) -> Rf2Error {
    Rf2Error::malformed_table(name, "no such table")
}

#[cfg(test)]
mod tests {
    use rf2_model::ComponentType;

    use super::*;

    const CONCEPTS: &str = "sct2_Concept_Delta_INT_20250131.txt";

    fn concept_table(lines: &[&str]) -> MemoryTableStore {
        let mut input = String::from("id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId\r\n");
        for line in lines {
            input.push_str(line);
            input.push_str("\r\n");
        }
        let mut store = MemoryTableStore::new();
        store
            .create_table(CONCEPTS, &mut input.as_bytes(), true)
            .unwrap();
        store
    }

    fn ids(rows: RowStream<'_>) -> Vec<String> {
        rows.map(|row| format!("{}@{}", row[0], row[1])).collect()
    }

    #[test]
    fn full_is_in_key_order() {
        let store = concept_table(&[
            "200\t20250131\t1\tm\tp",
            "100\t20250131\t0\tm\tp",
            "100\t20240731\t1\tm\tp",
        ]);
        assert_eq!(
            ids(store.select_full(CONCEPTS).unwrap()),
            vec!["100@20240731", "100@20250131", "200@20250131"]
        );
    }

    #[test]
    fn snapshot_takes_latest_state_up_to_date() {
        let store = concept_table(&[
            "100\t20240731\t1\tm\tp",
            "100\t20250131\t0\tm\tp",
            "200\t20250731\t1\tm\tp",
            "300\t\t1\tm\tp",
        ]);
        assert_eq!(
            ids(store.select_snapshot(CONCEPTS, "20250131", false).unwrap()),
            vec!["100@20250131", "300@"]
        );
        assert_eq!(
            ids(store.select_snapshot(CONCEPTS, "20250131", true).unwrap()),
            vec!["300@"]
        );
        assert_eq!(
            ids(store.select_snapshot(CONCEPTS, "20240731", true).unwrap()),
            vec!["100@20240731", "300@"]
        );
    }

    #[test]
    fn delta_is_exact_date() {
        let store = concept_table(&["100\t20240731\t1\tm\tp", "100\t20250131\t0\tm\tp"]);
        assert_eq!(
            ids(store.select_delta(CONCEPTS, "20250131").unwrap()),
            vec!["100@20250131"]
        );
        assert!(store.select_delta(CONCEPTS, "20990101").unwrap().next().is_none());
    }

    #[test]
    fn redefining_a_key_is_rejected() {
        let mut store = concept_table(&["100\t20240731\t1\tm\tp"]);
        let err = store
            .insert_or_merge(CONCEPTS, vec![
                ["100", "20240731", "0", "m", "p"].map(String::from).to_vec(),
            ])
            .unwrap_err();
        assert!(matches!(err, Rf2Error::DuplicateKey { .. }));
    }

    #[test]
    fn wrong_width_is_malformed() {
        let mut store = concept_table(&[]);
        let err = store
            .insert_or_merge(CONCEPTS, vec![["100", "20240731", "1"].map(String::from).to_vec()])
            .unwrap_err();
        assert!(matches!(err, Rf2Error::MalformedTable { .. }));
    }

    #[test]
    fn relationship_table_holds_uuids_and_sctids() {
        let name = "sct2_Relationship_Delta_INT_20250131.txt";
        let input = "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\t\
                     relationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId\r\n\
                     1001\t20250131\t1\tm\t10\t20\t0\t116680003\tc\tx\r\n\
                     e3e93161-b13b-5004-9f07-0e146c23aac2\t20250131\t1\tm\t11\t20\t0\t116680003\tc\tx\r\n";
        let mut store = MemoryTableStore::new();
        store
            .create_table(name, &mut input.as_bytes(), true)
            .unwrap();
        assert_eq!(
            ids(store.select_full(name).unwrap()),
            vec!["e3e93161-b13b-5004-9f07-0e146c23aac2@20250131", "1001@20250131"]
        );
    }

    #[test]
    fn empty_stream_is_malformed() {
        let mut store = MemoryTableStore::new();
        let err = store
            .create_table(CONCEPTS, &mut "".as_bytes(), true)
            .unwrap_err();
        assert!(matches!(err, Rf2Error::MalformedTable { .. }));
    }

    #[test]
    fn headerless_stream_uses_standard_columns() {
        let mut store = MemoryTableStore::new();
        let schema = store
            .create_table(CONCEPTS, &mut "100\t20240731\t1\tm\tp\r\n".as_bytes(), false)
            .unwrap();
        assert_eq!(schema.component_type, ComponentType::Concept);
        assert_eq!(schema.columns[4], "definitionStatusId");
        assert_eq!(store.row_count(CONCEPTS).unwrap(), 1);
    }

    #[test]
    fn append_discards_header() {
        let mut store = concept_table(&["100\t20250131\t1\tm\tp"]);
        let previous = "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId\r\n\
                        100\t20240731\t1\tm\tp\r\n";
        assert_eq!(store.append(CONCEPTS, &mut previous.as_bytes()).unwrap(), 1);
        assert_eq!(store.row_count(CONCEPTS).unwrap(), 2);
    }

    #[test]
    fn already_published_state_is_discarded() {
        let mut store = concept_table(&["100\t20250131\t1\tm\tp", "200\t20250131\t0\tm\tp"]);
        let previous = vec![
            ["100", "20240731", "1", "m", "p"].map(String::from).to_vec(),
            ["200", "20240731", "1", "m", "p"].map(String::from).to_vec(),
        ];
        let removed = store
            .discard_already_published(CONCEPTS, &previous, "20250131")
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ids(store.select_full(CONCEPTS).unwrap()), vec!["200@20250131"]);
    }
}
