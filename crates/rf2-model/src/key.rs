#![deny(unsafe_code)]

//! Composite table keys.
//!
//! A key is the pair (identifier, effectiveTime) taken from the first two
//! columns of an RF2 row. Component tables use numeric SCTIDs, reference set
//! tables use UUID member ids. Both kinds can live in one ordered map, so the
//! enum defines a total order across variants: opaque keys always sort before
//! numeric keys. That tie-break is kept as found in earlier releases of the
//! build tooling.

use std::cmp::Ordering;
use std::fmt;

use uuid::Uuid;

use crate::constants::COLUMN_SEPARATOR;
use crate::error::{Result, Rf2Error};
use crate::schema::IdType;

/// Numeric SCTID key, ordered by identifier then effectiveTime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumericKey {
    id: u64,
    effective_time: Option<String>,
}

impl NumericKey {
    pub fn new(id: u64, effective_time: Option<String>) -> Self {
        Self { id, effective_time }
    }

    /// Parse an SCTID column. Only plain ASCII digits are accepted.
    pub fn parse(id: &str, effective_time: &str) -> Result<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Rf2Error::MalformedKey {
                value: id.to_string(),
                reason: "identifier is not a non-negative integer",
            });
        }
        let id = trimmed.parse::<u64>().map_err(|_| Rf2Error::MalformedKey {
            value: id.to_string(),
            reason: "identifier does not fit in 64 bits",
        })?;
        Ok(Self::new(id, normalize_effective_time(effective_time)))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn effective_time(&self) -> Option<&str> {
        self.effective_time.as_deref()
    }
}

/// UUID key, ordered by the UUID's natural byte order then effectiveTime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpaqueKey {
    id: Uuid,
    effective_time: Option<String>,
}

impl OpaqueKey {
    pub fn new(id: Uuid, effective_time: Option<String>) -> Self {
        Self { id, effective_time }
    }

    pub fn parse(id: &str, effective_time: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(id.trim()).map_err(|_| Rf2Error::MalformedKey {
            value: id.to_string(),
            reason: "identifier is not a valid UUID",
        })?;
        Ok(Self::new(uuid, normalize_effective_time(effective_time)))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn effective_time(&self) -> Option<&str> {
        self.effective_time.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Opaque(OpaqueKey),
    Numeric(NumericKey),
}

impl Key {
    /// Build a key from the identifier and effectiveTime columns of a row.
    pub fn from_columns(id_type: IdType, id: &str, effective_time: &str) -> Result<Self> {
        match id_type {
            IdType::Sctid => NumericKey::parse(id, effective_time).map(Key::Numeric),
            IdType::Uuid => OpaqueKey::parse(id, effective_time).map(Key::Opaque),
            IdType::SctidOrUuid => match NumericKey::parse(id, effective_time) {
                Ok(key) => Ok(Key::Numeric(key)),
                Err(_) => OpaqueKey::parse(id, effective_time).map(Key::Opaque),
            },
        }
    }

    /// Parse the output of [`Key::format`].
    pub fn parse(id_type: IdType, formatted: &str) -> Result<Self> {
        let (id, effective_time) = formatted
            .split_once(COLUMN_SEPARATOR)
            .unwrap_or((formatted, ""));
        Self::from_columns(id_type, id, effective_time)
    }

    /// Render the key as its two leading RF2 columns.
    pub fn format(&self) -> String {
        format!(
            "{}{COLUMN_SEPARATOR}{}",
            self.id_string(),
            self.effective_time().unwrap_or("")
        )
    }

    pub fn id_string(&self) -> String {
        match self {
            Key::Numeric(key) => key.id.to_string(),
            Key::Opaque(key) => key.id.to_string(),
        }
    }

    pub fn effective_time(&self) -> Option<&str> {
        match self {
            Key::Numeric(key) => key.effective_time(),
            Key::Opaque(key) => key.effective_time(),
        }
    }

    /// True when both keys name the same component, whatever the version.
    pub fn same_component(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Numeric(a), Key::Numeric(b)) => a.id == b.id,
            (Key::Opaque(a), Key::Opaque(b)) => a.id == b.id,
            _ => false,
        }
    }

    pub fn id_type(&self) -> IdType {
        match self {
            Key::Numeric(_) => IdType::Sctid,
            Key::Opaque(_) => IdType::Uuid,
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Numeric(a), Key::Numeric(b)) => a.cmp(b),
            (Key::Opaque(a), Key::Opaque(b)) => a.cmp(b),
            // Cross-variant: opaque before numeric.
            (Key::Opaque(_), Key::Numeric(_)) => Ordering::Less,
            (Key::Numeric(_), Key::Opaque(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.id_string(),
            self.effective_time().unwrap_or("-")
        )
    }
}

fn normalize_effective_time(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_orders_by_id_then_effective_time() {
        let a = Key::from_columns(IdType::Sctid, "100", "20140731").unwrap();
        let b = Key::from_columns(IdType::Sctid, "100", "20150131").unwrap();
        let c = Key::from_columns(IdType::Sctid, "99", "20990101").unwrap();
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn numeric_compares_as_integers_not_text() {
        let small = Key::from_columns(IdType::Sctid, "900", "20140731").unwrap();
        let large = Key::from_columns(IdType::Sctid, "1000", "20140731").unwrap();
        assert!(small < large);
    }

    #[test]
    fn opaque_sorts_before_numeric() {
        let opaque = Key::from_columns(
            IdType::Uuid,
            "ffffffff-ffff-5fff-bfff-ffffffffffff",
            "20990101",
        )
        .unwrap();
        let numeric = Key::from_columns(IdType::Sctid, "0", "19000101").unwrap();
        assert!(opaque < numeric);
        assert!(numeric > opaque);
    }

    #[test]
    fn relationship_ids_accept_either_kind() {
        let sctid = Key::from_columns(IdType::SctidOrUuid, "1001", "20250131").unwrap();
        let uuid = Key::from_columns(
            IdType::SctidOrUuid,
            "e3e93161-b13b-5004-9f07-0e146c23aac2",
            "20250131",
        )
        .unwrap();
        assert_eq!(sctid.id_type(), IdType::Sctid);
        assert_eq!(uuid.id_type(), IdType::Uuid);
        assert!(uuid < sctid);
        assert!(Key::from_columns(IdType::SctidOrUuid, "not-an-id", "").is_err());
    }

    #[test]
    fn absent_effective_times_are_equal() {
        let a = Key::from_columns(IdType::Sctid, "123", "").unwrap();
        let b = Key::from_columns(IdType::Sctid, "123", "  ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.effective_time(), None);
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!(matches!(
            Key::from_columns(IdType::Sctid, "-5", "20140731"),
            Err(Rf2Error::MalformedKey { .. })
        ));
        assert!(matches!(
            Key::from_columns(IdType::Sctid, "null", "20140731"),
            Err(Rf2Error::MalformedKey { .. })
        ));
        assert!(matches!(
            Key::from_columns(IdType::Uuid, "not-a-uuid", "20140731"),
            Err(Rf2Error::MalformedKey { .. })
        ));
    }

    #[test]
    fn same_component_ignores_effective_time() {
        let a = Key::from_columns(IdType::Sctid, "42", "20140131").unwrap();
        let b = Key::from_columns(IdType::Sctid, "42", "20140731").unwrap();
        assert!(a.same_component(&b));
        assert_ne!(a, b);
    }
}
