//! Row-level transformations.
//!
//! A [`LineTransformation`] rewrites the columns of one row in place. Rules
//! are plain values: a conditional holds its branches, and branches may be
//! conditionals again, so nested rules need no extra machinery.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rf2_model::row::is_blank;
use rf2_model::{Result, Rf2Error, Row};

use crate::ids::{RelationshipFileType, member_uuid, relationship_uuid};

/// First column of a refset row that carries member content.
const MEMBER_CONTENT_START: usize = 3;

#[derive(Debug, Clone)]
pub enum LineTransformation {
    /// Overwrite one column with a constant.
    ReplaceValue {
        column: usize,
        value: String,
        /// Only write when the current value is empty or `null`.
        only_if_empty: bool,
    },
    /// Evaluate a condition and delegate to one of two branches.
    Conditional(Box<ConditionalTransformation>),
    /// Fill an empty relationship id with its repeatable UUID.
    RelationshipUuid { file_type: RelationshipFileType },
    /// Fill an empty refset member id with a UUID derived from its content.
    MemberUuid,
    /// Rewrite a column through a lookup table; unknown values stay.
    ReplaceFromMap {
        column: usize,
        map: Arc<HashMap<String, String>>,
    },
}

impl LineTransformation {
    pub fn replace_value(column: usize, value: impl Into<String>) -> Self {
        Self::ReplaceValue {
            column,
            value: value.into(),
            only_if_empty: false,
        }
    }

    pub fn replace_if_empty(column: usize, value: impl Into<String>) -> Self {
        Self::ReplaceValue {
            column,
            value: value.into(),
            only_if_empty: true,
        }
    }

    pub fn conditional(conditional: ConditionalTransformation) -> Self {
        Self::Conditional(Box::new(conditional))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReplaceValue { .. } => "replace-value",
            Self::Conditional(_) => "conditional",
            Self::RelationshipUuid { .. } => "relationship-uuid",
            Self::MemberUuid => "member-uuid",
            Self::ReplaceFromMap { .. } => "replace-from-map",
        }
    }

    pub fn apply(&self, row: &mut Row) -> Result<()> {
        match self {
            Self::ReplaceValue {
                column,
                value,
                only_if_empty,
            } => {
                let cell = column_mut(row, *column)?;
                if !*only_if_empty || is_blank(cell) {
                    cell.clone_from(value);
                }
                Ok(())
            }
            Self::Conditional(conditional) => conditional.apply(row),
            Self::RelationshipUuid { file_type } => {
                if id_is_blank(row)? {
                    let id = relationship_uuid(row, *file_type)?;
                    row[0] = id.to_string();
                }
                Ok(())
            }
            Self::MemberUuid => {
                if id_is_blank(row)? {
                    if row.len() <= MEMBER_CONTENT_START {
                        return Err(Rf2Error::transformation(format!(
                            "refset row has {} columns, no member content to derive an id from",
                            row.len()
                        )));
                    }
                    let id = member_uuid(&row[MEMBER_CONTENT_START..], &row[1]);
                    row[0] = id.to_string();
                }
                Ok(())
            }
            Self::ReplaceFromMap { column, map } => {
                let cell = column_mut(row, *column)?;
                if let Some(replacement) = map.get(cell.as_str()) {
                    cell.clone_from(replacement);
                }
                Ok(())
            }
        }
    }
}

/// Predicate over one or more columns of a row.
#[derive(Debug, Clone)]
pub enum Condition {
    ColumnEquals { column: usize, value: String },
    ColumnIn {
        column: usize,
        values: Arc<BTreeSet<String>>,
    },
    All(Vec<Condition>),
}

impl Condition {
    pub fn column_equals(column: usize, value: impl Into<String>) -> Self {
        Self::ColumnEquals {
            column,
            value: value.into(),
        }
    }

    pub fn column_in(column: usize, values: Arc<BTreeSet<String>>) -> Self {
        Self::ColumnIn { column, values }
    }

    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            first => Self::All(vec![first, other]),
        }
    }

    pub fn matches(&self, row: &[String]) -> Result<bool> {
        match self {
            Self::ColumnEquals { column, value } => Ok(column_ref(row, *column)? == value),
            Self::ColumnIn { column, values } => Ok(values.contains(column_ref(row, *column)?)),
            Self::All(conditions) => {
                for condition in conditions {
                    if !condition.matches(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConditionalTransformation {
    condition: Condition,
    then: LineTransformation,
    otherwise: Option<LineTransformation>,
}

impl ConditionalTransformation {
    pub fn new(condition: Condition, then: LineTransformation) -> Self {
        Self {
            condition,
            then,
            otherwise: None,
        }
    }

    pub fn otherwise(mut self, otherwise: LineTransformation) -> Self {
        self.otherwise = Some(otherwise);
        self
    }

    pub fn apply(&self, row: &mut Row) -> Result<()> {
        if self.condition.matches(row)? {
            self.then.apply(row)
        } else if let Some(otherwise) = &self.otherwise {
            otherwise.apply(row)
        } else {
            Ok(())
        }
    }
}

fn id_is_blank(row: &[String]) -> Result<bool> {
    Ok(is_blank(column_ref(row, 0)?))
}

fn column_ref(row: &[String], column: usize) -> Result<&str> {
    row.get(column)
        .map(String::as_str)
        .ok_or_else(|| out_of_range(column, row.len()))
}

fn column_mut(row: &mut Row, column: usize) -> Result<&mut String> {
    let width = row.len();
    row.get_mut(column)
        .ok_or_else(|| out_of_range(column, width))
}

fn out_of_range(column: usize, width: usize) -> Rf2Error {
    Rf2Error::transformation(format!(
        "column index {column} out of range for row with {width} columns"
    ))
}
