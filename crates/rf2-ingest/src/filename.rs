//! RF2 file naming.
//!
//! `<fileType>_<contentType>_<contentSubType>_<namespace>_<versionDate>.txt`,
//! e.g. `rel2_cRefset_AssociationDelta_INT_20250131.txt`. Beta releases put
//! an `x` in front of the file type.

use std::fmt;

use rf2_model::ReleaseKind;
use rf2_model::constants::{
    BETA_RELEASE_PREFIX, DER2, FILE_NAME_SEPARATOR, INPUT_FILE_PREFIX, SCT2, TXT_FILE_EXTENSION,
};
use serde::Serialize;

use crate::error::{IngestError, Result};

const REFSET: &str = "Refset";
const OWL_EXPRESSION: &str = "OWLExpression";

/// Component family named by the content type of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentKind {
    Concept,
    Description,
    TextDefinition,
    Relationship,
    StatedRelationship,
    RelationshipConcreteValues,
    Identifier,
    /// Refset; the content type prefix (`c`, `i`, `s` per field) gives the
    /// number of columns after referencedComponentId.
    Refset { extra_columns: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rf2FileName {
    pub beta: bool,
    pub file_type: String,
    pub content_type: String,
    pub content_sub_type: String,
    pub namespace: String,
    pub version_date: String,
}

impl Rf2FileName {
    pub fn parse(name: &str) -> Result<Self> {
        let stem = name
            .strip_suffix(TXT_FILE_EXTENSION)
            .ok_or_else(|| IngestError::unrecognised(name, "expected a .txt file"))?;
        let parts: Vec<&str> = stem.split(FILE_NAME_SEPARATOR).collect();
        if parts.len() != 5 {
            return Err(IngestError::unrecognised(
                name,
                format!(
                    "file name contains {} underscores, expected 4",
                    parts.len().saturating_sub(1)
                ),
            ));
        }
        let (beta, file_type) = match parts[0].strip_prefix(BETA_RELEASE_PREFIX) {
            Some(rest) if is_known_file_type(rest) => (true, rest),
            _ => (false, parts[0]),
        };
        if !is_known_file_type(file_type) {
            return Err(IngestError::unrecognised(
                name,
                format!("file type '{file_type}' is not supported"),
            ));
        }
        if parts[1..].iter().any(|part| part.is_empty()) {
            return Err(IngestError::unrecognised(name, "empty name segment"));
        }
        Ok(Self {
            beta,
            file_type: file_type.to_string(),
            content_type: parts[1].to_string(),
            content_sub_type: parts[2].to_string(),
            namespace: parts[3].to_string(),
            version_date: parts[4].to_string(),
        })
    }

    pub fn content_kind(&self) -> Option<ContentKind> {
        let kind = match self.content_type.as_str() {
            "Concept" => ContentKind::Concept,
            "Description" => ContentKind::Description,
            "TextDefinition" => ContentKind::TextDefinition,
            "Relationship" => ContentKind::Relationship,
            "StatedRelationship" => ContentKind::StatedRelationship,
            "RelationshipConcreteValues" => ContentKind::RelationshipConcreteValues,
            "Identifier" => ContentKind::Identifier,
            other => {
                let pattern = other.strip_suffix(REFSET)?;
                if !pattern.bytes().all(|b| matches!(b, b'c' | b'i' | b's')) {
                    return None;
                }
                ContentKind::Refset {
                    extra_columns: pattern.len(),
                }
            }
        };
        Some(kind)
    }

    pub fn is_refset(&self) -> bool {
        self.content_type.ends_with(REFSET)
    }

    /// Which view the file holds, from its content sub type.
    pub fn release_kind(&self) -> Option<ReleaseKind> {
        ReleaseKind::ALL.into_iter().find(|kind| {
            let token = kind.as_str();
            self.content_sub_type.ends_with(token)
                || self.content_sub_type.contains(&format!("{token}-"))
        })
    }

    /// Name of the released file of the given kind.
    ///
    /// Input `rel2` files become `der2` for refsets (OWL expression refsets
    /// excepted) and `sct2` for everything else.
    pub fn derive(&self, kind: ReleaseKind) -> Rf2FileName {
        let file_type = if self.file_type == INPUT_FILE_PREFIX {
            if self.is_refset() && !self.content_sub_type.starts_with(OWL_EXPRESSION) {
                DER2.to_string()
            } else {
                SCT2.to_string()
            }
        } else {
            self.file_type.clone()
        };
        let content_sub_type = match self.release_kind() {
            Some(current) => replace_kind(&self.content_sub_type, current, kind),
            None => self.content_sub_type.clone(),
        };
        Rf2FileName {
            file_type,
            content_sub_type,
            ..self.clone()
        }
    }

    /// Same name without the beta marker, as found in previous releases.
    pub fn without_beta(&self) -> Rf2FileName {
        Rf2FileName {
            beta: false,
            ..self.clone()
        }
    }

    /// Everything but the version date; stable across releases.
    pub fn release_independent_stem(&self) -> String {
        let sep = FILE_NAME_SEPARATOR;
        format!(
            "{}{}{sep}{}{sep}{}{sep}{}",
            if self.beta { BETA_RELEASE_PREFIX } else { "" },
            self.file_type,
            self.content_type,
            self.content_sub_type,
            self.namespace
        )
    }
}

impl fmt::Display for Rf2FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{FILE_NAME_SEPARATOR}{}{TXT_FILE_EXTENSION}",
            self.release_independent_stem(),
            self.version_date
        )
    }
}

fn is_known_file_type(file_type: &str) -> bool {
    matches!(file_type, INPUT_FILE_PREFIX | SCT2 | DER2)
}

/// Only the sub type's trailing kind is replaced, so refset names that happen
/// to contain "Delta" keep it.
fn replace_kind(sub_type: &str, from: ReleaseKind, to: ReleaseKind) -> String {
    let from = from.as_str();
    let to = to.as_str();
    if let Some(prefix) = sub_type.strip_suffix(from) {
        return format!("{prefix}{to}");
    }
    match sub_type.rfind(&format!("{from}-")) {
        Some(pos) => format!("{}{to}{}", &sub_type[..pos], &sub_type[pos + from.len()..]),
        None => sub_type.to_string(),
    }
}
