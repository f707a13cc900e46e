//! Helpers over raw RF2 rows.
//!
//! A row is the ordered list of its column values, exactly as read from the
//! tab-separated file.

use crate::constants::{BOOLEAN_TRUE, COLUMN_SEPARATOR, NULL_STRING};

pub type Row = Vec<String>;

/// Split one line into columns, keeping empty trailing columns.
pub fn split_line(line: &str) -> Row {
    line.trim_end_matches(['\r', '\n'])
        .split(COLUMN_SEPARATOR)
        .map(str::to_string)
        .collect()
}

pub fn join_row(row: &[String]) -> String {
    row.join(COLUMN_SEPARATOR)
}

/// True for the RF2 spellings of "no value".
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == NULL_STRING
}

pub fn is_active(row: &[String]) -> bool {
    row.get(2).is_some_and(|value| value == BOOLEAN_TRUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_trailing_empty_columns() {
        let row = split_line("1\t20140731\t1\t\r\n");
        assert_eq!(row, vec!["1", "20140731", "1", ""]);
        assert_eq!(join_row(&row), "1\t20140731\t1\t");
    }

    #[test]
    fn blank_covers_null_marker() {
        assert!(is_blank(""));
        assert!(is_blank("null"));
        assert!(!is_blank("0"));
    }
}
