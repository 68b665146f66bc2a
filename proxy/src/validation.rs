//! Sanitization of the query parameters that end up in the upstream URL.
//!
//! Every field is trimmed and rejected if it contains any of `< > ' " &`.
//! The spreadsheet ID and sheet name each become a whole URL path segment on
//! their own, so `.` and `..` are rejected there as well. Nothing else is
//! checked: a range such as `ZZ` is accepted here and left
//! for the upstream service to reject.

use std::fmt;

const FORBIDDEN_CHARS: &[char] = &['<', '>', '\'', '"', '&'];

// URL normalization would drop or resolve these instead of sending them.
const DOT_SEGMENTS: &[&str] = &[".", ".."];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SpreadsheetId,
    SheetName,
    Range,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::SpreadsheetId => "Spreadsheet ID",
            Field::SheetName => "Sheet name",
            Field::Range => "Range",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("{0} cannot be empty.")]
    Empty(Field),
    #[error("{0} contains invalid characters.")]
    ForbiddenCharacters(Field),
}

impl InvalidInput {
    pub fn field(&self) -> Field {
        match self {
            InvalidInput::Empty(field) | InvalidInput::ForbiddenCharacters(field) => *field,
        }
    }
}

pub fn validate_spreadsheet_id(raw: &str) -> Result<String, InvalidInput> {
    validate_required(raw, Field::SpreadsheetId)
}

/// Sheet names may contain spaces; only the forbidden characters are rejected.
pub fn validate_sheet_name(raw: &str) -> Result<String, InvalidInput> {
    validate_required(raw, Field::SheetName)
}

/// An absent or blank range means "the whole sheet" and is not an error.
pub fn validate_range(raw: Option<&str>) -> Result<Option<String>, InvalidInput> {
    let Some(trimmed) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    check_characters(trimmed, Field::Range)?;
    Ok(Some(trimmed.to_string()))
}

fn validate_required(raw: &str, field: Field) -> Result<String, InvalidInput> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidInput::Empty(field));
    }
    check_characters(trimmed, field)?;
    if DOT_SEGMENTS.contains(&trimmed) {
        return Err(InvalidInput::ForbiddenCharacters(field));
    }
    Ok(trimmed.to_string())
}

fn check_characters(value: &str, field: Field) -> Result<(), InvalidInput> {
    if value.contains(FORBIDDEN_CHARS) {
        return Err(InvalidInput::ForbiddenCharacters(field));
    }
    Ok(())
}
