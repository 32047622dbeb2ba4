//! CSV contact list parser.
//!
//! The header row is mandatory and must contain a column that resolves to
//! the email address. `name`, `tags` (comma-separated) and `source` are
//! recognised; any other column is kept as row metadata.

use std::collections::BTreeMap;

use snowball_core::error::AppError;
use snowball_core::result::AppResult;

/// Header names (lower-cased, trimmed) that resolve to the email column.
const EMAIL_HEADERS: [&str; 5] = ["email", "e-mail", "email address", "email_address", "mail"];

/// One data row of an uploaded contact list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRow {
    /// 1-based line number of the row in the upload (header is line 1).
    pub line: usize,
    /// Email cell as uploaded.
    pub email: String,
    /// Contact name.
    pub name: Option<String>,
    /// Tags split on commas.
    pub tags: Vec<String>,
    /// Per-row source override.
    pub source: Option<String>,
    /// Unrecognised columns, keyed by header.
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct Columns {
    email: usize,
    name: Option<usize>,
    tags: Option<usize>,
    source: Option<usize>,
    extra: Vec<(usize, String)>,
}

fn resolve_columns(headers: &::csv::StringRecord) -> AppResult<Columns> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
        .collect();

    let email = normalized
        .iter()
        .position(|h| EMAIL_HEADERS.contains(&h.as_str()))
        .ok_or_else(|| AppError::validation("CSV has no email column"))?;

    let mut columns = Columns {
        email,
        ..Columns::default()
    };
    for (index, header) in normalized.iter().enumerate() {
        if index == email {
            continue;
        }
        match header.as_str() {
            "name" if columns.name.is_none() => columns.name = Some(index),
            "tags" if columns.tags.is_none() => columns.tags = Some(index),
            "source" if columns.source.is_none() => columns.source = Some(index),
            "" => {}
            other => columns.extra.push((index, other.to_string())),
        }
    }
    Ok(columns)
}

fn cell(record: &::csv::StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse a CSV payload into contact rows.
///
/// Fails with a validation error when the payload has no header row, no
/// resolvable email column, or cannot be read as CSV. Ragged rows are
/// accepted; missing cells read as empty.
pub fn parse_contacts(payload: &str) -> AppResult<Vec<ContactRow>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .trim(::csv::Trim::None)
        .from_reader(payload.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::validation(format!("Malformed CSV header: {e}")))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::validation("CSV has no header row"));
    }
    let columns = resolve_columns(&headers)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| AppError::validation(format!("Malformed CSV: {e}")))?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);

        let tags = cell(&record, columns.tags)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let metadata = columns
            .extra
            .iter()
            .filter_map(|(i, header)| cell(&record, Some(*i)).map(|v| (header.clone(), v)))
            .collect();

        rows.push(ContactRow {
            line,
            email: record.get(columns.email).unwrap_or("").to_string(),
            name: cell(&record, columns.name),
            tags,
            source: cell(&record, columns.source),
            metadata,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use snowball_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_basic_rows() {
        let rows = parse_contacts("email,name\na@trusted.org,Alice\nbad-email,Bob\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].email, "a@trusted.org");
        assert_eq!(rows[0].name.as_deref(), Some("Alice"));
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_header_aliases_case_insensitive() {
        let rows = parse_contacts(" E-Mail ,Tags,Source,Company\nx@y.org,\"rust, news\",verified_user,Acme\n")
            .unwrap();
        assert_eq!(rows[0].email, "x@y.org");
        assert_eq!(rows[0].tags, vec!["rust".to_string(), "news".to_string()]);
        assert_eq!(rows[0].source.as_deref(), Some("verified_user"));
        assert_eq!(rows[0].metadata.get("company").map(String::as_str), Some("Acme"));
    }

    #[test]
    fn test_missing_email_column_is_validation_error() {
        let err = parse_contacts("name,phone\nAlice,123\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_empty_payload_is_validation_error() {
        let err = parse_contacts("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_ragged_rows_tolerated() {
        let rows = parse_contacts("name,email,tags\nAlice\nBob,b@x.org\n\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].email, "");
        assert_eq!(rows[1].email, "b@x.org");
        assert!(rows[1].tags.is_empty());
    }
}
