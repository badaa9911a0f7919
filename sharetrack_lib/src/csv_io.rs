//! Delimited text in and out.
//!
//! Writing uses one RFC 4180 rule everywhere: a field is quoted when it
//! contains a comma, a double quote or a line break, and embedded quotes are
//! doubled. Reading is deliberately simpler: lines are split on bare commas,
//! so quoted fields containing commas do not round-trip through import.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::types::CsvRow;

/// Column order of exported people.
pub const PEOPLE_COLUMNS: &[&str] = &["id", "email", "full_name", "created_at", "role"];

/// Column order of exported entries.
pub const ENTRY_COLUMNS: &[&str] = &[
    "id",
    "person_id",
    "user_id",
    "entry_date",
    "number_reached",
    "church_invite",
    "spiritual_conversation",
    "story_share",
    "gospel_presentation",
    "gospel_response",
    "number_response",
    "notes",
    "created_at",
];

/// Rows shown before an import is committed.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum CsvError {
    #[error("CSV has no header row")]
    MissingHeader,
    #[error("CSV write failed: {0}")]
    Write(#[from] csv::Error),
    #[error("CSV buffer error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Header row plus data rows keyed by header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

/// First rows of a file, shown for confirmation before import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
    /// Data rows in the whole file, not just the preview.
    pub total_rows: usize,
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn write_records<I>(header: &[&str], records: I) -> Result<String, CsvError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for record in records {
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(e.error().kind(), e.error().to_string()))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Render records as CSV text with the given columns, in order.
///
/// Missing or null fields render empty; nested values render as JSON.
pub fn to_csv<T: Serialize>(records: &[T], columns: &[&str]) -> Result<String, CsvError> {
    let mut lines = Vec::with_capacity(records.len());
    for record in records {
        let value = serde_json::to_value(record)?;
        let line = columns
            .iter()
            .map(|col| value.get(*col).map(render_value).unwrap_or_default())
            .collect();
        lines.push(line);
    }
    write_records(columns, lines)
}

/// Render string-keyed rows (e.g. failed import rows) under the given headers.
pub fn rows_to_csv(headers: &[String], rows: &[CsvRow]) -> Result<String, CsvError> {
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let lines = rows.iter().map(|row| {
        headers
            .iter()
            .map(|h| row.get(h).cloned().unwrap_or_default())
            .collect::<Vec<String>>()
    });
    write_records(&header_refs, lines)
}

// Trim, then drop one leading and one trailing double quote.
fn clean_field(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.to_string()
}

fn data_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').filter(|line| !line.trim().is_empty())
}

fn parse_line(headers: &[String], line: &str) -> CsvRow {
    let values: Vec<String> = line.split(',').map(clean_field).collect();
    let mut row = HashMap::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        row.insert(header.clone(), values.get(i).cloned().unwrap_or_default());
    }
    row
}

/// Parse CSV text into header-keyed rows.
///
/// Blank lines are skipped. Short rows get empty strings for the missing
/// trailing fields; extra values are ignored.
pub fn parse_csv(text: &str) -> Result<ParsedCsv, CsvError> {
    let mut lines = data_lines(text);
    let header_line = lines.next().ok_or(CsvError::MissingHeader)?;
    let headers: Vec<String> = header_line.split(',').map(clean_field).collect();
    let rows = lines.map(|line| parse_line(&headers, line)).collect();
    Ok(ParsedCsv { headers, rows })
}

/// Parse only the first `limit` data rows, but count them all.
pub fn preview(text: &str, limit: usize) -> Result<CsvPreview, CsvError> {
    let mut lines = data_lines(text);
    let header_line = lines.next().ok_or(CsvError::MissingHeader)?;
    let headers: Vec<String> = header_line.split(',').map(clean_field).collect();

    let mut rows = Vec::new();
    let mut total_rows = 0;
    for line in lines {
        if rows.len() < limit {
            rows.push(parse_line(&headers, line));
        }
        total_rows += 1;
    }
    Ok(CsvPreview {
        headers,
        rows,
        total_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Person, Role};

    fn person(id: &str, email: &str, name: &str) -> Person {
        Person {
            id: id.into(),
            email: email.into(),
            full_name: name.into(),
            created_at: "2024-01-01T00:00:00.000Z".into(),
            role: Role::User,
        }
    }

    #[test]
    fn people_export_quotes_only_when_needed() {
        let people = vec![
            person("p1", "ann@example.com", "Ann Lee"),
            person("p2", "bob@example.com", "Smith, Bob \"B\""),
        ];
        let text = to_csv(&people, PEOPLE_COLUMNS).unwrap();
        insta::assert_snapshot!(text, @r###"
        id,email,full_name,created_at,role
        p1,ann@example.com,Ann Lee,2024-01-01T00:00:00.000Z,user
        p2,bob@example.com,"Smith, Bob ""B""",2024-01-01T00:00:00.000Z,user
        "###);
    }

    #[test]
    fn nulls_render_empty_and_unknown_columns_are_blank() {
        let rows = vec![serde_json::json!({"a": null, "b": true, "c": 3, "d": {"x": 1}})];
        let text = to_csv(&rows, &["a", "b", "c", "d", "missing"]).unwrap();
        insta::assert_snapshot!(text, @r###"
        a,b,c,d,missing
        ,true,3,"{""x"":1}",
        "###);
    }

    #[test]
    fn newline_in_field_is_quoted() {
        let rows = vec![serde_json::json!({"notes": "line one\nline two"})];
        let text = to_csv(&rows, &["notes"]).unwrap();
        assert_eq!(text, "notes\n\"line one\nline two\"");
    }

    #[test]
    fn empty_record_list_is_header_only() {
        let people: Vec<Person> = Vec::new();
        assert_eq!(
            to_csv(&people, PEOPLE_COLUMNS).unwrap(),
            "id,email,full_name,created_at,role"
        );
    }

    #[test]
    fn parse_strips_quotes_and_pads_short_rows() {
        let text = "\"email\", full_name ,notes\r\n\na@b.com,\"Ann\"\n\nb@c.com,Bob,hi,extra\n";
        let parsed = parse_csv(text).unwrap();
        assert_eq!(parsed.headers, vec!["email", "full_name", "notes"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0]["full_name"], "Ann");
        assert_eq!(parsed.rows[0]["notes"], "");
        assert_eq!(parsed.rows[1]["notes"], "hi");
        assert_eq!(parsed.rows[1].len(), 3);
    }

    #[test]
    fn parse_empty_text_has_no_header() {
        assert!(matches!(parse_csv(""), Err(CsvError::MissingHeader)));
        assert!(matches!(parse_csv("\n  \n"), Err(CsvError::MissingHeader)));
    }

    #[test]
    fn header_only_has_zero_rows() {
        let p = preview("email,full_name\n", DEFAULT_PREVIEW_ROWS).unwrap();
        assert_eq!(p.total_rows, 0);
        assert!(p.rows.is_empty());
    }

    #[test]
    fn preview_caps_rows_but_counts_all() {
        let mut text = String::from("email,full_name");
        for i in 0..25 {
            text.push_str(&format!("\nu{}@example.com,User {}", i, i));
        }
        let p = preview(&text, DEFAULT_PREVIEW_ROWS).unwrap();
        assert_eq!(p.rows.len(), 10);
        assert_eq!(p.total_rows, 25);
        assert_eq!(p.rows[9]["email"], "u9@example.com");
    }

    #[test]
    fn failed_rows_keep_header_order() {
        let headers = vec!["email".to_string(), "entry_date".to_string()];
        let rows = vec![CsvRow::from([
            ("entry_date".to_string(), "2024-01-05".to_string()),
            ("email".to_string(), "ghost@nowhere.com".to_string()),
        ])];
        assert_eq!(
            rows_to_csv(&headers, &rows).unwrap(),
            "email,entry_date\nghost@nowhere.com,2024-01-05"
        );
    }
}
