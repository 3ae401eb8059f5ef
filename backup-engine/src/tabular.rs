//! Tabular codec: serializes row sets to and from a delimited text format.
//!
//! Layout: optional `#`-prefixed comment lines, one header line (field names in
//! the order of the first row), one line per record. Fields containing the
//! delimiter, a quote, or a newline are quote-wrapped with interior quotes
//! doubled; null values encode as an empty field; object and array values are
//! rendered as JSON and escaped like any other field. Decoding is line-based
//! and joins physical lines only while inside a quoted multi-line field.

use crate::error::{EngineError, Result};
use crate::types::Record;
use serde_json::Value;

const DELIMITER: char = ',';
const QUOTE: char = '"';
const COMMENT: char = '#';

/// Incremental encoder. Rows can be appended page by page so a large
/// collection never has to be materialized in full before encoding.
#[derive(Debug, Default)]
pub struct TabularWriter {
    out: String,
    fields: Vec<String>,
    rows: u64,
}

impl TabularWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `#`-prefixed metadata line. Only valid before the first row;
    /// later calls are ignored.
    pub fn push_comment(&mut self, text: &str) {
        if !self.fields.is_empty() {
            return;
        }
        self.out.push(COMMENT);
        self.out.push(' ');
        self.out.push_str(&text.replace(['\n', '\r'], " "));
        self.out.push('\n');
    }

    /// Append one record. The first record fixes the header field order;
    /// fields absent from a later record encode as empty.
    pub fn push(&mut self, row: &Record) {
        if self.fields.is_empty() {
            self.fields = row.keys().cloned().collect();
            if self.fields.is_empty() {
                return;
            }
            let header: Vec<String> = self.fields.iter().map(|name| render_text(name)).collect();
            self.out.push_str(&header.join(","));
            self.out.push('\n');
        }
        let line: Vec<String> = self
            .fields
            .iter()
            .map(|name| row.get(name).map(render_value).unwrap_or_default())
            .collect();
        self.out.push_str(&line.join(","));
        self.out.push('\n');
        self.rows += 1;
    }

    pub fn row_count(&self) -> u64 {
        self.rows
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Encode a full row set in one call.
pub fn encode(rows: &[Record]) -> String {
    let mut writer = TabularWriter::new();
    for row in rows {
        writer.push(row);
    }
    writer.finish()
}

/// True if the payload carries a header line (i.e. at least one non-comment,
/// non-blank line). Error snapshots render as comment-only payloads.
pub fn has_header(text: &str) -> bool {
    text.lines()
        .any(|line| !line.trim_end_matches('\r').is_empty() && !line.starts_with(COMMENT))
}

/// Decode a payload back into records.
///
/// When `expected_fields` is given, the header must carry exactly those field
/// names. Malformed input errors name the offending line; decoding never
/// silently truncates.
pub fn decode(text: &str, expected_fields: Option<&[&str]>) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut header: Option<Vec<String>> = None;
    // Buffered logical line and the physical line it started on, while a
    // quoted field spans lines.
    let mut pending: Option<(String, usize)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);

        let (buffer, start_line) = match pending.take() {
            Some((mut buf, start)) => {
                buf.push('\n');
                buf.push_str(raw);
                (buf, start)
            }
            None => {
                if raw.is_empty() {
                    continue;
                }
                if header.is_none() && raw.starts_with(COMMENT) {
                    continue;
                }
                (raw.to_string(), line_no)
            }
        };

        if buffer.matches(QUOTE).count() % 2 == 1 {
            pending = Some((buffer, start_line));
            continue;
        }

        let fields = split_fields(&buffer, start_line)?;
        match &header {
            None => {
                let names: Vec<String> = fields.into_iter().map(|f| f.text).collect();
                if let Some(expected) = expected_fields {
                    check_header(&names, expected, start_line)?;
                }
                header = Some(names);
            }
            Some(names) => {
                if fields.len() != names.len() {
                    return Err(EngineError::TabularDecode {
                        line: start_line,
                        message: format!(
                            "expected {} fields per header, found {}",
                            names.len(),
                            fields.len()
                        ),
                    });
                }
                let mut record = Record::new();
                for (name, field) in names.iter().zip(fields) {
                    record.insert(name.clone(), parse_value(&field));
                }
                records.push(record);
            }
        }
    }

    if let Some((_, start)) = pending {
        return Err(EngineError::TabularDecode {
            line: start,
            message: "unbalanced quote in field starting here".to_string(),
        });
    }

    Ok(records)
}

fn check_header(names: &[String], expected: &[&str], line: usize) -> Result<()> {
    if names.len() != expected.len() {
        return Err(EngineError::TabularDecode {
            line,
            message: format!(
                "header carries {} fields, expected {}",
                names.len(),
                expected.len()
            ),
        });
    }
    for want in expected {
        if !names.iter().any(|n| n == want) {
            return Err(EngineError::TabularDecode {
                line,
                message: format!("header is missing expected field '{want}'"),
            });
        }
    }
    Ok(())
}

struct Field {
    text: String,
    quoted: bool,
}

fn split_fields(line: &str, line_no: usize) -> Result<Vec<Field>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            QUOTE if current.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            QUOTE => {
                return Err(EngineError::TabularDecode {
                    line: line_no,
                    message: "unexpected quote inside unquoted field".to_string(),
                });
            }
            DELIMITER => {
                fields.push(Field {
                    text: std::mem::take(&mut current),
                    quoted,
                });
                quoted = false;
            }
            _ if quoted => {
                return Err(EngineError::TabularDecode {
                    line: line_no,
                    message: "unexpected data after closing quote".to_string(),
                });
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(EngineError::TabularDecode {
            line: line_no,
            message: "unbalanced quote in field".to_string(),
        });
    }

    fields.push(Field { text: current, quoted });
    Ok(fields)
}

fn parse_value(field: &Field) -> Value {
    if !field.quoted && field.text.is_empty() {
        return Value::Null;
    }
    let text = &field.text;
    let first = text.trim_start().chars().next();
    // Structured values were rendered as JSON before escaping; this is the
    // one field type decoded back into a nested value.
    if matches!(first, Some('{') | Some('[')) {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            if value.is_object() || value.is_array() {
                return value;
            }
        }
    }
    if !field.quoted {
        if text == "true" {
            return Value::Bool(true);
        }
        if text == "false" {
            return Value::Bool(false);
        }
        if matches!(first, Some('0'..='9') | Some('-')) {
            if let Ok(Value::Number(n)) = serde_json::from_str::<Value>(text) {
                return Value::Number(n);
            }
        }
    }
    Value::String(text.clone())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => render_text(s),
        Value::Object(_) | Value::Array(_) => escape(&value.to_string()),
        other => other.to_string(),
    }
}

/// Render a string field. Strings that would decode as another scalar type
/// (empty, booleans, numbers) are force-quoted so they round-trip as strings.
fn render_text(s: &str) -> String {
    if s.is_empty() || s == "true" || s == "false" || s.parse::<f64>().is_ok() {
        let mut out = String::with_capacity(s.len() + 2);
        out.push(QUOTE);
        for c in s.chars() {
            if c == QUOTE {
                out.push(QUOTE);
            }
            out.push(c);
        }
        out.push(QUOTE);
        return out;
    }
    escape(s)
}

fn escape(raw: &str) -> String {
    let needs_quoting = raw.contains(DELIMITER)
        || raw.contains(QUOTE)
        || raw.contains('\n')
        || raw.contains('\r');
    if !needs_quoting {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len() + 2);
    out.push(QUOTE);
    for c in raw.chars() {
        if c == QUOTE {
            out.push(QUOTE);
        }
        out.push(c);
    }
    out.push(QUOTE);
    out
}
