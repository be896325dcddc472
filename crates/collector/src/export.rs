//! Export — serialize a record list to text, JSON, CSV, or HTML.
//!
//! All four operate on a caller-supplied, usually already-filtered list
//! and never re-filter on their own; passing an explicit filter narrows
//! the list first.

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::filter::CompiledFilter;
use crate::parser::model::LogRecord;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Plain text: one `[timestamp] [name] [LEVEL] message` line per record.
pub fn to_text(records: &[LogRecord], filter: Option<&CompiledFilter>) -> String {
    let records = narrow(records, filter);
    let mut out = String::new();
    for record in records.iter() {
        out.push_str(&format!(
            "[{}] [{}] [{}] {}\n",
            format_timestamp(&record.timestamp),
            record.source_name,
            record.level.as_str().to_uppercase(),
            record.message,
        ));
    }
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument<'a> {
    exported_at: DateTime<Utc>,
    total_entries: usize,
    sources: Vec<&'a str>,
    entries: &'a [LogRecord],
}

/// JSON: metadata-wrapped object with `exportedAt`, `totalEntries`,
/// distinct source names (first-seen order), and the full records.
pub fn to_json(records: &[LogRecord], filter: Option<&CompiledFilter>) -> Result<String, ExportError> {
    let records = narrow(records, filter);

    let mut sources: Vec<&str> = Vec::new();
    for record in records.iter() {
        if !sources.contains(&record.source_name.as_str()) {
            sources.push(&record.source_name);
        }
    }

    let document = JsonDocument {
        exported_at: Utc::now(),
        total_entries: records.len(),
        sources,
        entries: &records,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// CSV with RFC-4180 quoting.
pub fn to_csv(records: &[LogRecord], filter: Option<&CompiledFilter>) -> String {
    let records = narrow(records, filter);
    let mut out = String::from("id,timestamp,sourceName,stream,level,message\n");
    for record in records.iter() {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            record.id,
            format_timestamp(&record.timestamp),
            csv_field(&record.source_name),
            record.stream.as_str(),
            record.level.as_str(),
            csv_field(&record.message),
        ));
    }
    out
}

/// Standalone styled HTML document; all content is escaped.
pub fn to_html(records: &[LogRecord], filter: Option<&CompiledFilter>) -> String {
    let records = narrow(records, filter);
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Log Export</title>\n\
         <style>\n\
         body { font-family: monospace; background: #1e2227; color: #abb2bf; }\n\
         table { border-collapse: collapse; width: 100%; }\n\
         th, td { text-align: left; padding: 2px 8px; white-space: pre-wrap; }\n\
         th { border-bottom: 1px solid #3b4048; }\n\
         .error { color: #e06c75; }\n\
         .warn { color: #e5c07b; }\n\
         .info { color: #61afef; }\n\
         .debug { color: #5c6370; }\n\
         .unknown { color: #abb2bf; }\n\
         </style>\n</head>\n<body>\n<table>\n\
         <tr><th>Time</th><th>Source</th><th>Stream</th><th>Level</th><th>Message</th></tr>\n",
    );

    for record in records.iter() {
        out.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            record.level.as_str(),
            format_timestamp(&record.timestamp),
            html_escape(&record.source_name),
            record.stream.as_str(),
            record.level.as_str().to_uppercase(),
            html_escape(&record.message),
        ));
    }

    out.push_str("</table>\n</body>\n</html>\n");
    out
}

fn narrow<'a>(records: &'a [LogRecord], filter: Option<&CompiledFilter>) -> Cow<'a, [LogRecord]> {
    match filter {
        Some(f) => Cow::Owned(f.apply(records)),
        None => Cow::Borrowed(records),
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains(['"', ',', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
