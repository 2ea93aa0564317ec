pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Field/value pairs of an object, nested objects joined with dots
/// (`financing.mode`).
pub(crate) fn flatten_fields(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut fields = Vec::new();
    flatten_into("", map, &mut fields);
    fields
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => flatten_into(&name, inner, out),
            other => out.push((name, other.clone())),
        }
    }
}

/// Scalar rendering shared by the text formatters. `null` means the figure is
/// undefined, not zero.
pub(crate) fn format_scalar(value: &Value, null: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => null.to_string(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| format_scalar(v, null))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
