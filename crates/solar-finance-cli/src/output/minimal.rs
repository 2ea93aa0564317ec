use serde_json::Value;

use super::format_scalar;

/// Print just the key answer value from the output.
///
/// Looks inside `kpis` (or `inputs`) for well-known fields in priority order, then
/// falls back to the first field.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let section = value
        .as_object()
        .and_then(|m| m.get("kpis").or_else(|| m.get("inputs")))
        .unwrap_or(value);

    let priority_keys = ["npv", "irr", "payback_simple", "lcoe", "capacity_kwp"];

    if let Value::Object(map) = section {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    return format_scalar(val, "null");
                }
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_scalar(val, "null"));
        }
    }

    format_scalar(section, "null")
}
