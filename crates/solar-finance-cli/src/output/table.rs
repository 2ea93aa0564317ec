use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten_fields, format_scalar};

/// Format output as tables: KPIs or inputs first, then the yearly projection, then the
/// audit trail.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => print_sections(map),
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_sections(map: &Map<String, Value>) {
    let mut printed = false;

    if let Some(Value::Object(kpis)) = map.get("kpis") {
        println!("{}", field_table(kpis));
        printed = true;
    } else if let Some(Value::Object(inputs)) = map.get("inputs") {
        println!("{}", field_table(inputs));
        printed = true;
    }

    if let Some(Value::Array(years)) = map.get("projections") {
        println!();
        print_array_table(years);
        printed = true;
    }

    if !printed {
        println!("{}", field_table(map));
    }

    if let Some(Value::Array(audit)) = map.get("audit") {
        if !audit.is_empty() {
            println!("\nAudit:");
            for line in audit.iter().filter_map(Value::as_str) {
                println!("  - {}", line);
            }
        }
    }

    if let Some(Value::String(engine)) = map.get("engine") {
        println!("\nEngine: {}", engine);
    }
}

fn field_table(map: &Map<String, Value>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten_fields(map) {
        builder.push_record([key, format_scalar(&val, "n/a")]);
    }
    Table::from(builder)
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(|v| format_scalar(v, "n/a"))
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_scalar(item, "n/a"));
        }
    }
}
