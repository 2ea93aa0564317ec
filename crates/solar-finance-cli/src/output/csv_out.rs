use serde_json::{Map, Value};
use std::io;

use super::{flatten_fields, format_scalar};

/// Write output as CSV to stdout. Runs with a projection emit one row per year;
/// everything else is written as field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            if let Some(Value::Array(years)) = map.get("projections") {
                write_array_csv(&mut wtr, years);
            } else if let Some(Value::Object(kpis)) = map.get("kpis") {
                write_fields(&mut wtr, kpis);
            } else if let Some(Value::Object(inputs)) = map.get("inputs") {
                write_fields(&mut wtr, inputs);
            } else {
                write_fields(&mut wtr, map);
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_scalar(value, "")]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in flatten_fields(map) {
        let _ = wtr.write_record([key, format_scalar(&val, "")]);
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(|v| format_scalar(v, "")).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_scalar(item, "")]);
        }
    }
}
