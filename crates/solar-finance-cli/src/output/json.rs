use serde_json::Value;
use std::io::{self, Write};

/// Write the result document to stdout, pretty-printed. Undefined KPIs stay `null`
/// so consumers can tell them apart from zero.
pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_json(&mut stdout.lock(), value) {
        eprintln!("JSON output error: {e}");
    }
}

fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
