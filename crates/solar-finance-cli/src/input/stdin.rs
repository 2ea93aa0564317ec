use serde_json::Value;
use std::io::{self, Read};

/// Read JSON (or YAML) from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_document(&buffer)
}

fn parse_document(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        // YAML is a superset of JSON; only try it once JSON has failed.
        Err(json_err) => serde_yaml::from_str(trimmed)
            .map(Some)
            .map_err(|_| -> Box<dyn std::error::Error> {
                format!("stdin is neither JSON nor YAML: {json_err}").into()
            }),
    }
}
