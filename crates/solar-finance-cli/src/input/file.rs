use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON or YAML file (chosen by extension) into a typed struct.
pub fn read_structured<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let value: T = if is_yaml(&canonical) {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use solar_finance_core::ProjectInputs;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("solarfin-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_reads_yaml_by_extension() {
        let path = write_temp("project.yaml", "capacity_kwp: 120\nmode: PPA\nppa_initial_price: 2.1\n");
        let inputs: ProjectInputs = read_structured(path.to_str().unwrap()).unwrap();
        assert_eq!(inputs.capacity_kwp, Some(dec!(120)));
        assert_eq!(inputs.mode.as_deref(), Some("PPA"));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_reads_json() {
        let path = write_temp("project.json", r#"{"capacity_kwp": "80", "capex": "950000"}"#);
        let inputs: ProjectInputs = read_structured(path.to_str().unwrap()).unwrap();
        assert_eq!(inputs.capex, Some(dec!(950000)));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_reported() {
        let err = read_structured::<ProjectInputs>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().starts_with("File not found"));
    }
}
