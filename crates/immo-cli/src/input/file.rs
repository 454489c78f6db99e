use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a parameters file and deserialise into a typed struct.
///
/// `.yaml` / `.yml` files go through serde_yaml, anything else is JSON.
pub fn read_document<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let yaml = is_yaml(&canonical);
    debug!(path = %canonical.display(), yaml, "reading parameters file");

    let value: T = if yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

/// Resolve the path against the working directory and check it is a file.
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

    #[test]
    fn test_yaml_extension_detection() {
        assert!(is_yaml(Path::new("params.yaml")));
        assert!(is_yaml(Path::new("params.YML")));
        assert!(!is_yaml(Path::new("params.json")));
        assert!(!is_yaml(Path::new("params")));
    }

    #[test]
    fn test_yaml_parameters_file_is_read() {
        let path = std::env::temp_dir().join(format!("immo-params-{}.yaml", std::process::id()));
        fs::write(&path, "property_price: 150000\nlease: furnished_1yr\n").unwrap();
        let value: serde_json::Value = read_document(path.to_str().unwrap()).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(value["property_price"], 150000);
        assert_eq!(value["lease"], "furnished_1yr");
    }

    #[test]
    fn test_missing_file_reported() {
        let err = read_document::<serde_json::Value>("definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
