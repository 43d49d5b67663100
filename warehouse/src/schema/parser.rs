use super::definition::DatabaseDefinition;
use crate::error::Result;
use std::path::Path;

/// Load model definitions from a file. `.json` files are read as JSON,
/// anything else as YAML.
pub fn parse_definition(path: &Path) -> Result<DatabaseDefinition> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let definition = if is_json {
        serde_json::from_str(&content)?
    } else {
        parse_definition_str(&content)?
    };
    log::debug!("Loaded model definitions from {}", path.display());
    Ok(definition)
}

/// Parse YAML model definitions.
pub fn parse_definition_str(content: &str) -> Result<DatabaseDefinition> {
    Ok(serde_yaml::from_str(content)?)
}
