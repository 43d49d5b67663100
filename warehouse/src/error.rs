use thiserror::Error;

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("ID is not defined")]
    IdUndefined,

    #[error("ID `{0}` has been used")]
    IdExist(String),

    #[error("ID `{0}` does not exist")]
    IdNotExist(String),

    #[error("Population error: {0}")]
    Population(String),

    #[error("Hook failed: {0}")]
    Hook(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl WarehouseError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            WarehouseError::Validation(_) => "VALIDATION",
            WarehouseError::IdUndefined => "ID_UNDEFINED",
            WarehouseError::IdExist(_) => "ID_EXIST",
            WarehouseError::IdNotExist(_) => "ID_NOT_EXIST",
            WarehouseError::Population(_) => "POPULATION",
            WarehouseError::Hook(_) => "HOOK",
            WarehouseError::Usage(_) => "USAGE",
            WarehouseError::Io(_) => "IO",
            WarehouseError::Json(_) => "JSON",
            WarehouseError::Yaml(_) => "YAML",
            WarehouseError::Other(_) => "OTHER",
        }
    }

    pub(crate) fn validation(path: &str, message: impl std::fmt::Display) -> Self {
        WarehouseError::Validation(format!("`{path}` {message}"))
    }
}

pub type Result<T> = std::result::Result<T, WarehouseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(WarehouseError::IdUndefined.code(), "ID_UNDEFINED");
        assert_eq!(WarehouseError::IdExist("a".into()).code(), "ID_EXIST");
        assert_eq!(WarehouseError::IdNotExist("a".into()).code(), "ID_NOT_EXIST");
        assert_eq!(
            WarehouseError::Population("x".into()).code(),
            "POPULATION"
        );
    }

    #[test]
    fn test_validation_message_names_path() {
        let err = WarehouseError::validation("age", "is not a number!");
        assert_eq!(err.to_string(), "Validation error: `age` is not a number!");
    }
}
