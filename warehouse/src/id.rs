use serde::{Deserialize, Serialize};

/// Strategy used to mint identifiers for required id fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    Ulid,
    Uuid,
    #[default]
    Nanoid,
}

impl IdStrategy {
    /// Generate a fresh, collision-resistant identifier.
    pub fn generate(&self) -> String {
        match self {
            IdStrategy::Ulid => ulid::Ulid::new().to_string().to_lowercase(),
            IdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
            IdStrategy::Nanoid => nanoid::nanoid!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique() {
        for strategy in [IdStrategy::Ulid, IdStrategy::Uuid, IdStrategy::Nanoid] {
            let ids: HashSet<String> = (0..200).map(|_| strategy.generate()).collect();
            assert_eq!(ids.len(), 200, "{strategy:?} produced a duplicate");
        }
    }

    #[test]
    fn test_ulid_is_lowercase() {
        let id = IdStrategy::Ulid.generate();
        assert_eq!(id, id.to_lowercase());
        assert_eq!(id.len(), 26);
    }
}
