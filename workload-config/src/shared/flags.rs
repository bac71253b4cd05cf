use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A feature flag value as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    String(String),
}

/// A flag value that only applies to a single evaluation context.
///
/// The context is identified by its id alone; connection and workspace ids are
/// both UUIDs and never collide in practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FlagOverride {
    /// Key of the overridden flag.
    pub flag: String,
    /// Id of the connection or workspace the override applies to.
    pub context: Uuid,
    pub value: FlagValue,
}

/// Statically configured feature flag values.
///
/// Flags missing from both `values` and `overrides` evaluate to their default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeatureFlagsConfig {
    /// Global values keyed by flag key.
    #[serde(default)]
    pub values: BTreeMap<String, FlagValue>,
    /// Context-scoped values, taking precedence over `values`.
    #[serde(default)]
    pub overrides: Vec<FlagOverride>,
}

impl FeatureFlagsConfig {
    /// Returns the configured value of `flag` for `context`, if any.
    ///
    /// An override for the exact context wins over the global value.
    pub fn lookup(&self, flag: &str, context: Uuid) -> Option<&FlagValue> {
        self.overrides
            .iter()
            .find(|o| o.flag == flag && o.context == context)
            .map(|o| &o.value)
            .or_else(|| self.values.get(flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_global_value() {
        let workspace = Uuid::new_v4();
        let config = FeatureFlagsConfig {
            values: BTreeMap::from([("remove-sa".to_string(), FlagValue::Bool(false))]),
            overrides: vec![FlagOverride {
                flag: "remove-sa".to_string(),
                context: workspace,
                value: FlagValue::Bool(true),
            }],
        };

        assert_eq!(
            config.lookup("remove-sa", workspace),
            Some(&FlagValue::Bool(true))
        );
        assert_eq!(
            config.lookup("remove-sa", Uuid::nil()),
            Some(&FlagValue::Bool(false))
        );
        assert_eq!(config.lookup("unknown", workspace), None);
    }

    #[test]
    fn untagged_values_deserialize() {
        let json = r#"{"values":{"a":true,"b":"custom-scheduler"}}"#;
        let config: FeatureFlagsConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.values["a"], FlagValue::Bool(true));
        assert_eq!(
            config.values["b"],
            FlagValue::String("custom-scheduler".to_string())
        );
        assert!(config.overrides.is_empty());
    }
}
