use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};

use crate::error::PodBuildError;
use crate::request::ContainerRole;

const CPU: &str = "cpu";
const MEMORY: &str = "memory";
const EPHEMERAL_STORAGE: &str = "ephemeral-storage";

/// Requested and limited compute resources of a container, as free-form quantities.
///
/// Every field is optional; an unset field sets neither a request nor a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceRequirementsSpec {
    pub cpu_request: Option<String>,
    pub cpu_limit: Option<String>,
    pub memory_request: Option<String>,
    pub memory_limit: Option<String>,
    pub ephemeral_storage_request: Option<String>,
    pub ephemeral_storage_limit: Option<String>,
}

impl ResourceRequirementsSpec {
    /// Converts the spec into Kubernetes resource requirements for `role`.
    ///
    /// Returns `Ok(None)` when nothing is set. Blank values count as unset.
    pub fn to_requirements(
        &self,
        role: ContainerRole,
    ) -> Result<Option<ResourceRequirements>, PodBuildError> {
        let requests = quantities(
            role,
            [
                (CPU, &self.cpu_request),
                (MEMORY, &self.memory_request),
                (EPHEMERAL_STORAGE, &self.ephemeral_storage_request),
            ],
        )?;
        let limits = quantities(
            role,
            [
                (CPU, &self.cpu_limit),
                (MEMORY, &self.memory_limit),
                (EPHEMERAL_STORAGE, &self.ephemeral_storage_limit),
            ],
        )?;

        if requests.is_none() && limits.is_none() {
            return Ok(None);
        }

        Ok(Some(ResourceRequirements {
            requests,
            limits,
            ..ResourceRequirements::default()
        }))
    }
}

/// Converts optional requirements, treating an absent spec as "no requirements".
pub fn resource_requirements(
    role: ContainerRole,
    spec: Option<&ResourceRequirementsSpec>,
) -> Result<Option<ResourceRequirements>, PodBuildError> {
    match spec {
        Some(spec) => spec.to_requirements(role),
        None => Ok(None),
    }
}

fn quantities(
    role: ContainerRole,
    entries: [(&'static str, &Option<String>); 3],
) -> Result<Option<BTreeMap<String, Quantity>>, PodBuildError> {
    let mut map = BTreeMap::new();

    for (resource, value) in entries {
        let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };

        if !is_valid_quantity(value) {
            return Err(PodBuildError::InvalidQuantity {
                role,
                resource,
                value: value.to_string(),
            });
        }

        map.insert(resource.to_string(), Quantity(value.to_string()));
    }

    Ok((!map.is_empty()).then_some(map))
}

/// Checks `value` against the Kubernetes quantity grammar.
///
/// `<sign><digits>[.<digits>]<suffix>` where the suffix is a binary SI unit
/// (`Ki`..`Ei`), a decimal SI unit (`n`, `u`, `m`, `k`, `M`..`E`) or a decimal
/// exponent (`e3`, `E-2`).
pub fn is_valid_quantity(value: &str) -> bool {
    let unsigned = value
        .strip_prefix('+')
        .or_else(|| value.strip_prefix('-'))
        .unwrap_or(value);

    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    if !is_valid_number(number) {
        return false;
    }

    match suffix {
        "" | "n" | "u" | "m" | "k" | "M" | "G" | "T" | "P" | "E" => true,
        "Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" => true,
        exponent => is_valid_exponent(exponent),
    }
}

fn is_valid_number(number: &str) -> bool {
    let mut parts = number.splitn(2, '.');
    let integer = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    match fraction {
        None => !integer.is_empty() && all_digits(integer),
        Some(fraction) => {
            (!integer.is_empty() || !fraction.is_empty())
                && all_digits(integer)
                && all_digits(fraction)
        }
    }
}

fn is_valid_exponent(suffix: &str) -> bool {
    let Some(exponent) = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))
    else {
        return false;
    };

    let digits = exponent
        .strip_prefix('+')
        .or_else(|| exponent.strip_prefix('-'))
        .unwrap_or(exponent);

    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_quantities() {
        for value in [
            "1", "0.5", "500m", "1.5", "256Mi", "2Gi", "100M", "1e3", "5E-2", "+1", ".5", "1.",
        ] {
            assert!(is_valid_quantity(value), "{value} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_quantities() {
        for value in ["", "abc", "1.2.3", "10 Mi", "1Gb", "Mi", "1e", "--1", "1ki"] {
            assert!(!is_valid_quantity(value), "{value} should be invalid");
        }
    }

    #[test]
    fn absent_spec_sets_no_requirements() {
        assert!(
            resource_requirements(ContainerRole::Source, None)
                .unwrap()
                .is_none()
        );
        assert!(
            ResourceRequirementsSpec::default()
                .to_requirements(ContainerRole::Source)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn blank_values_are_ignored() {
        let spec = ResourceRequirementsSpec {
            cpu_request: Some("  ".to_string()),
            memory_limit: Some("1Gi".to_string()),
            ..ResourceRequirementsSpec::default()
        };

        let requirements = spec
            .to_requirements(ContainerRole::Destination)
            .unwrap()
            .unwrap();

        assert!(requirements.requests.is_none());
        assert_eq!(
            requirements.limits.unwrap()["memory"],
            Quantity("1Gi".to_string())
        );
    }

    #[test]
    fn invalid_quantity_names_role_and_resource() {
        let spec = ResourceRequirementsSpec {
            cpu_limit: Some("two".to_string()),
            ..ResourceRequirementsSpec::default()
        };

        let err = spec.to_requirements(ContainerRole::Orchestrator).unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid cpu quantity `two` for the orchestrator container"
        );
    }
}
