use thiserror::Error;
use uuid::Uuid;
use workload_config::shared::{FeatureFlagsConfig, FlagValue};

/// A flag evaluating to a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringFlag {
    pub key: &'static str,
    pub default: &'static str,
}

/// A flag evaluating to a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolFlag {
    pub key: &'static str,
    pub default: bool,
}

/// Scheduler replication pods are assigned to.
pub const REPLICATION_POD_SCHEDULER_NAME: StringFlag = StringFlag {
    key: "replication-pod-scheduler-name",
    default: "default-scheduler",
};

/// Drops the service account from pods of the evaluated workspace.
pub const REMOVE_SERVICE_ACCOUNT: BoolFlag = BoolFlag {
    key: "remove-service-account",
    default: false,
};

/// Entity a flag is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagContext {
    Connection(Uuid),
    Workspace(Uuid),
}

impl FlagContext {
    /// Context used when the caller has no connection identity.
    ///
    /// Requests reach the builder before a connection is known, so
    /// connection-scoped flags are evaluated for the nil connection.
    pub fn anonymous_connection() -> Self {
        FlagContext::Connection(Uuid::nil())
    }

    pub fn workspace(workspace_id: Uuid) -> Self {
        FlagContext::Workspace(workspace_id)
    }

    pub fn id(&self) -> Uuid {
        match self {
            FlagContext::Connection(id) | FlagContext::Workspace(id) => *id,
        }
    }
}

/// Errors returned when evaluating a flag.
#[derive(Debug, Error)]
pub enum FlagError {
    /// The configured value has a different type than the flag.
    #[error("flag `{key}` is configured with a non-{expected} value")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
    },

    /// The flag service could not be reached or answered with an error.
    #[error("flag service unavailable: {0}")]
    Unavailable(String),
}

/// Evaluates feature flags for a context.
///
/// Implementations may call out to a remote flag service; timeouts and retries
/// are their own concern.
pub trait FeatureFlagClient: Send + Sync {
    fn string_variation(
        &self,
        flag: &StringFlag,
        context: &FlagContext,
    ) -> Result<String, FlagError>;

    fn bool_variation(&self, flag: &BoolFlag, context: &FlagContext) -> Result<bool, FlagError>;
}

/// Flag client backed by the static values in [`FeatureFlagsConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfigFeatureFlagClient {
    config: FeatureFlagsConfig,
}

impl ConfigFeatureFlagClient {
    pub fn new(config: FeatureFlagsConfig) -> Self {
        Self { config }
    }
}

impl FeatureFlagClient for ConfigFeatureFlagClient {
    fn string_variation(
        &self,
        flag: &StringFlag,
        context: &FlagContext,
    ) -> Result<String, FlagError> {
        match self.config.lookup(flag.key, context.id()) {
            None => Ok(flag.default.to_string()),
            Some(FlagValue::String(value)) => Ok(value.clone()),
            Some(FlagValue::Bool(_)) => Err(FlagError::TypeMismatch {
                key: flag.key,
                expected: "string",
            }),
        }
    }

    fn bool_variation(&self, flag: &BoolFlag, context: &FlagContext) -> Result<bool, FlagError> {
        match self.config.lookup(flag.key, context.id()) {
            None => Ok(flag.default),
            Some(FlagValue::Bool(value)) => Ok(*value),
            // Values coming from environment overrides may arrive as text.
            Some(FlagValue::String(value)) => {
                value.parse::<bool>().map_err(|_| FlagError::TypeMismatch {
                    key: flag.key,
                    expected: "boolean",
                })
            }
        }
    }
}
