use k8s_openapi::api::core::v1::{
    Capabilities, PodSecurityContext, SeccompProfile, SecurityContext,
};
use workload_config::shared::SecurityConfig;

const RUNTIME_DEFAULT_SECCOMP: &str = "RuntimeDefault";

/// Supplies the security contexts applied to replication pods.
pub trait SecurityContextProvider: Send + Sync {
    /// Security context of the pod itself.
    fn pod_security_context(&self) -> PodSecurityContext;

    /// Security context applied to every container of the pod.
    fn container_security_context(&self) -> SecurityContext;
}

/// Runs pods as an unprivileged user with the runtime's default seccomp profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSecurityContextProvider {
    config: SecurityConfig,
}

impl DefaultSecurityContextProvider {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    fn seccomp_profile() -> SeccompProfile {
        SeccompProfile {
            type_: RUNTIME_DEFAULT_SECCOMP.to_string(),
            ..SeccompProfile::default()
        }
    }
}

impl SecurityContextProvider for DefaultSecurityContextProvider {
    fn pod_security_context(&self) -> PodSecurityContext {
        PodSecurityContext {
            run_as_user: Some(self.config.run_as_user),
            run_as_group: Some(self.config.run_as_group),
            fs_group: Some(self.config.fs_group),
            run_as_non_root: Some(true),
            seccomp_profile: Some(Self::seccomp_profile()),
            ..PodSecurityContext::default()
        }
    }

    fn container_security_context(&self) -> SecurityContext {
        SecurityContext {
            allow_privilege_escalation: Some(false),
            run_as_non_root: Some(true),
            run_as_user: Some(self.config.run_as_user),
            run_as_group: Some(self.config.run_as_group),
            capabilities: Some(Capabilities {
                drop: Some(vec!["ALL".to_string()]),
                ..Capabilities::default()
            }),
            seccomp_profile: Some(Self::seccomp_profile()),
            ..SecurityContext::default()
        }
    }
}
