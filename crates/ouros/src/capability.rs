//! Capability-based permission system for sandboxed execution.
//!
//! Capabilities control what external operations the evaluator is allowed to
//! perform and with what arguments. They are checked at the point a
//! capability-mediated operation is attempted — filesystem access, network
//! access, and extra opt-in capabilities (`boto3`, `sql`). Without a granted
//! capability, the attempt raises `PermissionError` instead of reaching the
//! host.
//!
//! # Usage
//!
//! ```
//! use ouros::capability::{Capability, CapabilitySet};
//!
//! let caps = CapabilitySet::new(vec![
//!     Capability::Filesystem,
//!     Capability::Custom("boto3".into()),
//! ]);
//!
//! assert!(caps.allows(&Capability::Filesystem));
//! assert!(!caps.allows(&Capability::Network));
//! ```

use std::fmt;

/// A single permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Permission to read/write/list/delete through the configured
    /// [`crate::io::FilesystemBackend`].
    Filesystem,
    /// Permission to perform network requests, further restricted by the
    /// session's [`NetworkPolicy`].
    Network,
    /// Permission to read process environment variables.
    EnvironmentVariables,
    /// Custom capability identified by a string key (`"boto3"`, `"sql"`,
    /// ...). The host interprets these during module/builtin dispatch;
    /// disabled unless explicitly granted, per spec.md §6.
    Custom(String),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem => f.write_str("filesystem"),
            Self::Network => f.write_str("network"),
            Self::EnvironmentVariables => f.write_str("env"),
            Self::Custom(key) => write!(f, "custom:{key}"),
        }
    }
}

/// Error returned when an operation is denied by the capability set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenied {
    pub operation: String,
    pub required: String,
}

impl fmt::Display for PermissionDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PermissionError: {} denied (requires capability '{}')",
            self.operation, self.required
        )
    }
}

impl std::error::Error for PermissionDenied {}

/// Network access policy, one of three mutually-exclusive shapes per
/// spec.md §6.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NetworkPolicy {
    /// No network access permitted at all (the default).
    #[default]
    Disallowed,
    /// A whitelist of allowed hostnames or URL prefixes, each with its own
    /// allowed HTTP methods (defaulting to `GET`/`HEAD` when empty).
    Whitelist(Vec<WhitelistEntry>),
    /// Opts out of the sandbox entirely for network access. Named
    /// explicitly (rather than just "Allowed") so that granting it reads as
    /// a deliberate, visible decision at the call site.
    DangerouslyAllowFullInternet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub host_or_prefix: String,
    pub methods: Vec<String>,
}

impl NetworkPolicy {
    #[must_use]
    pub fn allows(&self, url: &str, method: &str) -> bool {
        match self {
            NetworkPolicy::Disallowed => false,
            NetworkPolicy::DangerouslyAllowFullInternet => true,
            NetworkPolicy::Whitelist(entries) => entries.iter().any(|e| {
                url.starts_with(&e.host_or_prefix)
                    && if e.methods.is_empty() {
                        method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD")
                    } else {
                        e.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
                    }
            }),
        }
    }
}

/// A set of granted capabilities for a sandbox session.
///
/// Immutable once created — capabilities cannot be escalated during
/// execution. A forked session inherits its parent's capabilities or a
/// narrower subset. An empty capability set (`CapabilitySet::none()`) denies
/// every capability-mediated operation, making the sandbox a pure
/// computation environment with no host interaction.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    capabilities: Vec<Capability>,
    pub network: NetworkPolicy,
    pub env_vars: std::collections::HashMap<String, String>,
}

impl CapabilitySet {
    #[must_use]
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self {
            capabilities,
            network: NetworkPolicy::default(),
            env_vars: std::collections::HashMap::new(),
        }
    }

    /// The most restrictive profile: compute only, no host interaction.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Every built-in capability granted; network defaults to the full
    /// internet. For trusted, non-sandboxed embeddings only.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self {
            capabilities: vec![Capability::Filesystem, Capability::Network, Capability::EnvironmentVariables],
            network: NetworkPolicy::DangerouslyAllowFullInternet,
            env_vars: std::collections::HashMap::new(),
        }
    }

    #[must_use]
    pub fn allows(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    pub fn check(&self, cap: &Capability, operation: &str) -> Result<(), PermissionDenied> {
        if self.allows(cap) {
            Ok(())
        } else {
            Err(PermissionDenied {
                operation: operation.to_owned(),
                required: cap.to_string(),
            })
        }
    }

    /// Returns a copy retaining only capabilities that also appear in
    /// `restrict`, used when forking a session to narrow permissions.
    #[must_use]
    pub fn subset(&self, restrict: &[Capability]) -> Self {
        Self {
            capabilities: self.capabilities.iter().filter(|c| restrict.contains(c)).cloned().collect(),
            network: self.network.clone(),
            env_vars: self.env_vars.clone(),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Capability] {
        &self.capabilities
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.capabilities.is_empty() {
            return f.write_str("CapabilitySet(none)");
        }
        f.write_str("CapabilitySet(")?;
        for (i, cap) in self.capabilities.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{cap}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_denies_everything() {
        let caps = CapabilitySet::none();
        assert!(!caps.allows(&Capability::Filesystem));
        assert!(caps.check(&Capability::Network, "connect").is_err());
    }

    #[test]
    fn subset_narrows_permissions() {
        let parent = CapabilitySet::new(vec![Capability::Filesystem, Capability::Network]);
        let child = parent.subset(&[Capability::Filesystem]);
        assert!(child.allows(&Capability::Filesystem));
        assert!(!child.allows(&Capability::Network));
    }

    #[test]
    fn whitelist_matches_prefix_and_method() {
        let policy = NetworkPolicy::Whitelist(vec![WhitelistEntry {
            host_or_prefix: "https://api.example.com".into(),
            methods: vec!["GET".into()],
        }]);
        assert!(policy.allows("https://api.example.com/v1/x", "GET"));
        assert!(!policy.allows("https://evil.example.com", "GET"));
        assert!(!policy.allows("https://api.example.com/v1/x", "DELETE"));
    }
}
