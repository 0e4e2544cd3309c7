//! Namespace-scoped cache keys.
//!
//! A `NamespacedKey` cannot be built without a namespace, so two callers that
//! share one store only meet when they pick the same namespace.

/// Separator between namespace and caller key.
pub const SEPARATOR: &str = "::";

/// Namespace used when the caller does not pick one.
pub const DEFAULT_NAMESPACE: &str = "app";

/// A cache key that is scoped to a namespace.
///
/// # Format
///
/// Encodes to `"{namespace}::{key}"`. The namespace must not contain `:`,
/// otherwise one namespace's sweep prefix could match another's keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedKey {
    namespace: String,
    key: String,
}

impl NamespacedKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Encode to the string stored in the backend.
    pub fn encode(&self) -> String {
        format!("{}{}{}", self.namespace, SEPARATOR, self.key)
    }

    /// Split a stored key back into namespace and caller key.
    ///
    /// Returns `None` when the separator is missing or the namespace is empty.
    pub fn decode(raw: &str) -> Option<Self> {
        let (namespace, key) = raw.split_once(SEPARATOR)?;
        if namespace.is_empty() {
            return None;
        }
        Some(Self::new(namespace, key))
    }

    /// Prefix shared by every key of a namespace.
    pub fn namespace_prefix(namespace: &str) -> String {
        format!("{}{}", namespace, SEPARATOR)
    }
}

/// Whether a namespace can be used without colliding with another's prefix.
pub fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && !namespace.contains(':')
}
