use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of one container-runtime endpoint, e.g. `tcp://172.17.0.2:2375`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self(endpoint.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WorkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle {
    pub id: String,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Prefix `image` with the registry host so the runtime pulls from that registry.
///
/// Scheme and trailing slashes are stripped from `registry_url`. A blank
/// registry, or an image already carrying the host, is returned unchanged.
pub fn qualified_image(registry_url: &str, image: &str) -> String {
    let registry = registry_url.trim();
    let registry = registry
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(registry)
        .trim_end_matches('/');

    if registry.is_empty() || image.starts_with(&format!("{registry}/")) {
        return image.to_string();
    }
    format!("{registry}/{image}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_id_ordering_and_display() {
        let a = WorkerId::from("tcp://172.17.0.2:2375");
        let b = WorkerId::from("tcp://172.17.0.3:2375");
        assert!(a < b);
        assert_eq!(a.to_string(), "tcp://172.17.0.2:2375");
        assert_eq!(a.as_str(), "tcp://172.17.0.2:2375");
    }

    #[test]
    fn test_qualified_image() {
        assert_eq!(qualified_image("registry.local:5000", "app:1"), "registry.local:5000/app:1");
        assert_eq!(qualified_image("https://registry.local:5000/", "app"), "registry.local:5000/app");
        assert_eq!(qualified_image("", "alpine:3"), "alpine:3");
        assert_eq!(qualified_image("  ", "alpine:3"), "alpine:3");
        assert_eq!(
            qualified_image("registry.local:5000", "registry.local:5000/app:1"),
            "registry.local:5000/app:1"
        );
    }
}
