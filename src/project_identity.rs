//! Central project identity contract.
//!
//! This module is the single source of truth for runtime identity values.

pub const DISPLAY_NAME: &str = "pkgbridge";
pub const BINARY_NAME: &str = "pkgbridge";
pub const QUALIFIER: &str = "dev";
pub const ORGANIZATION: &str = "pkgbridge";
pub const APPLICATION: &str = "pkgbridge";
pub const ENV_PREFIX: &str = "PKGBRIDGE";
pub const SETTINGS_FILE_BASENAME: &str = "settings.kdl";
pub const CACHE_SUBDIR: &str = "cacheddata";
pub const USER_AGENT: &str = concat!("pkgbridge/", env!("CARGO_PKG_VERSION"));

pub fn env_key(suffix: &str) -> String {
    format!("{}_{}", ENV_PREFIX, suffix)
}

/// Read a project-scoped environment variable, ignoring empty values.
pub fn env_get(suffix: &str) -> Option<String> {
    std::env::var(env_key(suffix))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_uses_prefix() {
        assert_eq!(env_key("CACHE_DIR"), "PKGBRIDGE_CACHE_DIR");
    }

    #[test]
    fn user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("pkgbridge/"));
        assert!(USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
