//! Product configuration trait for CLI binaries
//!
//! This trait defines how a binary built on this library identifies itself
//! and where it finds its blueprint registry.

use std::path::PathBuf;

/// Configuration trait for CLI products built on blueprint-core
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for the binary, env vars and cache dirs)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Registry location used when neither a flag nor the environment names one
    fn default_registry(&self) -> &'static str;

    /// Environment variable name for overriding the registry location
    fn registry_env(&self) -> &'static str;

    /// CLI description shown in help text
    fn cli_description(&self) -> &'static str;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }

    /// Resolve the registry location: explicit value, then environment, then default
    fn registry_location(&self, explicit: Option<&str>) -> String {
        match explicit {
            Some(location) => location.to_string(),
            None => std::env::var(self.registry_env())
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| self.default_registry().to_string()),
        }
    }

    /// Directory where downloaded blueprint archives are extracted
    fn cache_dir(&self) -> PathBuf {
        std::env::temp_dir().join(format!("{}-cache", self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TestProduct;

    impl ProductConfig for TestProduct {
        fn name(&self) -> &'static str {
            "bp-test"
        }

        fn display_name(&self) -> &'static str {
            "Blueprint Test"
        }

        fn default_registry(&self) -> &'static str {
            "registry.json"
        }

        fn registry_env(&self) -> &'static str {
            "BP_TEST_REGISTRY_UNSET_IN_TESTS"
        }

        fn cli_description(&self) -> &'static str {
            "test product"
        }
    }

    #[test]
    fn test_explicit_registry_wins() {
        let location = TestProduct.registry_location(Some("https://example.com/r.json"));
        assert_eq!(location, "https://example.com/r.json");
    }

    #[test]
    fn test_default_registry_without_env() {
        assert_eq!(TestProduct.registry_location(None), "registry.json");
    }

    #[test]
    fn test_user_agent_defaults_to_name() {
        assert_eq!(TestProduct.user_agent(), "bp-test");
        assert!(TestProduct.cache_dir().ends_with("bp-test-cache"));
    }
}
