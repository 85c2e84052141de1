//! Display name → identity key resolution.
//!
//! Organisational role prefixes ("매니저_", "멘토_", ...) are stripped so that
//! one person keeps one history no matter which role label they post under.
//!
//! Policy note: a display name is self-chosen, so anyone who renames
//! themselves to `멘토_Kim` reads and extends Kim's history. Prefix collapsing
//! is kept as an explicit aliasing policy; the allow-listed channel is the
//! only trust boundary.
//!
//! A display name that is nothing but a prefix (`매니저_`) is not stripped:
//! it keeps its raw form as the key, so no history is ever stored under an
//! empty key shared by every such name.

use relay_core::config::IdentityConfig;
use relay_core::types::IdentityKey;
use tracing::debug;

/// Strips the first matching role prefix from a display name.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    prefixes: Vec<String>,
}

impl IdentityResolver {
    pub fn new(prefixes: Vec<String>) -> Self {
        // An empty prefix would match every name and strip nothing.
        let prefixes = prefixes.into_iter().filter(|p| !p.is_empty()).collect();
        Self { prefixes }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.prefixes.clone())
    }

    /// Resolve a raw display name. Pure and deterministic.
    ///
    /// Only the leading occurrence is removed, once; a name that is nothing
    /// but a prefix keeps its raw form so the key is never empty.
    pub fn resolve(&self, display_name: &str) -> IdentityKey {
        for prefix in &self.prefixes {
            if let Some(rest) = display_name.strip_prefix(prefix.as_str()) {
                if rest.is_empty() {
                    break;
                }
                debug!(display_name, prefix = %prefix, "stripped role prefix");
                return IdentityKey(rest.to_string());
            }
        }
        IdentityKey(display_name.to_string())
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> IdentityResolver {
        IdentityResolver::from_config(&IdentityConfig::default())
    }

    #[test]
    fn strips_known_prefix() {
        assert_eq!(resolver().resolve("매니저_Kim").as_str(), "Kim");
        assert_eq!(resolver().resolve("교육생_Lee").as_str(), "Lee");
        assert_eq!(resolver().resolve("멘토_Park").as_str(), "Park");
        assert_eq!(resolver().resolve("운영자_Choi").as_str(), "Choi");
    }

    #[test]
    fn unprefixed_name_is_unchanged() {
        assert_eq!(resolver().resolve("Kim").as_str(), "Kim");
        assert_eq!(resolver().resolve("Kim_매니저_").as_str(), "Kim_매니저_");
    }

    #[test]
    fn different_roles_collapse_to_one_key() {
        let r = resolver();
        assert_eq!(r.resolve("매니저_Kim"), r.resolve("멘토_Kim"));
        assert_eq!(r.resolve("매니저_Kim"), r.resolve("Kim"));
    }

    #[test]
    fn only_first_matching_prefix_is_stripped() {
        // The result still carries a prefix; a second resolve would strip it.
        assert_eq!(resolver().resolve("매니저_멘토_Kim").as_str(), "멘토_Kim");
    }

    #[test]
    fn first_prefix_in_list_wins() {
        let r = IdentityResolver::new(vec!["ab".into(), "a".into()]);
        assert_eq!(r.resolve("abc").as_str(), "c");
        let r = IdentityResolver::new(vec!["a".into(), "ab".into()]);
        assert_eq!(r.resolve("abc").as_str(), "bc");
    }

    #[test]
    fn idempotent_once_no_prefix_matches() {
        let r = resolver();
        for name in ["매니저_Kim", "Kim", "교육생_이순신", "", "운영자"] {
            let once = r.resolve(name);
            let twice = r.resolve(once.as_str());
            assert_eq!(once, twice, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn bare_prefix_keeps_raw_name() {
        assert_eq!(resolver().resolve("매니저_").as_str(), "매니저_");
    }

    #[test]
    fn empty_prefixes_are_ignored() {
        let r = IdentityResolver::new(vec![String::new(), "x_".into()]);
        assert_eq!(r.prefixes().len(), 1);
        assert_eq!(r.resolve("x_Kim").as_str(), "Kim");
    }
}
