#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! Defaults favour the hot path: no pass limit and no whole-graph audit.
//! Both checks can be switched on per runtime, or process-wide through the
//! environment when chasing a propagation bug:
//!
//! | Variable            | Effect                                        |
//! |---------------------|-----------------------------------------------|
//! | `RIPPLE_PASS_LIMIT` | fail fast once a flush needs more passes      |
//! | `RIPPLE_VERIFY`     | `1`/`true`: audit the graph after every flush |

use std::env;

/// Environment variable overriding [`RuntimeConfig::pass_limit`].
pub const ENV_PASS_LIMIT: &str = "RIPPLE_PASS_LIMIT";
/// Environment variable overriding [`RuntimeConfig::verify_after_flush`].
pub const ENV_VERIFY: &str = "RIPPLE_VERIFY";

/// Knobs of a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of passes a single flush may run. Exceeding it is a
    /// runaway-propagation violation. `None` never limits.
    pub pass_limit: Option<usize>,
    /// Run [`Runtime::verify`](crate::Runtime::verify) at the end of every
    /// flush and fail fast on the first violation.
    pub verify_after_flush: bool,
}

impl RuntimeConfig {
    /// Defaults: unlimited passes, no audit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `RIPPLE_PASS_LIMIT` and `RIPPLE_VERIFY`.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn with_pass_limit(mut self, limit: usize) -> Self {
        self.pass_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_verify_after_flush(mut self, enabled: bool) -> Self {
        self.verify_after_flush = enabled;
        self
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup(ENV_PASS_LIMIT)
            && let Ok(n) = val.trim().parse()
        {
            self.pass_limit = Some(n);
        }
        if let Some(val) = lookup(ENV_VERIFY) {
            let val = val.trim();
            self.verify_after_flush = val == "1" || val.eq_ignore_ascii_case("true");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_unlimited_and_unaudited() {
        let config = RuntimeConfig::new();
        assert_eq!(config.pass_limit, None);
        assert!(!config.verify_after_flush);
    }

    #[test]
    fn builder_sets_fields() {
        let config = RuntimeConfig::new()
            .with_pass_limit(8)
            .with_verify_after_flush(true);
        assert_eq!(config.pass_limit, Some(8));
        assert!(config.verify_after_flush);
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = RuntimeConfig::default().with_overrides(lookup(&[
            ("RIPPLE_PASS_LIMIT", " 16 "),
            ("RIPPLE_VERIFY", "TRUE"),
        ]));
        assert_eq!(config.pass_limit, Some(16));
        assert!(config.verify_after_flush);
    }

    #[test]
    fn malformed_overrides_are_ignored() {
        let base = RuntimeConfig::new().with_pass_limit(4);
        let config = base
            .clone()
            .with_overrides(lookup(&[("RIPPLE_PASS_LIMIT", "many")]));
        assert_eq!(config, base);

        let config = RuntimeConfig::new()
            .with_verify_after_flush(true)
            .with_overrides(lookup(&[("RIPPLE_VERIFY", "0")]));
        assert!(!config.verify_after_flush);
    }
}
