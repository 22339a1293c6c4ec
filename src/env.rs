/// Assembly stops once more errors than this were reported.
pub const DEFAULT_ERROR_LIMIT: usize = 5;

/// Settings shared by every command. Read from the environment, then overridden by flags.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    pub error_limit: usize,
    /// Print every instruction as it executes.
    pub trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            error_limit: DEFAULT_ERROR_LIMIT,
            trace: false,
        }
    }
}

impl Config {
    /// `DUCK_ERROR_LIMIT` and `DUCK_TRACE=1`. Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Config::default();
        Config {
            error_limit: var("DUCK_ERROR_LIMIT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default.error_limit),
            trace: var("DUCK_TRACE").is_some_and(|v| v == "1"),
        }
    }

    pub fn with_error_limit(self, limit: Option<usize>) -> Self {
        Config {
            error_limit: limit.unwrap_or(self.error_limit),
            ..self
        }
    }

    pub fn with_trace(self, trace: bool) -> Self {
        Config {
            trace: self.trace || trace,
            ..self
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, val)| val.to_string())
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(Config::from_vars(vars(&[])), Config::default());
        assert_eq!(Config::default().error_limit, 5);
    }

    #[test]
    fn reads_variables() {
        let config = Config::from_vars(vars(&[("DUCK_ERROR_LIMIT", " 12 "), ("DUCK_TRACE", "1")]));
        assert_eq!(
            config,
            Config {
                error_limit: 12,
                trace: true
            }
        );
        let config = Config::from_vars(vars(&[("DUCK_ERROR_LIMIT", "lots"), ("DUCK_TRACE", "yes")]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn flags_override() {
        let config = Config::default().with_error_limit(Some(0)).with_trace(true);
        assert_eq!(config.error_limit, 0);
        assert!(config.trace);
        assert_eq!(Config::default().with_error_limit(None).error_limit, 5);
    }
}
