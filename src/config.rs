use std::collections::BTreeMap;

/// User agent sent when the caller does not configure one.
pub const DEFAULT_USER_AGENT: &str = concat!("http-utils/", env!("HTTP_UTILS_VERSION"));

/// Executor-wide settings shared by every request it issues.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub user_agent: String,
    /// Sent on every request unless the caller supplies a header with the
    /// same name.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}
