//! External display-name lookups

use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use super::{IdentityLookup, LookupError, LookupResult};
use crate::config::{IdentityConfig, LookupKind};

/// Lookup that is never configured; always fails so the raw identifier is used
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl IdentityLookup for NoLookup {
    fn display_name(&self, _identifier: &str) -> LookupResult<String> {
        Err(LookupError::Disabled)
    }
}

/// Lookup against a user API such as `https://api.github.com/users/{id}`.
///
/// The response's `name` field is used, then `login`.
pub struct HttpIdentityLookup {
    url_template: String,
    token: Option<String>,
    agent: ureq::Agent,
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(10)))
        .build()
        .new_agent()
}

impl HttpIdentityLookup {
    pub fn new(url_template: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url_template: url_template.into(),
            token,
            agent: make_agent(),
        }
    }

    /// Read the bearer token from `token_env`, if set
    pub fn from_env(url_template: impl Into<String>, token_env: &str) -> Self {
        let token = env::var(token_env).ok().filter(|t| !t.trim().is_empty());
        Self::new(url_template, token)
    }

    /// Substitute the percent-encoded identifier for `{id}`
    pub fn url_for(&self, identifier: &str) -> String {
        self.url_template.replace("{id}", &encode_component(identifier))
    }
}

impl IdentityLookup for HttpIdentityLookup {
    fn display_name(&self, identifier: &str) -> LookupResult<String> {
        let url = self.url_for(identifier);
        let mut request = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", "impactlens");
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {}", token));
        }

        let response = request
            .call()
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        if status == 404 {
            return Err(LookupError::NotFound(identifier.to_string()));
        }
        if status >= 400 {
            return Err(LookupError::Status(status));
        }

        let body: Value = response
            .into_body()
            .read_json()
            .map_err(|e| LookupError::Decode(e.to_string()))?;
        name_from_profile(&body).ok_or_else(|| LookupError::NotFound(identifier.to_string()))
    }
}

/// Percent-encode a single URL component. `+` from the form encoder becomes
/// `%20` since the identifier may land in a path.
fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn name_from_profile(body: &Value) -> Option<String> {
    ["name", "login"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

/// Build the lookup described by the `[identity]` config section
pub fn lookup_from_config(config: &IdentityConfig) -> Box<dyn IdentityLookup> {
    match (config.lookup, &config.url_template) {
        (LookupKind::Http, Some(template)) => {
            debug!("Identity lookup via {}", template);
            Box::new(HttpIdentityLookup::from_env(template.clone(), &config.token_env))
        }
        (LookupKind::Http, None) => {
            warn!("identity.lookup = \"http\" needs identity.url_template; lookups disabled");
            Box::new(NoLookup)
        }
        (LookupKind::None, _) => Box::new(NoLookup),
    }
}
