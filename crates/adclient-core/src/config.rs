//! Connection parameters for a directory session
//!
//! Parameters can be built in code, read from a TOML file or taken from
//! `ADCLIENT_*` environment variables.
//!
//! Example config:
//! ```toml
//! domain = "corp.example.com"
//! uris = ["ldap://dc1.corp.example.com", "ldap://dc2.corp.example.com"]
//! bind_dn = "svc-directory@corp.example.com"
//! bind_password = "secret"
//! search_base = "DC=corp,DC=example,DC=com"
//! require_tls = true
//! network_timeout_secs = 5
//! ```

use crate::error::{AdError, Result};
use crate::utils::{domain_to_dn, explode_dn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Parameters for a session login
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnParams {
    /// DNS domain of the directory, used to locate servers when `uris` is empty
    /// and to derive the search base when none is given
    #[serde(default)]
    pub domain: String,

    /// Site hint passed to the server locator
    #[serde(default)]
    pub site: String,

    /// Server URIs tried in order until one binds
    /// Example: ["ldap://dc1.example.com", "ldaps://dc2.example.com:636"]
    #[serde(default)]
    pub uris: Vec<String>,

    /// Bind identity for simple bind
    #[serde(default)]
    pub bind_dn: String,

    /// Bind password for simple bind
    #[serde(default)]
    pub bind_password: String,

    /// Base DN for searches
    #[serde(default)]
    pub search_base: String,

    /// Require an encrypted transport; `ldap://` URIs are upgraded with STARTTLS
    #[serde(default)]
    pub require_tls: bool,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Bind with GSSAPI/Kerberos from the external credential cache
    #[serde(default)]
    pub use_gssapi: bool,

    /// Connect and per-operation network timeout; `None` leaves the library default
    #[serde(default)]
    pub network_timeout_secs: Option<u64>,

    /// Server-side time limit for searches; `None` means no limit requested
    #[serde(default)]
    pub time_limit_secs: Option<u64>,

    /// Page size for the simple paged results control
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    crate::DEFAULT_PAGE_SIZE
}

impl Default for ConnParams {
    fn default() -> Self {
        Self {
            domain: String::new(),
            site: String::new(),
            uris: Vec::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            search_base: String::new(),
            require_tls: false,
            skip_tls_verify: false,
            use_gssapi: false,
            network_timeout_secs: None,
            time_limit_secs: None,
            page_size: default_page_size(),
        }
    }
}

impl fmt::Debug for ConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnParams")
            .field("domain", &self.domain)
            .field("site", &self.site)
            .field("uris", &self.uris)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("search_base", &self.search_base)
            .field("require_tls", &self.require_tls)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("use_gssapi", &self.use_gssapi)
            .field("network_timeout_secs", &self.network_timeout_secs)
            .field("time_limit_secs", &self.time_limit_secs)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl ConnParams {
    /// Simple-bind parameters for an explicit, ordered list of servers
    pub fn new(
        uris: Vec<String>,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
        search_base: impl Into<String>,
    ) -> Self {
        Self {
            uris,
            bind_dn: bind_dn.into(),
            bind_password: bind_password.into(),
            search_base: search_base.into(),
            ..Default::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AdError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| AdError::config(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut params = Self::default();

        if let Ok(domain) = std::env::var("ADCLIENT_DOMAIN") {
            params.domain = domain;
        }
        if let Ok(site) = std::env::var("ADCLIENT_SITE") {
            params.site = site;
        }
        if let Ok(uris) = std::env::var("ADCLIENT_URIS") {
            params.uris = uris
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(dn) = std::env::var("ADCLIENT_BIND_DN") {
            params.bind_dn = dn;
        }
        if let Ok(pw) = std::env::var("ADCLIENT_BIND_PASSWORD") {
            params.bind_password = pw;
        }
        if let Ok(base) = std::env::var("ADCLIENT_SEARCH_BASE") {
            params.search_base = base;
        }
        if std::env::var("ADCLIENT_REQUIRE_TLS").map(|v| v == "true").unwrap_or(false) {
            params.require_tls = true;
        }
        if std::env::var("ADCLIENT_USE_GSSAPI").map(|v| v == "true").unwrap_or(false) {
            params.use_gssapi = true;
        }
        if let Ok(timeout) = std::env::var("ADCLIENT_NETWORK_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                params.network_timeout_secs = Some(t);
            }
        }
        if let Ok(limit) = std::env::var("ADCLIENT_TIME_LIMIT") {
            if let Ok(l) = limit.parse() {
                params.time_limit_secs = Some(l);
            }
        }

        params
    }

    pub fn login_method(&self) -> LoginMethod {
        if self.use_gssapi {
            LoginMethod::Gssapi
        } else {
            LoginMethod::Simple
        }
    }

    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_secs.map(Duration::from_secs)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    /// Search base, falling back to the DN of `domain`
    pub fn effective_search_base(&self) -> String {
        if self.search_base.is_empty() {
            domain_to_dn(&self.domain)
        } else {
            self.search_base.clone()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.uris.is_empty() && self.domain.is_empty() {
            return Err(AdError::config(
                "Either a list of server URIs or a domain is required",
            ));
        }

        for uri in &self.uris {
            TransportSecurity::for_uri(uri, self.require_tls)?;
        }

        if !self.use_gssapi && self.bind_dn.is_empty() {
            return Err(AdError::config("Bind DN is required for simple bind"));
        }

        let base = self.effective_search_base();
        if base.is_empty() {
            return Err(AdError::config("Search base is required"));
        }
        if explode_dn(&base)?.is_empty() {
            return Err(AdError::dn_syntax(&base));
        }

        if self.page_size == 0 {
            return Err(AdError::config("Page size must be positive"));
        }

        if self.network_timeout_secs == Some(0) || self.time_limit_secs == Some(0) {
            return Err(AdError::config("Timeouts must be positive when set"));
        }

        Ok(())
    }
}

/// Authentication mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// DN + password
    #[default]
    Simple,
    /// Kerberos ticket from the external credential cache
    Gssapi,
}

impl LoginMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginMethod::Simple => "simple",
            LoginMethod::Gssapi => "gssapi",
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the transport of a bound connection is protected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportSecurity {
    Plain,
    StartTls,
    Ldaps,
}

impl TransportSecurity {
    /// Decide the transport for `uri`; only `ldap://` and `ldaps://` are accepted.
    pub fn for_uri(uri: &str, require_tls: bool) -> Result<Self> {
        let parsed = url::Url::parse(uri)
            .map_err(|e| AdError::config(format!("Invalid server URI '{}': {}", uri, e)))?;

        match parsed.scheme() {
            "ldaps" => Ok(TransportSecurity::Ldaps),
            "ldap" if require_tls => Ok(TransportSecurity::StartTls),
            "ldap" => Ok(TransportSecurity::Plain),
            other => Err(AdError::config(format!(
                "Server URI must start with ldap:// or ldaps://, got '{}://'",
                other
            ))),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        !matches!(self, TransportSecurity::Plain)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportSecurity::Plain => "plain",
            TransportSecurity::StartTls => "start_tls",
            TransportSecurity::Ldaps => "ldaps",
        }
    }
}

impl fmt::Display for TransportSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
