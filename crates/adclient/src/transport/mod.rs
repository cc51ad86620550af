//! Directory transport seam
//!
//! The engine never touches the wire itself. A [`Connector`] opens a
//! connection to one server URI and hands back a [`DirectoryTransport`]
//! that performs binds, searches and updates. Every failure coming out of a
//! transport is already an [`AdError`](adclient_core::AdError).

mod ldap;

pub use ldap::{LdapConnector, LdapTransport};

use adclient_core::types::{Modification, NewEntry, RawEntry, SearchScope};
use adclient_core::{Result, TransportSecurity};
use async_trait::async_trait;
use std::time::Duration;

/// How to open a connection
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    pub security: TransportSecurity,
    pub skip_tls_verify: bool,
    /// Connect timeout, also applied to every later operation
    pub network_timeout: Option<Duration>,
}

/// Per-search limits
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub page_size: u32,
    /// Server-side time limit
    pub time_limit: Option<Duration>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            page_size: adclient_core::DEFAULT_PAGE_SIZE,
            time_limit: None,
        }
    }
}

/// One open connection to a directory server
#[async_trait]
pub trait DirectoryTransport: Send + Sync {
    async fn bind_simple(&mut self, bind_dn: &str, password: &str) -> Result<()>;

    /// SASL/GSSAPI bind with the ambient Kerberos credentials
    async fn bind_gssapi(&mut self, server_fqdn: &str) -> Result<()>;

    /// Search and collect every entry across all result pages
    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
        limits: &SearchLimits,
    ) -> Result<Vec<RawEntry>>;

    async fn add(&mut self, dn: &str, attrs: NewEntry) -> Result<()>;

    async fn modify(&mut self, dn: &str, mods: Vec<Modification>) -> Result<()>;

    async fn delete(&mut self, dn: &str) -> Result<()>;

    /// Rename to `new_rdn`, optionally moving under `new_superior`
    async fn modify_dn(&mut self, dn: &str, new_rdn: &str, new_superior: Option<&str>)
        -> Result<()>;

    async fn unbind(&mut self) -> Result<()>;
}

/// Opens transports
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        uri: &str,
        settings: &ConnectSettings,
    ) -> Result<Box<dyn DirectoryTransport>>;
}
