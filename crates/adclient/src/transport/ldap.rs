//! LDAP transport over `ldap3`
//!
//! This is the only place where `ldap3` errors are seen; they are turned
//! into [`AdError`] by [`translate`] before leaving the module.

use super::{ConnectSettings, Connector, DirectoryTransport, SearchLimits};
use adclient_core::error::{result_codes, AdError, ErrorKind};
use adclient_core::types::{Modification, NewEntry, RawEntry, SearchScope};
use adclient_core::{Result, TransportSecurity};
use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, LdapError, Mod, Scope, SearchEntry, SearchOptions,
};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Opens [`LdapTransport`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapConnector;

#[async_trait]
impl Connector for LdapConnector {
    async fn connect(
        &self,
        uri: &str,
        settings: &ConnectSettings,
    ) -> Result<Box<dyn DirectoryTransport>> {
        let transport = LdapTransport::connect(uri, settings).await?;
        Ok(Box::new(transport))
    }
}

/// A connection to one LDAP server
pub struct LdapTransport {
    ldap: Ldap,
    timeout: Option<Duration>,
}

impl LdapTransport {
    /// Connect to `uri` and spawn the connection driver
    pub async fn connect(uri: &str, settings: &ConnectSettings) -> Result<Self> {
        let mut conn_settings = LdapConnSettings::new()
            .set_starttls(settings.security == TransportSecurity::StartTls)
            .set_no_tls_verify(settings.skip_tls_verify);
        if let Some(timeout) = settings.network_timeout {
            conn_settings = conn_settings.set_conn_timeout(timeout);
        }

        debug!("Connecting to LDAP server: {} ({})", uri, settings.security);

        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, uri).await
            .map_err(|e| connect_error(uri, e))?;

        // Spawn connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {}", e);
            }
        });

        Ok(Self {
            ldap,
            timeout: settings.network_timeout,
        })
    }

    fn apply_timeout(&mut self) {
        if let Some(timeout) = self.timeout {
            self.ldap.with_timeout(timeout);
        }
    }
}

#[async_trait]
impl DirectoryTransport for LdapTransport {
    async fn bind_simple(&mut self, bind_dn: &str, password: &str) -> Result<()> {
        self.apply_timeout();
        let result = self
            .ldap
            .simple_bind(bind_dn, password)
            .await
            .map_err(translate)?;
        check(result)
    }

    #[cfg(feature = "gssapi")]
    async fn bind_gssapi(&mut self, server_fqdn: &str) -> Result<()> {
        self.apply_timeout();
        let result = self
            .ldap
            .sasl_gssapi_bind(server_fqdn)
            .await
            .map_err(translate)?;
        check(result)
    }

    #[cfg(not(feature = "gssapi"))]
    async fn bind_gssapi(&mut self, _server_fqdn: &str) -> Result<()> {
        Err(AdError::unsupported_mechanism("GSSAPI"))
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
        limits: &SearchLimits,
    ) -> Result<Vec<RawEntry>> {
        let scope = match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        };

        if let Some(limit) = limits.time_limit {
            let secs = i32::try_from(limit.as_secs()).unwrap_or(i32::MAX);
            self.ldap
                .with_search_options(SearchOptions::new().timelimit(secs));
        }
        self.apply_timeout();

        let page_size = i32::try_from(limits.page_size).unwrap_or(i32::MAX);
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(page_size)),
        ];

        let mut stream = self
            .ldap
            .streaming_search_with(adapters, base, scope, filter, attrs.to_vec())
            .await
            .map_err(translate)?;

        let mut entries = Vec::new();
        while let Some(entry) = stream.next().await.map_err(translate)? {
            let entry = SearchEntry::construct(entry);
            entries.push(RawEntry {
                dn: entry.dn,
                attrs: entry.attrs,
                bin_attrs: entry.bin_attrs,
            });
        }

        check(stream.finish().await)?;
        Ok(entries)
    }

    async fn add(&mut self, dn: &str, attrs: NewEntry) -> Result<()> {
        let attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = attrs
            .into_iter()
            .map(|(name, values)| (name.into_bytes(), values.into_iter().collect()))
            .collect();

        self.apply_timeout();
        let result = self.ldap.add(dn, attrs).await.map_err(translate)?;
        check(result)
    }

    async fn modify(&mut self, dn: &str, mods: Vec<Modification>) -> Result<()> {
        let mods: Vec<Mod<Vec<u8>>> = mods
            .into_iter()
            .map(|m| match m {
                Modification::Add { attr, values } => {
                    Mod::Add(attr.into_bytes(), values.into_iter().collect())
                }
                Modification::Delete { attr, values } => {
                    Mod::Delete(attr.into_bytes(), values.into_iter().collect())
                }
                Modification::Replace { attr, values } => {
                    Mod::Replace(attr.into_bytes(), values.into_iter().collect())
                }
            })
            .collect();

        self.apply_timeout();
        let result = self.ldap.modify(dn, mods).await.map_err(translate)?;
        check(result)
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        self.apply_timeout();
        let result = self.ldap.delete(dn).await.map_err(translate)?;
        check(result)
    }

    async fn modify_dn(
        &mut self,
        dn: &str,
        new_rdn: &str,
        new_superior: Option<&str>,
    ) -> Result<()> {
        self.apply_timeout();
        let result = self
            .ldap
            .modifydn(dn, new_rdn, true, new_superior)
            .await
            .map_err(translate)?;
        check(result)
    }

    async fn unbind(&mut self) -> Result<()> {
        self.ldap.unbind().await.map_err(translate)
    }
}

/// Map an `ldap3` failure to the error taxonomy
pub(crate) fn translate(err: LdapError) -> AdError {
    match err {
        LdapError::LdapResult { result } => AdError::from_result_code(result.rc, describe(&result)),
        LdapError::Timeout { .. } => AdError::client_timeout("operation timed out"),
        err @ LdapError::Io { .. } => AdError::connect_failure(err.to_string()),
        LdapError::FilterParsing => AdError::new(
            ErrorKind::Protocol,
            result_codes::FILTER_ERROR as i32,
            "invalid search filter",
        ),
        err @ LdapError::UnknownScheme(_) => AdError::config(err.to_string()),
        err @ LdapError::UrlParsing { .. } => AdError::config(err.to_string()),
        other => AdError::unknown(other.to_string()),
    }
}

/// Failures while connecting are connection errors unless they are clearly
/// caused by the parameters.
fn connect_error(uri: &str, err: LdapError) -> AdError {
    let err = translate(err);
    match err.kind() {
        ErrorKind::Unknown => AdError::connect_failure(format!("{}: {}", uri, err.message())),
        _ => err.context(uri),
    }
}

fn describe(result: &ldap3::LdapResult) -> String {
    if result.text.is_empty() {
        format!("result code {}", result.rc)
    } else {
        result.text.trim_end_matches('\0').to_string()
    }
}

fn check(result: ldap3::LdapResult) -> Result<()> {
    if result.rc == result_codes::SUCCESS {
        Ok(())
    } else {
        Err(AdError::from_result_code(result.rc, describe(&result)))
    }
}
