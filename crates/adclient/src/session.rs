//! Session lifecycle
//!
//! A [`Session`] owns one bound connection. It is created by
//! [`Session::login`], which walks the configured servers in order until
//! one accepts the bind, and is torn down by [`Session::logout`] or by
//! dropping it.

use crate::locator::{DomainLocator, ServerLocator};
use crate::transport::{ConnectSettings, Connector, DirectoryTransport, LdapConnector, SearchLimits};
use adclient_core::error::{result_codes, AdError, ErrorKind};
use adclient_core::types::SearchScope;
use adclient_core::{ConnParams, LoginMethod, Result, TransportSecurity, NO_ATTRIBUTES};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A session shared between tasks. Every operation holds the lock for its
/// whole duration.
pub type SharedSession = Arc<Mutex<Session>>;

/// Facts about an established session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub uri: String,
    pub bind_dn: String,
    pub search_base: String,
    pub login_method: LoginMethod,
    pub transport_security: TransportSecurity,
    pub network_timeout: Option<Duration>,
    pub time_limit: Option<Duration>,
    pub require_tls: bool,
}

/// An authenticated connection to one directory server
pub struct Session {
    pub(crate) info: SessionInfo,
    pub(crate) params: ConnParams,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) transport: Box<dyn DirectoryTransport>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("info", &self.info).finish()
    }
}

impl Session {
    /// Log in over LDAP, locating servers from the domain when no URIs are given
    pub async fn login(params: ConnParams) -> Result<Self> {
        Self::login_with(params, Arc::new(LdapConnector), &DomainLocator).await
    }

    /// Log in with a custom transport and server locator
    pub async fn login_with(
        params: ConnParams,
        connector: Arc<dyn Connector>,
        locator: &dyn ServerLocator,
    ) -> Result<Self> {
        params.validate()?;

        let uris = if params.uris.is_empty() {
            locator.locate(&params.domain, &params.site).await?
        } else {
            params.uris.clone()
        };
        let search_base = params.effective_search_base();
        let method = params.login_method();

        let mut last_error = None;
        for uri in &uris {
            let security = TransportSecurity::for_uri(uri, params.require_tls)?;
            let settings = ConnectSettings {
                security,
                skip_tls_verify: params.skip_tls_verify,
                network_timeout: params.network_timeout(),
            };

            let attempt =
                Self::open_checked(connector.as_ref(), uri, &settings, &params, &search_base).await;
            match attempt {
                Ok(transport) => {
                    info!(
                        "Logged in to {} as '{}' ({}, {})",
                        uri, params.bind_dn, method, security
                    );
                    let info = SessionInfo {
                        uri: uri.clone(),
                        bind_dn: params.bind_dn.clone(),
                        search_base,
                        login_method: method,
                        transport_security: security,
                        network_timeout: params.network_timeout(),
                        time_limit: params.time_limit(),
                        require_tls: params.require_tls,
                    };
                    return Ok(Self {
                        info,
                        params,
                        connector,
                        transport,
                    });
                }
                Err(e) if e.is_connection_error() => {
                    warn!("Server {} failed, trying next: {}", uri, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AdError::connect_failure("no servers to try")))
    }

    /// Connect, bind and make sure the search base resolves on that server
    async fn open_checked(
        connector: &dyn Connector,
        uri: &str,
        settings: &ConnectSettings,
        params: &ConnParams,
        search_base: &str,
    ) -> Result<Box<dyn DirectoryTransport>> {
        let mut transport = Self::open(connector, uri, settings, params).await?;
        Self::check_search_base(transport.as_mut(), search_base, params).await?;
        Ok(transport)
    }

    async fn open(
        connector: &dyn Connector,
        uri: &str,
        settings: &ConnectSettings,
        params: &ConnParams,
    ) -> Result<Box<dyn DirectoryTransport>> {
        let mut transport = connector.connect(uri, settings).await?;

        match params.login_method() {
            LoginMethod::Simple => {
                debug!("Simple bind to {} as '{}'", uri, params.bind_dn);
                transport
                    .bind_simple(&params.bind_dn, &params.bind_password)
                    .await?;
            }
            LoginMethod::Gssapi => {
                let fqdn = server_host(uri)?;
                debug!("GSSAPI bind to {}", fqdn);
                transport.bind_gssapi(&fqdn).await?;
            }
        }

        Ok(transport)
    }

    /// A search base that does not resolve is a caller mistake, not a
    /// missing object.
    async fn check_search_base(
        transport: &mut dyn DirectoryTransport,
        search_base: &str,
        params: &ConnParams,
    ) -> Result<()> {
        let limits = SearchLimits {
            page_size: params.page_size,
            time_limit: params.time_limit(),
        };
        let attrs = vec![NO_ATTRIBUTES.to_string()];

        match transport
            .search(search_base, SearchScope::Base, "(objectClass=*)", &attrs, &limits)
            .await
        {
            Ok(_) => Ok(()),
            Err(e)
                if e.has_result_code(result_codes::NO_SUCH_OBJECT)
                    || e.has_result_code(result_codes::INVALID_DN_SYNTAX) =>
            {
                Err(AdError::new(
                    ErrorKind::Configuration,
                    e.code(),
                    format!("search base '{}' is not usable: {}", search_base, e.message()),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// URI of the server the session is bound to
    pub fn binded_uri(&self) -> &str {
        &self.info.uri
    }

    pub fn login_method(&self) -> LoginMethod {
        self.info.login_method
    }

    pub fn transport_security(&self) -> TransportSecurity {
        self.info.transport_security
    }

    pub fn search_base(&self) -> &str {
        &self.info.search_base
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Unbind and close the connection
    pub async fn logout(mut self) -> Result<()> {
        info!("Logging out from {}", self.info.uri);
        self.transport.unbind().await
    }

    pub(crate) fn limits(&self) -> SearchLimits {
        SearchLimits {
            page_size: self.params.page_size,
            time_limit: self.info.time_limit,
        }
    }

    /// Probe a password with a separate, short-lived bind on the session's server.
    ///
    /// Rejected credentials and unknown accounts are `Ok(false)`. An empty
    /// password is rejected up front, since LDAP treats it as an anonymous
    /// bind that always succeeds.
    pub async fn check_user_password(&mut self, user: &str, password: &str) -> Result<bool> {
        let user_dn = match self.resolve_dn(user).await {
            Ok(dn) => dn,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Password check for unknown account '{}': {}", user, e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if password.is_empty() {
            return Ok(false);
        }

        let settings = ConnectSettings {
            security: self.info.transport_security,
            skip_tls_verify: self.params.skip_tls_verify,
            network_timeout: self.info.network_timeout,
        };
        let mut probe = self.connector.connect(&self.info.uri, &settings).await?;

        let outcome = match probe.bind_simple(&user_dn, password).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::Authentication => {
                debug!("Password check for '{}' rejected: {}", user_dn, e);
                Ok(false)
            }
            Err(e) => Err(e),
        };

        if let Err(e) = probe.unbind().await {
            debug!("Unbind of password probe failed: {}", e);
        }
        outcome
    }
}

fn server_host(uri: &str) -> Result<String> {
    let parsed = url::Url::parse(uri)
        .map_err(|e| AdError::config(format!("Invalid server URI '{}': {}", uri, e)))?;
    parsed
        .host_str()
        .map(String::from)
        .ok_or_else(|| AdError::config(format!("Server URI '{}' has no host", uri)))
}
