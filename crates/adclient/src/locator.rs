//! Server location for logins that name a domain instead of servers

use adclient_core::error::{codes, AdError, ErrorKind};
use adclient_core::Result;
use async_trait::async_trait;

/// Turns a domain (and optional site) into candidate server URIs
#[async_trait]
pub trait ServerLocator: Send + Sync {
    async fn locate(&self, domain: &str, site: &str) -> Result<Vec<String>>;
}

/// Uses the domain name itself, which Active Directory publishes with the
/// addresses of all domain controllers. The site is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainLocator;

#[async_trait]
impl ServerLocator for DomainLocator {
    async fn locate(&self, domain: &str, _site: &str) -> Result<Vec<String>> {
        let domain = domain.trim().trim_end_matches('.');
        if domain.is_empty() {
            return Err(AdError::new(
                ErrorKind::Configuration,
                codes::RESOLVE_ERROR,
                "no domain to locate servers for",
            ));
        }
        Ok(vec![format!("ldap://{}", domain)])
    }
}
