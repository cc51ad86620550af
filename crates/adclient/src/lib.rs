//! Active Directory client engine
//!
//! A [`Session`] is one bound connection to a domain controller. Queries,
//! nested group resolution and object management are methods on it, split
//! across modules by concern. Every operation is async and awaits once per
//! directory round trip; share a session between tasks with
//! [`SharedSession`].
//!
//! ```no_run
//! # async fn demo() -> adclient::Result<()> {
//! use adclient::{ConnParams, Session};
//!
//! let params = ConnParams::new(
//!     vec!["ldaps://dc1.example.com".to_string()],
//!     "CN=svc,CN=Users,DC=example,DC=com",
//!     "secret",
//!     "DC=example,DC=com",
//! );
//! let mut session = Session::login(params).await?;
//! let groups = session.get_user_groups("jdoe", true).await?;
//! println!("{:?}", groups);
//! session.logout().await
//! # }
//! ```

pub mod groups;
pub mod locator;
pub mod mutator;
pub mod query;
pub mod session;
pub mod transport;

#[cfg(test)]
mod memory;

pub use locator::{DomainLocator, ServerLocator};
pub use session::{Session, SessionInfo, SharedSession};
pub use transport::{Connector, DirectoryTransport, LdapConnector};

pub use adclient_core::types::{
    AccountControl, AccountFlag, AttributeMap, AttributeValues, DirectoryObject, SearchScope,
};
pub use adclient_core::{AdError, ConnParams, ErrorKind, LoginMethod, Result, TransportSecurity};
