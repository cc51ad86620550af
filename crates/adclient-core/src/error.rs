//! Error types for adclient
//!
//! Every failure surfaces as a single [`AdError`] carrying a numeric code and
//! a message. LDAP result codes are passed through verbatim; failures that
//! originate in the client itself use the codes in [`codes`]; signals that
//! cannot be mapped to any number carry `-1`.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdError>;

/// Client-side error codes. They live above the LDAP result code range.
pub mod codes {
    pub const UNKNOWN: i32 = -1;
    pub const NOT_CONNECTED: i32 = 1001;
    pub const SERVER_CONNECT_FAILURE: i32 = 1002;
    pub const PARAMS_ERROR: i32 = 1003;
    pub const OBJECT_NOT_FOUND: i32 = 1004;
    pub const ATTRIBUTE_NOT_FOUND: i32 = 1005;
    pub const DN_SYNTAX_ERROR: i32 = 1006;
    pub const RESOLVE_ERROR: i32 = 1007;
    pub const CLIENT_TIMEOUT: i32 = 1008;
    pub const BINARY_AS_TEXT: i32 = 1009;
    pub const AMBIGUOUS_NAME: i32 = 1010;
    pub const UNSUPPORTED_MECHANISM: i32 = 1011;
}

/// LDAP result codes (RFC 4511 plus the client-library codes AD tooling reports).
pub mod result_codes {
    pub const SUCCESS: u32 = 0;
    pub const OPERATIONS_ERROR: u32 = 1;
    pub const PROTOCOL_ERROR: u32 = 2;
    pub const TIME_LIMIT_EXCEEDED: u32 = 3;
    pub const SIZE_LIMIT_EXCEEDED: u32 = 4;
    pub const AUTH_METHOD_NOT_SUPPORTED: u32 = 7;
    pub const STRONGER_AUTH_REQUIRED: u32 = 8;
    pub const ADMIN_LIMIT_EXCEEDED: u32 = 11;
    pub const CONFIDENTIALITY_REQUIRED: u32 = 13;
    pub const NO_SUCH_ATTRIBUTE: u32 = 16;
    pub const UNDEFINED_ATTRIBUTE_TYPE: u32 = 17;
    pub const CONSTRAINT_VIOLATION: u32 = 19;
    pub const ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
    pub const INVALID_ATTRIBUTE_SYNTAX: u32 = 21;
    pub const NO_SUCH_OBJECT: u32 = 32;
    pub const INVALID_DN_SYNTAX: u32 = 34;
    pub const INAPPROPRIATE_AUTHENTICATION: u32 = 48;
    pub const INVALID_CREDENTIALS: u32 = 49;
    pub const INSUFFICIENT_ACCESS_RIGHTS: u32 = 50;
    pub const BUSY: u32 = 51;
    pub const UNAVAILABLE: u32 = 52;
    pub const UNWILLING_TO_PERFORM: u32 = 53;
    pub const NAMING_VIOLATION: u32 = 64;
    pub const OBJECT_CLASS_VIOLATION: u32 = 65;
    pub const NOT_ALLOWED_ON_NON_LEAF: u32 = 66;
    pub const NOT_ALLOWED_ON_RDN: u32 = 67;
    pub const ENTRY_ALREADY_EXISTS: u32 = 68;
    pub const OTHER: u32 = 80;
    pub const SERVER_DOWN: u32 = 81;
    pub const LOCAL_ERROR: u32 = 82;
    pub const TIMEOUT: u32 = 85;
    pub const AUTH_UNKNOWN: u32 = 86;
    pub const FILTER_ERROR: u32 = 87;
    pub const CONNECT_ERROR: u32 = 91;
}

/// Error kind, independent of the concrete code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Timeout,
    Authentication,
    NotFound,
    AlreadyExists,
    Permission,
    Protocol,
    Configuration,
    Unknown,
}

impl ErrorKind {
    /// Classify an LDAP result code.
    pub fn from_result_code(rc: u32) -> Self {
        use result_codes::*;

        match rc {
            TIME_LIMIT_EXCEEDED | TIMEOUT => ErrorKind::Timeout,

            AUTH_METHOD_NOT_SUPPORTED
            | STRONGER_AUTH_REQUIRED
            | CONFIDENTIALITY_REQUIRED
            | INAPPROPRIATE_AUTHENTICATION
            | INVALID_CREDENTIALS
            | AUTH_UNKNOWN => ErrorKind::Authentication,

            NO_SUCH_ATTRIBUTE | NO_SUCH_OBJECT => ErrorKind::NotFound,

            ATTRIBUTE_OR_VALUE_EXISTS | ENTRY_ALREADY_EXISTS => ErrorKind::AlreadyExists,

            INSUFFICIENT_ACCESS_RIGHTS | UNWILLING_TO_PERFORM => ErrorKind::Permission,

            OPERATIONS_ERROR
            | PROTOCOL_ERROR
            | SIZE_LIMIT_EXCEEDED
            | ADMIN_LIMIT_EXCEEDED
            | UNDEFINED_ATTRIBUTE_TYPE
            | CONSTRAINT_VIOLATION
            | INVALID_ATTRIBUTE_SYNTAX
            | INVALID_DN_SYNTAX
            | NAMING_VIOLATION
            | OBJECT_CLASS_VIOLATION
            | NOT_ALLOWED_ON_NON_LEAF
            | NOT_ALLOWED_ON_RDN
            | FILTER_ERROR => ErrorKind::Protocol,

            BUSY | UNAVAILABLE | SERVER_DOWN | CONNECT_ERROR => ErrorKind::Connection,

            _ => ErrorKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Authentication => "authentication",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Permission => "permission",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured directory client error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdError {
    #[error("connection error ({code}): {message}")]
    Connection { code: i32, message: String },

    #[error("operation timed out ({code}): {message}")]
    Timeout { code: i32, message: String },

    #[error("authentication failed ({code}): {message}")]
    Authentication { code: i32, message: String },

    #[error("not found ({code}): {message}")]
    NotFound { code: i32, message: String },

    #[error("already exists ({code}): {message}")]
    AlreadyExists { code: i32, message: String },

    #[error("insufficient rights ({code}): {message}")]
    Permission { code: i32, message: String },

    #[error("protocol error ({code}): {message}")]
    Protocol { code: i32, message: String },

    #[error("configuration error ({code}): {message}")]
    Configuration { code: i32, message: String },

    #[error("unknown error ({code}): {message}")]
    Unknown { code: i32, message: String },
}

impl AdError {
    pub fn new(kind: ErrorKind, code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Connection => AdError::Connection { code, message },
            ErrorKind::Timeout => AdError::Timeout { code, message },
            ErrorKind::Authentication => AdError::Authentication { code, message },
            ErrorKind::NotFound => AdError::NotFound { code, message },
            ErrorKind::AlreadyExists => AdError::AlreadyExists { code, message },
            ErrorKind::Permission => AdError::Permission { code, message },
            ErrorKind::Protocol => AdError::Protocol { code, message },
            ErrorKind::Configuration => AdError::Configuration { code, message },
            ErrorKind::Unknown => AdError::Unknown { code, message },
        }
    }

    /// Build an error from a non-success LDAP result code.
    ///
    /// The code is kept verbatim; `80` (other) and unlisted codes become
    /// [`ErrorKind::Unknown`] while still carrying the number.
    pub fn from_result_code(rc: u32, message: impl Into<String>) -> Self {
        let code = i32::try_from(rc).unwrap_or(codes::UNKNOWN);
        Self::new(ErrorKind::from_result_code(rc), code, message)
    }

    /// A failure signal with no numeric code at all.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, codes::UNKNOWN, message)
    }

    pub fn not_connected() -> Self {
        Self::new(
            ErrorKind::Connection,
            codes::NOT_CONNECTED,
            "session is not logged in",
        )
    }

    pub fn connect_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, codes::SERVER_CONNECT_FAILURE, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, codes::PARAMS_ERROR, message)
    }

    pub fn dn_syntax(dn: &str) -> Self {
        Self::new(
            ErrorKind::Configuration,
            codes::DN_SYNTAX_ERROR,
            format!("invalid DN syntax: '{}'", dn),
        )
    }

    pub fn object_not_found(object: &str) -> Self {
        Self::new(
            ErrorKind::NotFound,
            codes::OBJECT_NOT_FOUND,
            format!("object '{}' not found", object),
        )
    }

    pub fn attribute_not_found(object: &str, attribute: &str) -> Self {
        Self::new(
            ErrorKind::NotFound,
            codes::ATTRIBUTE_NOT_FOUND,
            format!("no such attribute '{}' in '{}'", attribute, object),
        )
    }

    pub fn ambiguous(name: &str, matches: usize) -> Self {
        Self::new(
            ErrorKind::NotFound,
            codes::AMBIGUOUS_NAME,
            format!("'{}' matches {} objects", name, matches),
        )
    }

    pub fn binary_as_text(attribute: &str) -> Self {
        Self::new(
            ErrorKind::Protocol,
            codes::BINARY_AS_TEXT,
            format!("attribute '{}' holds binary values", attribute),
        )
    }

    pub fn client_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, codes::CLIENT_TIMEOUT, message)
    }

    pub fn unsupported_mechanism(mechanism: &str) -> Self {
        Self::new(
            ErrorKind::Authentication,
            codes::UNSUPPORTED_MECHANISM,
            format!("authentication mechanism '{}' is not supported", mechanism),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AdError::Connection { .. } => ErrorKind::Connection,
            AdError::Timeout { .. } => ErrorKind::Timeout,
            AdError::Authentication { .. } => ErrorKind::Authentication,
            AdError::NotFound { .. } => ErrorKind::NotFound,
            AdError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            AdError::Permission { .. } => ErrorKind::Permission,
            AdError::Protocol { .. } => ErrorKind::Protocol,
            AdError::Configuration { .. } => ErrorKind::Configuration,
            AdError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            AdError::Connection { code, .. }
            | AdError::Timeout { code, .. }
            | AdError::Authentication { code, .. }
            | AdError::NotFound { code, .. }
            | AdError::AlreadyExists { code, .. }
            | AdError::Permission { code, .. }
            | AdError::Protocol { code, .. }
            | AdError::Configuration { code, .. }
            | AdError::Unknown { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AdError::Connection { message, .. }
            | AdError::Timeout { message, .. }
            | AdError::Authentication { message, .. }
            | AdError::NotFound { message, .. }
            | AdError::AlreadyExists { message, .. }
            | AdError::Permission { message, .. }
            | AdError::Protocol { message, .. }
            | AdError::Configuration { message, .. }
            | AdError::Unknown { message, .. } => message,
        }
    }

    /// True when the failure says nothing about the target and another
    /// server may succeed.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, AdError::Connection { .. } | AdError::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AdError::NotFound { .. })
    }

    /// Whether this is the result code `rc` coming back from the server.
    pub fn has_result_code(&self, rc: u32) -> bool {
        i32::try_from(rc).map(|rc| rc == self.code()).unwrap_or(false)
    }

    /// Prefix the message with the operation that failed, keeping kind and code.
    pub fn context(self, operation: &str) -> Self {
        let kind = self.kind();
        let code = self.code();
        Self::new(kind, code, format!("{}: {}", operation, self.message()))
    }
}
