//! Attribute codec
//!
//! The directory returns every attribute as a list of values. Textual values
//! arrive as UTF-8 strings, anything else as raw bytes. The codec keeps the
//! two apart: binary values are never handed out as text, and values keep
//! the order the server sent them in.

use super::{DirectoryObject, RawEntry};
use crate::error::{AdError, Result};
use base64::Engine;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

/// Attributes whose values are binary even when they happen to be valid UTF-8
pub const BINARY_ATTRIBUTES: &[&str] = &[
    "objectGUID",
    "objectSid",
    "sIDHistory",
    "tokenGroups",
    "tokenGroupsGlobalAndUniversal",
    "nTSecurityDescriptor",
    "msExchMailboxGuid",
    "msExchMailboxSecurityDescriptor",
    "unicodePwd",
    "dBCSPwd",
    "ntPwdHistory",
    "lmPwdHistory",
    "supplementalCredentials",
    "userCertificate",
    "userSMIMECertificate",
    "cACertificate",
    "thumbnailPhoto",
    "jpegPhoto",
    "logonHours",
    "msDS-GenerationId",
    "mS-DS-ConsistencyGuid",
];

pub fn is_binary_attribute(name: &str) -> bool {
    BINARY_ATTRIBUTES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name))
}

/// Ordered values of one attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValues {
    Text(Vec<String>),
    Binary(Vec<Vec<u8>>),
}

impl AttributeValues {
    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Text(values) => values.len(),
            AttributeValues::Binary(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, AttributeValues::Binary(_))
    }

    /// Borrow the values as text; `name` is only used for the error.
    pub fn as_text(&self, name: &str) -> Result<&[String]> {
        match self {
            AttributeValues::Text(values) => Ok(values),
            AttributeValues::Binary(_) => Err(AdError::binary_as_text(name)),
        }
    }

    pub fn into_text(self, name: &str) -> Result<Vec<String>> {
        match self {
            AttributeValues::Text(values) => Ok(values),
            AttributeValues::Binary(_) => Err(AdError::binary_as_text(name)),
        }
    }

    /// Raw bytes of every value. Text values are returned as their UTF-8 encoding.
    pub fn into_bytes(self) -> Vec<Vec<u8>> {
        match self {
            AttributeValues::Text(values) => values.into_iter().map(String::into_bytes).collect(),
            AttributeValues::Binary(values) => values,
        }
    }

    fn extend(&mut self, other: AttributeValues) {
        match (self, other) {
            (AttributeValues::Text(a), AttributeValues::Text(b)) => a.extend(b),
            (AttributeValues::Binary(a), other) => a.extend(other.into_bytes()),
            (this, AttributeValues::Binary(b)) => {
                let mut bytes = std::mem::replace(this, AttributeValues::Binary(Vec::new()))
                    .into_bytes();
                bytes.extend(b);
                *this = AttributeValues::Binary(bytes);
            }
        }
    }
}

impl Serialize for AttributeValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        match self {
            AttributeValues::Text(values) => {
                for value in values {
                    seq.serialize_element(value)?;
                }
            }
            AttributeValues::Binary(values) => {
                let engine = base64::engine::general_purpose::STANDARD;
                for value in values {
                    seq.serialize_element(&engine.encode(value))?;
                }
            }
        }
        seq.end()
    }
}

/// Attribute name to values. Lookups ignore ASCII case, names keep the
/// spelling the server used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeMap {
    entries: BTreeMap<String, AttributeValues>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_of(&self, name: &str) -> Option<&String> {
        self.entries.keys().find(|k| k.eq_ignore_ascii_case(name))
    }

    /// Insert values, appending to an existing attribute of the same name
    pub fn insert(&mut self, name: impl Into<String>, values: AttributeValues) {
        let name = name.into();
        match self.key_of(&name).cloned() {
            Some(key) => {
                if let Some(existing) = self.entries.get_mut(&key) {
                    existing.extend(values);
                }
            }
            None => {
                self.entries.insert(name, values);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValues> {
        self.key_of(name).and_then(|k| self.entries.get(k))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.key_of(name).is_some()
    }

    /// Text values of `name`. An absent attribute yields an empty list.
    pub fn text(&self, name: &str) -> Result<Vec<String>> {
        match self.get(name) {
            Some(values) => Ok(values.as_text(name)?.to_vec()),
            None => Ok(Vec::new()),
        }
    }

    pub fn first_text(&self, name: &str) -> Result<Option<String>> {
        Ok(self.text(name)?.into_iter().next())
    }

    /// Raw bytes of `name`. An absent attribute yields an empty list.
    pub fn bytes(&self, name: &str) -> Vec<Vec<u8>> {
        self.get(name)
            .cloned()
            .map(AttributeValues::into_bytes)
            .unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValues)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turn a transport entry into a directory object.
///
/// Values of attributes listed in [`BINARY_ATTRIBUTES`] are moved to the
/// binary side even when the transport delivered them as strings.
pub fn decode_entry(raw: RawEntry) -> DirectoryObject {
    let mut attributes = AttributeMap::new();

    for (name, values) in raw.attrs {
        let values = if is_binary_attribute(&name) {
            AttributeValues::Binary(values.into_iter().map(String::into_bytes).collect())
        } else {
            AttributeValues::Text(values)
        };
        attributes.insert(name, values);
    }
    for (name, values) in raw.bin_attrs {
        attributes.insert(name, AttributeValues::Binary(values));
    }

    DirectoryObject {
        dn: raw.dn,
        attributes,
    }
}

pub fn encode_text<S: AsRef<str>>(values: &[S]) -> Vec<Vec<u8>> {
    values
        .iter()
        .map(|v| v.as_ref().as_bytes().to_vec())
        .collect()
}

/// `unicodePwd` wire form: the password in double quotes, UTF-16LE
pub fn encode_password(password: &str) -> Vec<u8> {
    format!("\"{}\"", password)
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect()
}
