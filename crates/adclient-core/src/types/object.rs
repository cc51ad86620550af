//! Directory objects and modifications

use super::{decode_entry, encode_text, AttributeMap};
use crate::error::Result;
use serde::Serialize;
use std::collections::HashMap;

/// Entry as delivered by a transport, before attribute decoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
    pub bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

/// An object in the directory tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryObject {
    pub dn: String,
    pub attributes: AttributeMap,
}

impl DirectoryObject {
    pub fn from_raw(raw: RawEntry) -> Self {
        decode_entry(raw)
    }

    /// `sAMAccountName` when present, the DN otherwise
    pub fn short_name(&self) -> String {
        match self.attributes.first_text("sAMAccountName") {
            Ok(Some(name)) if !name.is_empty() => name,
            _ => self.dn.clone(),
        }
    }

    pub fn object_classes(&self) -> Vec<String> {
        self.attributes.text("objectClass").unwrap_or_default()
    }

    pub fn has_object_class(&self, class: &str) -> bool {
        self.object_classes()
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }

    pub fn is_group(&self) -> bool {
        self.has_object_class("group")
    }

    /// Computer accounts derive from `user` and are excluded here
    pub fn is_user(&self) -> bool {
        self.has_object_class("user") && !self.has_object_class("computer")
    }

    pub fn text(&self, name: &str) -> Result<Vec<String>> {
        self.attributes.text(name)
    }
}

/// One change within a modify request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    Add { attr: String, values: Vec<Vec<u8>> },
    /// Empty `values` removes the whole attribute
    Delete { attr: String, values: Vec<Vec<u8>> },
    /// Empty `values` removes the whole attribute
    Replace { attr: String, values: Vec<Vec<u8>> },
}

impl Modification {
    pub fn add_text(attr: impl Into<String>, values: &[&str]) -> Self {
        Modification::Add {
            attr: attr.into(),
            values: encode_text(values),
        }
    }

    pub fn replace_text(attr: impl Into<String>, values: &[&str]) -> Self {
        Modification::Replace {
            attr: attr.into(),
            values: encode_text(values),
        }
    }

    pub fn delete_text(attr: impl Into<String>, values: &[&str]) -> Self {
        Modification::Delete {
            attr: attr.into(),
            values: encode_text(values),
        }
    }

    pub fn replace_bytes(attr: impl Into<String>, value: Vec<u8>) -> Self {
        Modification::Replace {
            attr: attr.into(),
            values: vec![value],
        }
    }

    pub fn clear(attr: impl Into<String>) -> Self {
        Modification::Delete {
            attr: attr.into(),
            values: Vec::new(),
        }
    }

    pub fn attr(&self) -> &str {
        match self {
            Modification::Add { attr, .. }
            | Modification::Delete { attr, .. }
            | Modification::Replace { attr, .. } => attr,
        }
    }

    pub fn values(&self) -> &[Vec<u8>] {
        match self {
            Modification::Add { values, .. }
            | Modification::Delete { values, .. }
            | Modification::Replace { values, .. } => values,
        }
    }
}

/// Attributes of a new entry, in the order they are sent
pub type NewEntry = Vec<(String, Vec<Vec<u8>>)>;
