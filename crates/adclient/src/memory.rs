//! In-memory directory for tests
//!
//! Implements the transport seam with enough Active Directory behaviour to
//! exercise the engine: LDAP filters (including the bitwise-AND matching
//! rule), scopes, `memberOf` back-links, `unicodePwd` handling, leaf-only
//! deletes, renames and the usual result codes.

use crate::locator::DomainLocator;
use crate::session::Session;
use crate::transport::{ConnectSettings, Connector, DirectoryTransport, SearchLimits};
use adclient_core::error::{result_codes, AdError};
use adclient_core::types::{Modification, NewEntry, RawEntry, SearchScope};
use adclient_core::utils::{explode_dn, normalize_dn, parent_dn, unescape_dn_value};
use adclient_core::{ConnParams, Result, ALL_ATTRIBUTES, NO_ATTRIBUTES};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const BASE_DN: &str = "DC=domain,DC=local";
pub const ADMIN_DN: &str = "CN=Administrator,CN=Users,DC=domain,DC=local";
pub const ADMIN_PASSWORD: &str = "Slimer";

const BITWISE_AND: &str = ":1.2.840.113556.1.4.803:=";

fn ldap_error(rc: u32, message: &str) -> AdError {
    AdError::from_result_code(rc, message)
}

#[derive(Debug, Clone)]
struct Entry {
    dn: String,
    attrs: Vec<(String, Vec<Vec<u8>>)>,
}

impl Entry {
    fn new(dn: &str) -> Self {
        Self {
            dn: dn.to_string(),
            attrs: Vec::new(),
        }
    }

    fn get(&self, name: &str) -> Option<&Vec<Vec<u8>>> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    fn set(&mut self, name: &str, values: Vec<Vec<u8>>) {
        self.attrs.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        if !values.is_empty() {
            self.attrs.push((name.to_string(), values));
        }
    }

    fn set_text(&mut self, name: &str, values: &[&str]) {
        self.set(name, values.iter().map(|v| v.as_bytes().to_vec()).collect());
    }

    fn texts(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|values| {
                values
                    .iter()
                    .map(|v| String::from_utf8_lossy(v).into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn has_class(&self, class: &str) -> bool {
        self.texts("objectClass")
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    passwords: HashMap<String, String>,
    down: HashSet<String>,
    slow: HashSet<String>,
    connects: usize,
}

impl State {
    fn entry(&self, dn: &str) -> Result<&Entry> {
        self.entries
            .get(&normalize_dn(dn))
            .ok_or_else(|| ldap_error(result_codes::NO_SUCH_OBJECT, "no such object"))
    }

    fn member_of(&self, key: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|group| {
                group
                    .texts("member")
                    .iter()
                    .any(|m| normalize_dn(m) == key)
            })
            .map(|group| group.dn.clone())
            .collect()
    }

    fn values(&self, entry: &Entry, attr: &str) -> Vec<String> {
        if attr.eq_ignore_ascii_case("distinguishedName") {
            vec![entry.dn.clone()]
        } else if attr.eq_ignore_ascii_case("memberOf") {
            self.member_of(&normalize_dn(&entry.dn))
        } else {
            entry.texts(attr)
        }
    }

    fn matches(&self, entry: &Entry, filter: &Filter) -> bool {
        match filter {
            Filter::And(items) => items.iter().all(|f| self.matches(entry, f)),
            Filter::Or(items) => items.iter().any(|f| self.matches(entry, f)),
            Filter::Not(inner) => !self.matches(entry, inner),
            Filter::Present(attr) => !self.values(entry, attr).is_empty(),
            Filter::Equal(attr, value) => {
                let wanted = normalize_dn(value);
                self.values(entry, attr).iter().any(|v| {
                    normalize_dn(v) == wanted
                        || (attr.eq_ignore_ascii_case("objectCategory")
                            && explode_dn(v)
                                .ok()
                                .and_then(|parts| parts.first().cloned())
                                .map(|(_, first)| first.eq_ignore_ascii_case(value))
                                .unwrap_or(false))
                })
            }
            Filter::Substring(attr, pieces) => self
                .values(entry, attr)
                .iter()
                .any(|v| glob_match(&v.to_lowercase(), pieces)),
            Filter::BitAnd(attr, mask) => self
                .values(entry, attr)
                .iter()
                .filter_map(|v| v.parse::<i64>().ok())
                .any(|v| v & mask == *mask),
        }
    }

    fn in_scope(key: &str, entry: &Entry, base_key: &str, scope: SearchScope) -> bool {
        match scope {
            SearchScope::Base => key == base_key,
            SearchScope::OneLevel => {
                parent_dn(&entry.dn).map(|p| normalize_dn(&p)).as_deref() == Some(base_key)
            }
            SearchScope::Subtree => key == base_key || key.ends_with(&format!(",{}", base_key)),
        }
    }

    fn project(&self, entry: &Entry, attrs: &[String]) -> RawEntry {
        let mut raw = RawEntry {
            dn: entry.dn.clone(),
            ..Default::default()
        };
        if attrs.len() == 1 && attrs[0] == NO_ATTRIBUTES {
            return raw;
        }

        let all = attrs.is_empty() || attrs.iter().any(|a| a == ALL_ATTRIBUTES);
        let mut selected: Vec<(String, Vec<Vec<u8>>)> = entry
            .attrs
            .iter()
            .filter(|(name, _)| all || attrs.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .cloned()
            .collect();
        for computed in ["distinguishedName", "memberOf"] {
            if all || attrs.iter().any(|a| a.eq_ignore_ascii_case(computed)) {
                let values = self.values(entry, computed);
                if !values.is_empty() {
                    selected.push((
                        computed.to_string(),
                        values.into_iter().map(String::into_bytes).collect(),
                    ));
                }
            }
        }

        for (name, values) in selected {
            if values.iter().all(|v| std::str::from_utf8(v).is_ok()) {
                raw.attrs.insert(
                    name,
                    values
                        .into_iter()
                        .map(|v| String::from_utf8_lossy(&v).into_owned())
                        .collect(),
                );
            } else {
                raw.bin_attrs.insert(name, values);
            }
        }
        raw
    }

    fn has_children(&self, key: &str) -> bool {
        let suffix = format!(",{}", key);
        self.entries.keys().any(|k| k.ends_with(&suffix))
    }

    /// Rewrite `member` values pointing at `old_key`
    fn relink_members(&mut self, old_key: &str, new_dn: Option<&str>) {
        for entry in self.entries.values_mut() {
            let members = entry.texts("member");
            if !members.iter().any(|m| normalize_dn(m) == old_key) {
                continue;
            }
            let updated: Vec<Vec<u8>> = members
                .into_iter()
                .filter_map(|m| {
                    if normalize_dn(&m) == old_key {
                        new_dn.map(|dn| dn.as_bytes().to_vec())
                    } else {
                        Some(m.into_bytes())
                    }
                })
                .collect();
            entry.set("member", updated);
        }
    }
}

/// Decode a quoted UTF-16LE `unicodePwd` value
fn decode_password(value: &[u8]) -> Option<String> {
    let units: Vec<u16> = value
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let text = String::from_utf16(&units).ok()?;
    text.strip_prefix('"')?.strip_suffix('"').map(String::from)
}

fn default_category(entry: &Entry) -> Option<&'static str> {
    if entry.has_class("computer") {
        Some("CN=Computer,CN=Schema,CN=Configuration,DC=domain,DC=local")
    } else if entry.has_class("user") {
        Some("CN=Person,CN=Schema,CN=Configuration,DC=domain,DC=local")
    } else if entry.has_class("group") {
        Some("CN=Group,CN=Schema,CN=Configuration,DC=domain,DC=local")
    } else if entry.has_class("organizationalUnit") {
        Some("CN=Organizational-Unit,CN=Schema,CN=Configuration,DC=domain,DC=local")
    } else {
        None
    }
}

#[derive(Debug)]
enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equal(String, String),
    Substring(String, Vec<String>),
    BitAnd(String, i64),
}

fn parse_filter(s: &str) -> Result<Filter> {
    match parse(s.trim()) {
        Some((filter, "")) => Ok(filter),
        _ => Err(ldap_error(result_codes::FILTER_ERROR, "bad search filter")),
    }
}

fn parse(s: &str) -> Option<(Filter, &str)> {
    let s = s.strip_prefix('(')?;
    match s.chars().next()? {
        op @ ('&' | '|') => {
            let mut rest = &s[1..];
            let mut items = Vec::new();
            while rest.starts_with('(') {
                let (item, r) = parse(rest)?;
                items.push(item);
                rest = r;
            }
            let rest = rest.strip_prefix(')')?;
            let filter = if op == '&' {
                Filter::And(items)
            } else {
                Filter::Or(items)
            };
            Some((filter, rest))
        }
        '!' => {
            let (inner, rest) = parse(&s[1..])?;
            Some((Filter::Not(Box::new(inner)), rest.strip_prefix(')')?))
        }
        _ => {
            let end = s.find(')')?;
            Some((parse_item(&s[..end])?, &s[end + 1..]))
        }
    }
}

fn parse_item(item: &str) -> Option<Filter> {
    if let Some((attr, mask)) = item.split_once(BITWISE_AND) {
        return Some(Filter::BitAnd(attr.to_string(), mask.parse().ok()?));
    }
    let (attr, value) = item.split_once('=')?;
    let attr = attr.trim().to_string();
    if attr.is_empty() {
        return None;
    }
    if value == "*" {
        Some(Filter::Present(attr))
    } else if value.contains('*') {
        let pieces = value
            .split('*')
            .map(|p| unescape_dn_value(p).to_lowercase())
            .collect();
        Some(Filter::Substring(attr, pieces))
    } else {
        Some(Filter::Equal(attr, unescape_dn_value(value)))
    }
}

/// `pieces` are the parts between `*`s, already lowercased
fn glob_match(value: &str, pieces: &[String]) -> bool {
    let (first, rest) = match pieces.split_first() {
        Some(split) => split,
        None => return true,
    };
    let Some(mut remaining) = value.strip_prefix(first.as_str()) else {
        return false;
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return remaining.is_empty(),
    };
    for piece in middle {
        match remaining.find(piece.as_str()) {
            Some(i) => remaining = &remaining[i + piece.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

/// A directory living in memory, shared by every transport it hands out
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        let mut state = State::default();
        let mut root = Entry::new(BASE_DN);
        root.set_text("objectClass", &["top", "domain", "domainDNS"]);
        root.set_text("dc", &["domain"]);
        state.entries.insert(normalize_dn(BASE_DN), root);
        state
            .passwords
            .insert(normalize_dn(ADMIN_DN), ADMIN_PASSWORD.to_string());

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().expect("directory lock");
        f(&mut state)
    }

    fn insert(&self, dn: &str, build: impl FnOnce(&mut Entry)) {
        let mut entry = Entry::new(dn);
        build(&mut entry);
        if let Some(category) = default_category(&entry) {
            if entry.get("objectCategory").is_none() {
                entry.set_text("objectCategory", &[category]);
            }
        }
        self.with_state(|state| state.entries.insert(normalize_dn(dn), entry));
    }

    fn rdn_value(dn: &str) -> String {
        explode_dn(dn)
            .ok()
            .and_then(|parts| parts.first().map(|(_, v)| unescape_dn_value(v)))
            .unwrap_or_default()
    }

    pub fn add_ou(&self, dn: &str) {
        self.insert(dn, |e| {
            e.set_text("objectClass", &["top", "organizationalUnit"]);
            e.set_text("ou", &[Self::rdn_value(dn).as_str()]);
        });
    }

    pub fn add_user(&self, dn: &str, sam: &str, extra: &[(&str, &str)]) {
        self.insert(dn, |e| {
            e.set_text("objectClass", &["top", "person", "organizationalPerson", "user"]);
            e.set_text("cn", &[Self::rdn_value(dn).as_str()]);
            e.set_text("sAMAccountName", &[sam]);
            e.set_text("userAccountControl", &["512"]);
            for (name, value) in extra {
                e.set_text(name, &[*value]);
            }
        });
    }

    pub fn add_group(&self, dn: &str, sam: &str, members: &[&str]) {
        self.insert(dn, |e| {
            e.set_text("objectClass", &["top", "group"]);
            e.set_text("cn", &[Self::rdn_value(dn).as_str()]);
            e.set_text("sAMAccountName", &[sam]);
            e.set_text("member", members);
        });
    }

    pub fn set_text(&self, dn: &str, attr: &str, values: &[&str]) {
        self.with_state(|state| {
            if let Some(entry) = state.entries.get_mut(&normalize_dn(dn)) {
                entry.set_text(attr, values);
            }
        });
    }

    pub fn set_binary(&self, dn: &str, attr: &str, value: Vec<u8>) {
        self.with_state(|state| {
            if let Some(entry) = state.entries.get_mut(&normalize_dn(dn)) {
                entry.set(attr, vec![value]);
            }
        });
    }

    /// Refuse connections to `uri`
    pub fn set_down(&self, uri: &str) {
        self.with_state(|state| state.down.insert(uri.to_string()));
    }

    /// Accept connections and binds on `uri` but time out every search
    pub fn set_slow(&self, uri: &str) {
        self.with_state(|state| state.slow.insert(uri.to_string()));
    }

    /// Number of connection attempts so far
    pub fn connects(&self) -> usize {
        self.with_state(|state| state.connects)
    }

    pub async fn login(&self, params: ConnParams) -> Result<Session> {
        Session::login_with(params, Arc::new(self.clone()), &DomainLocator).await
    }

    pub async fn admin_session(&self) -> Session {
        let params = ConnParams::new(
            vec!["ldap://dc1.domain.local".to_string()],
            ADMIN_DN,
            ADMIN_PASSWORD,
            BASE_DN,
        );
        self.login(params).await.expect("admin login")
    }
}

#[async_trait]
impl Connector for MemoryDirectory {
    async fn connect(
        &self,
        uri: &str,
        _settings: &ConnectSettings,
    ) -> Result<Box<dyn DirectoryTransport>> {
        let refused = self.with_state(|state| {
            state.connects += 1;
            state.down.contains(uri)
        });
        if refused {
            return Err(AdError::connect_failure(format!("{}: connection refused", uri)));
        }
        Ok(Box::new(MemoryTransport {
            dir: self.clone(),
            uri: uri.to_string(),
        }))
    }
}

struct MemoryTransport {
    dir: MemoryDirectory,
    uri: String,
}

impl MemoryTransport {
    fn add_sync(state: &mut State, dn: &str, attrs: NewEntry) -> Result<()> {
        let key = normalize_dn(dn);
        let parts = explode_dn(dn)
            .map_err(|_| ldap_error(result_codes::INVALID_DN_SYNTAX, "invalid DN"))?;
        if parts.is_empty() {
            return Err(ldap_error(result_codes::INVALID_DN_SYNTAX, "invalid DN"));
        }
        if state.entries.contains_key(&key) {
            return Err(ldap_error(result_codes::ENTRY_ALREADY_EXISTS, "entry already exists"));
        }
        let parent = parent_dn(dn).map(|p| normalize_dn(&p)).unwrap_or_default();
        if !state.entries.contains_key(&parent) {
            return Err(ldap_error(result_codes::NO_SUCH_OBJECT, "parent does not exist"));
        }

        let mut entry = Entry::new(dn);
        for (name, values) in attrs {
            if name.eq_ignore_ascii_case("unicodePwd") {
                if let Some(pw) = values.first().and_then(|v| decode_password(v)) {
                    state.passwords.insert(key.clone(), pw);
                }
                continue;
            }
            entry.set(&name, values);
        }
        if let Some(category) = default_category(&entry) {
            if entry.get("objectCategory").is_none() {
                entry.set_text("objectCategory", &[category]);
            }
        }
        state.entries.insert(key, entry);
        Ok(())
    }

    fn modify_sync(state: &mut State, dn: &str, mods: Vec<Modification>) -> Result<()> {
        let key = normalize_dn(dn);
        let mut entry = state.entry(dn)?.clone();
        let mut password = state.passwords.get(&key).cloned();

        for m in mods {
            if m.attr().eq_ignore_ascii_case("unicodePwd") {
                let value = m.values().first().and_then(|v| decode_password(v));
                match m {
                    Modification::Delete { .. } => {
                        if value.is_none() || value != password {
                            return Err(ldap_error(
                                result_codes::CONSTRAINT_VIOLATION,
                                "old password does not match",
                            ));
                        }
                        password = None;
                    }
                    Modification::Add { .. } | Modification::Replace { .. } => password = value,
                }
                continue;
            }

            match m {
                Modification::Add { attr, values } => {
                    let mut current = entry.get(&attr).cloned().unwrap_or_default();
                    for value in values {
                        let text = String::from_utf8_lossy(&value).into_owned();
                        let wanted = normalize_dn(&text);
                        if current
                            .iter()
                            .any(|c| normalize_dn(&String::from_utf8_lossy(c)) == wanted)
                        {
                            return Err(ldap_error(
                                result_codes::ATTRIBUTE_OR_VALUE_EXISTS,
                                "value already exists",
                            ));
                        }
                        current.push(value);
                    }
                    entry.set(&attr, current);
                }
                Modification::Delete { attr, values } => {
                    let current = entry.get(&attr).cloned().ok_or_else(|| {
                        ldap_error(result_codes::NO_SUCH_ATTRIBUTE, "no such attribute")
                    })?;
                    if values.is_empty() {
                        entry.set(&attr, Vec::new());
                        continue;
                    }
                    let mut remaining = current;
                    for value in values {
                        let wanted = normalize_dn(&String::from_utf8_lossy(&value));
                        let before = remaining.len();
                        remaining.retain(|c| normalize_dn(&String::from_utf8_lossy(c)) != wanted);
                        if remaining.len() == before {
                            return Err(ldap_error(
                                result_codes::NO_SUCH_ATTRIBUTE,
                                "no such value",
                            ));
                        }
                    }
                    entry.set(&attr, remaining);
                }
                Modification::Replace { attr, values } => entry.set(&attr, values),
            }
        }

        state.entries.insert(key.clone(), entry);
        match password {
            Some(pw) => state.passwords.insert(key, pw),
            None => state.passwords.remove(&key),
        };
        Ok(())
    }

    fn delete_sync(state: &mut State, dn: &str) -> Result<()> {
        let key = normalize_dn(dn);
        state.entry(dn)?;
        if state.has_children(&key) {
            return Err(ldap_error(
                result_codes::NOT_ALLOWED_ON_NON_LEAF,
                "entry has children",
            ));
        }
        state.entries.remove(&key);
        state.passwords.remove(&key);
        state.relink_members(&key, None);
        Ok(())
    }

    fn modify_dn_sync(
        state: &mut State,
        dn: &str,
        new_rdn: &str,
        new_superior: Option<&str>,
    ) -> Result<()> {
        let old_key = normalize_dn(dn);
        let old_dn = state.entry(dn)?.dn.clone();
        let superior = match new_superior {
            Some(s) => s.to_string(),
            None => parent_dn(&old_dn).unwrap_or_default(),
        };
        state.entry(&superior)?;

        let new_dn = format!("{},{}", new_rdn, superior);
        let new_key = normalize_dn(&new_dn);
        if new_key != old_key && state.entries.contains_key(&new_key) {
            return Err(ldap_error(result_codes::ENTRY_ALREADY_EXISTS, "entry already exists"));
        }
        let old_depth = explode_dn(&old_dn).map(|p| p.len()).unwrap_or(0);

        let suffix = format!(",{}", old_key);
        let moved: Vec<String> = state
            .entries
            .keys()
            .filter(|k| **k == old_key || k.ends_with(&suffix))
            .cloned()
            .collect();

        for key in moved {
            let Some(mut entry) = state.entries.remove(&key) else {
                continue;
            };
            let parts = explode_dn(&entry.dn).unwrap_or_default();
            let keep = parts.len().saturating_sub(old_depth);
            let mut rebuilt: Vec<String> = parts[..keep]
                .iter()
                .map(|(a, v)| format!("{}={}", a, v))
                .collect();
            rebuilt.push(new_dn.clone());
            entry.dn = rebuilt.join(",");

            if key == old_key {
                if let Ok(rdn_parts) = explode_dn(new_rdn) {
                    if let Some((attr, value)) = rdn_parts.first() {
                        entry.set_text(attr, &[unescape_dn_value(value).as_str()]);
                    }
                }
            }

            let moved_key = normalize_dn(&entry.dn);
            if let Some(pw) = state.passwords.remove(&key) {
                state.passwords.insert(moved_key.clone(), pw);
            }
            let moved_dn = entry.dn.clone();
            state.entries.insert(moved_key, entry);
            state.relink_members(&key, Some(&moved_dn));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryTransport for MemoryTransport {
    async fn bind_simple(&mut self, bind_dn: &str, password: &str) -> Result<()> {
        let key = normalize_dn(bind_dn);
        let ok = self.dir.with_state(|state| {
            !password.is_empty() && state.passwords.get(&key).map(String::as_str) == Some(password)
        });
        if ok {
            Ok(())
        } else {
            Err(ldap_error(result_codes::INVALID_CREDENTIALS, "invalid credentials"))
        }
    }

    async fn bind_gssapi(&mut self, _server_fqdn: &str) -> Result<()> {
        Ok(())
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
        _limits: &SearchLimits,
    ) -> Result<Vec<RawEntry>> {
        let filter = parse_filter(filter)?;
        let base_key = normalize_dn(base);

        self.dir.with_state(|state| {
            if state.slow.contains(&self.uri) {
                return Err(AdError::client_timeout(format!("{}: search timed out", self.uri)));
            }
            if explode_dn(base).is_err() {
                return Err(ldap_error(result_codes::INVALID_DN_SYNTAX, "invalid DN"));
            }
            if !state.entries.contains_key(&base_key) {
                return Err(ldap_error(result_codes::NO_SUCH_OBJECT, "no such object"));
            }
            Ok(state
                .entries
                .iter()
                .filter(|(key, entry)| State::in_scope(key, entry, &base_key, scope))
                .filter(|(_, entry)| state.matches(entry, &filter))
                .map(|(_, entry)| state.project(entry, attrs))
                .collect())
        })
    }

    async fn add(&mut self, dn: &str, attrs: NewEntry) -> Result<()> {
        self.dir.with_state(|state| Self::add_sync(state, dn, attrs))
    }

    async fn modify(&mut self, dn: &str, mods: Vec<Modification>) -> Result<()> {
        self.dir.with_state(|state| Self::modify_sync(state, dn, mods))
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        self.dir.with_state(|state| Self::delete_sync(state, dn))
    }

    async fn modify_dn(
        &mut self,
        dn: &str,
        new_rdn: &str,
        new_superior: Option<&str>,
    ) -> Result<()> {
        self.dir
            .with_state(|state| Self::modify_dn_sync(state, dn, new_rdn, new_superior))
    }

    async fn unbind(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        assert!(parse_filter("(&(objectClass=user)(|(cn=a)(cn=b)))").is_ok());
        assert!(parse_filter("(!(cn=a))").is_ok());
        assert!(parse_filter("(cn=a").is_err());
        assert!(parse_filter("cn=a").is_err());
        assert!(matches!(
            parse_filter("(userAccountControl:1.2.840.113556.1.4.803:=2)").unwrap(),
            Filter::BitAnd(_, 2)
        ));
    }

    #[test]
    fn test_glob() {
        let pieces = |p: &str| p.split('*').map(String::from).collect::<Vec<_>>();
        assert!(glob_match("spengler", &pieces("sp*")));
        assert!(glob_match("spengler", &pieces("*ler")));
        assert!(glob_match("spengler", &pieces("s*g*r")));
        assert!(!glob_match("spengler", &pieces("x*")));
    }

    #[test]
    fn test_password_decoding() {
        let encoded = adclient_core::types::encode_password("Zuul");
        assert_eq!(decode_password(&encoded).unwrap(), "Zuul");
    }
}
