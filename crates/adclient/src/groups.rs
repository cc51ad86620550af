//! Group resolver
//!
//! Membership is followed level by level: every level of the walk is one
//! search for all DNs in the current frontier. A visited set keyed by
//! normalized DN makes the walk terminate on cyclic nesting and keeps every
//! node from being expanded twice.

use crate::query::{eq_filter, SAM_ACCOUNT_NAME};
use crate::session::Session;
use adclient_core::error::result_codes;
use adclient_core::types::{DirectoryObject, Modification, SearchScope};
use adclient_core::utils::{naming_context, normalize_dn};
use adclient_core::Result;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// DNs per OR-filter when fetching a frontier
const FETCH_CHUNK: usize = 100;

const MEMBER: &str = "member";
const MEMBER_OF: &str = "memberOf";

/// Breadth-first walk state over a membership graph
#[derive(Debug, Default)]
pub(crate) struct MembershipWalk {
    visited: HashSet<String>,
    frontier: Vec<String>,
    found: Vec<String>,
}

impl MembershipWalk {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mark `dn` as seen without reporting it
    pub(crate) fn skip(&mut self, dn: &str) {
        self.visited.insert(normalize_dn(dn));
    }

    /// Queue `dn` for the next level; returns false if it was already seen
    pub(crate) fn push(&mut self, dn: &str) -> bool {
        if !self.visited.insert(normalize_dn(dn)) {
            return false;
        }
        self.frontier.push(dn.to_string());
        self.found.push(dn.to_string());
        true
    }

    pub(crate) fn next_level(&mut self) -> Vec<String> {
        std::mem::take(&mut self.frontier)
    }

    pub(crate) fn is_done(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Every DN pushed so far, in discovery order
    pub(crate) fn found(&self) -> &[String] {
        &self.found
    }
}

impl Session {
    /// Fetch the objects named by `dns`, one search per chunk of DNs.
    ///
    /// Members and groups may live anywhere in the domain, so each DN is
    /// looked up below its own naming context rather than the session's
    /// search base.
    async fn fetch_by_dn(
        &mut self,
        dns: &[String],
        attributes: &[&str],
    ) -> Result<HashMap<String, DirectoryObject>> {
        let mut by_context: BTreeMap<String, Vec<&String>> = BTreeMap::new();
        for dn in dns {
            by_context.entry(naming_context(dn)).or_default().push(dn);
        }

        let mut objects = HashMap::new();
        for (base, dns) in by_context {
            for chunk in dns.chunks(FETCH_CHUNK) {
                let filter = match chunk {
                    [single] => eq_filter("distinguishedName", single),
                    many => format!(
                        "(|{})",
                        many.iter()
                            .map(|dn| eq_filter("distinguishedName", dn))
                            .collect::<String>()
                    ),
                };
                let searched = self
                    .search(&base, SearchScope::Subtree, &filter, attributes)
                    .await;
                let found = match searched {
                    Ok(found) => found,
                    // a foreign domain this server does not hold
                    Err(e) if e.has_result_code(result_codes::NO_SUCH_OBJECT) => {
                        debug!("Naming context '{}' not held by this server", base);
                        break;
                    }
                    Err(e) => return Err(e),
                };
                for object in found {
                    objects.insert(normalize_dn(&object.dn), object);
                }
            }
        }
        Ok(objects)
    }

    /// Groups `user` belongs to, as short names.
    ///
    /// With `nested`, groups reached through other groups are included.
    pub async fn get_user_groups(&mut self, user: &str, nested: bool) -> Result<Vec<String>> {
        let user_dn = self.resolve_dn(user).await?;
        let direct = self.get_attribute(&user_dn, MEMBER_OF).await?;

        let mut walk = MembershipWalk::new();
        walk.skip(&user_dn);
        for dn in &direct {
            walk.push(dn);
        }

        let mut names = HashMap::new();
        while !walk.is_done() {
            let level = walk.next_level();
            debug!("Expanding {} groups of '{}'", level.len(), user_dn);

            let objects = self
                .fetch_by_dn(&level, &[SAM_ACCOUNT_NAME, MEMBER_OF])
                .await?;
            for object in objects.values() {
                names.insert(normalize_dn(&object.dn), object.short_name());
                if nested {
                    for parent in object.text(MEMBER_OF)? {
                        walk.push(&parent);
                    }
                }
            }
        }

        Ok(short_names(walk.found(), &names))
    }

    /// Members of `group`, as short names.
    ///
    /// Without `nested` every direct member is returned, groups included.
    /// With `nested` the members of member groups are followed and only the
    /// non-group members of the whole closure are returned.
    pub async fn get_users_in_group(&mut self, group: &str, nested: bool) -> Result<Vec<String>> {
        let group_dn = self.resolve_dn(group).await?;
        let direct = self.get_attribute(&group_dn, MEMBER).await?;

        let mut walk = MembershipWalk::new();
        walk.skip(&group_dn);
        for dn in &direct {
            walk.push(dn);
        }

        let mut names = HashMap::new();
        let mut groups = HashSet::new();
        while !walk.is_done() {
            let level = walk.next_level();
            debug!("Expanding {} members of '{}'", level.len(), group_dn);

            let attributes: &[&str] = if nested {
                &[SAM_ACCOUNT_NAME, "objectClass", MEMBER]
            } else {
                &[SAM_ACCOUNT_NAME, "objectClass"]
            };
            let objects = self.fetch_by_dn(&level, attributes).await?;
            for object in objects.values() {
                let key = normalize_dn(&object.dn);
                names.insert(key.clone(), object.short_name());
                if nested && object.is_group() {
                    groups.insert(key);
                    for member in object.text(MEMBER)? {
                        walk.push(&member);
                    }
                }
            }
        }

        let members: Vec<String> = walk
            .found()
            .iter()
            .filter(|dn| !groups.contains(&normalize_dn(dn)))
            .cloned()
            .collect();
        Ok(short_names(&members, &names))
    }

    pub async fn group_add_user(&mut self, group: &str, user: &str) -> Result<()> {
        let group_dn = self.resolve_dn(group).await?;
        let user_dn = self.resolve_dn(user).await?;

        debug!("Adding '{}' to '{}'", user_dn, group_dn);
        self.transport
            .modify(&group_dn, vec![Modification::add_text(MEMBER, &[user_dn.as_str()])])
            .await
    }

    pub async fn group_remove_user(&mut self, group: &str, user: &str) -> Result<()> {
        let group_dn = self.resolve_dn(group).await?;
        let user_dn = self.resolve_dn(user).await?;

        debug!("Removing '{}' from '{}'", user_dn, group_dn);
        self.transport
            .modify(&group_dn, vec![Modification::delete_text(MEMBER, &[user_dn.as_str()])])
            .await
    }
}

/// Map DNs to their short names; DNs that could not be read stay DNs
fn short_names(dns: &[String], names: &HashMap<String, String>) -> Vec<String> {
    let mut seen = HashSet::new();
    dns.iter()
        .map(|dn| names.get(&normalize_dn(dn)).cloned().unwrap_or_else(|| dn.clone()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
