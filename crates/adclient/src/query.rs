//! Query engine
//!
//! Scoped searches, existence checks, name resolution, attribute reads and
//! the fixed listings built on them.

use crate::session::Session;
use adclient_core::error::{result_codes, AdError};
use adclient_core::types::{
    AccountControl, AccountFlag, AccountState, AttributeMap, DirectoryObject, SearchScope,
    ALLOW_DIALIN,
};
use adclient_core::utils::{decode_sid, format_guid, int_to_ip, looks_like_dn};
use adclient_core::{Result, ALL_ATTRIBUTES, NO_ATTRIBUTES};
use chrono::Utc;
use ldap3::ldap_escape;
use std::collections::HashSet;
use tracing::debug;

pub const USERS_FILTER: &str = "(&(objectClass=user)(objectCategory=person))";
pub const DISABLED_USERS_FILTER: &str =
    "(&(objectClass=user)(objectCategory=person)(userAccountControl:1.2.840.113556.1.4.803:=2))";
pub const GROUPS_FILTER: &str = "(objectClass=group)";
pub const OUS_FILTER: &str = "(objectClass=organizationalUnit)";
pub const COMPUTERS_FILTER: &str = "(objectClass=computer)";
pub const DIALIN_USERS_FILTER: &str =
    "(&(objectClass=user)(objectCategory=person)(msNPAllowDialin=TRUE))";

pub const SAM_ACCOUNT_NAME: &str = "sAMAccountName";
pub const FRAMED_IP_ADDRESS: &str = "msRADIUSFramedIPAddress";

/// Equality filter with the value escaped
pub fn eq_filter(attr: &str, value: &str) -> String {
    format!("({}={})", attr, ldap_escape(value))
}

impl Session {
    /// Search below `base` and return the matching objects with `attributes`.
    ///
    /// The filter is passed to the server as is. An empty `attributes`
    /// slice asks for all user attributes.
    pub async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryObject>> {
        let attrs: Vec<String> = if attributes.is_empty() {
            vec![ALL_ATTRIBUTES.to_string()]
        } else {
            attributes.iter().map(|a| a.to_string()).collect()
        };
        let limits = self.limits();

        debug!("Search base='{}' scope={} filter='{}'", base, scope, filter);

        let entries = self
            .transport
            .search(base, scope, filter, &attrs, &limits)
            .await?;
        Ok(entries.into_iter().map(DirectoryObject::from_raw).collect())
    }

    /// DNs of the objects matching `filter`
    pub async fn search_dn(
        &mut self,
        base: &str,
        filter: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>> {
        let objects = self.search(base, scope, filter, &[NO_ATTRIBUTES]).await?;
        Ok(objects.into_iter().map(|o| o.dn).collect())
    }

    pub async fn object_exists(&mut self, dn: &str) -> Result<bool> {
        self.exists_with_filter(dn, "(objectClass=*)").await
    }

    /// Whether `dn` exists and has `object_class`
    pub async fn object_exists_with_class(&mut self, dn: &str, object_class: &str) -> Result<bool> {
        self.exists_with_filter(dn, &eq_filter("objectClass", object_class)).await
    }

    async fn exists_with_filter(&mut self, dn: &str, filter: &str) -> Result<bool> {
        if dn.trim().is_empty() {
            return Ok(false);
        }
        match self.search_dn(dn, filter, SearchScope::Base).await {
            Ok(found) => Ok(!found.is_empty()),
            Err(e)
                if e.has_result_code(result_codes::NO_SUCH_OBJECT)
                    || e.has_result_code(result_codes::INVALID_DN_SYNTAX) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// DN of `name`: an existing DN is returned unchanged, anything else is
    /// looked up as a `sAMAccountName` below the search base.
    pub async fn resolve_dn(&mut self, name: &str) -> Result<String> {
        if looks_like_dn(name) && self.object_exists(name).await? {
            return Ok(name.to_string());
        }

        let base = self.info.search_base.clone();
        let mut found = self
            .search_dn(&base, &eq_filter(SAM_ACCOUNT_NAME, name), SearchScope::Subtree)
            .await?;

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(AdError::object_not_found(name)),
            n => Err(AdError::ambiguous(name, n)),
        }
    }

    /// Read one object with `attributes` (all when empty)
    pub async fn get_object(
        &mut self,
        object: &str,
        attributes: &[&str],
    ) -> Result<DirectoryObject> {
        let dn = self.resolve_dn(object).await?;
        let found = match self
            .search(&dn, SearchScope::Base, "(objectClass=*)", attributes)
            .await
        {
            Ok(found) => found,
            Err(e) if e.has_result_code(result_codes::NO_SUCH_OBJECT) => {
                return Err(AdError::object_not_found(object))
            }
            Err(e) => return Err(e),
        };

        found
            .into_iter()
            .next()
            .ok_or_else(|| AdError::object_not_found(object))
    }

    /// Attributes of `object`; an empty `names` means all attributes
    pub async fn get_attributes(&mut self, object: &str, names: &[&str]) -> Result<AttributeMap> {
        Ok(self.get_object(object, names).await?.attributes)
    }

    /// Text values of one attribute, in server order. Absent is empty.
    pub async fn get_attribute(&mut self, object: &str, name: &str) -> Result<Vec<String>> {
        self.get_attributes(object, &[name]).await?.text(name)
    }

    pub async fn get_binary_attribute(&mut self, object: &str, name: &str) -> Result<Vec<Vec<u8>>> {
        Ok(self.get_attributes(object, &[name]).await?.bytes(name))
    }

    /// `objectSid` as `S-1-5-...`
    pub async fn get_object_sid(&mut self, object: &str) -> Result<String> {
        let values = self.get_binary_attribute(object, "objectSid").await?;
        let sid = values
            .first()
            .ok_or_else(|| AdError::attribute_not_found(object, "objectSid"))?;
        decode_sid(sid)
    }

    /// `objectGUID` in its registry form, `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`
    pub async fn get_object_guid(&mut self, object: &str) -> Result<String> {
        let values = self.get_binary_attribute(object, "objectGUID").await?;
        values
            .first()
            .map(|guid| format_guid(guid))
            .ok_or_else(|| AdError::attribute_not_found(object, "objectGUID"))
    }

    async fn first_value(&mut self, object: &str, name: &str) -> Result<String> {
        self.get_attribute(object, name).await?
            .into_iter()
            .next()
            .ok_or_else(|| AdError::attribute_not_found(object, name))
    }

    pub async fn get_user_display_name(&mut self, user: &str) -> Result<String> {
        self.first_value(user, "displayName").await
    }

    /// Framed IP address as a dotted quad
    pub async fn get_user_ip_address(&mut self, user: &str) -> Result<String> {
        let raw = self.first_value(user, FRAMED_IP_ADDRESS).await?;
        int_to_ip(&raw)
    }

    pub async fn is_dialin_user(&mut self, user: &str) -> Result<bool> {
        let values = self.get_attribute(user, ALLOW_DIALIN).await?;
        Ok(values
            .first()
            .map(|v| v.eq_ignore_ascii_case("TRUE"))
            .unwrap_or(false))
    }

    /// Short names of the objects matching `filter`, without duplicates
    pub async fn list_short_names(
        &mut self,
        base: &str,
        filter: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>> {
        let objects = self.search(base, scope, filter, &[SAM_ACCOUNT_NAME]).await?;

        let mut seen = HashSet::new();
        Ok(objects
            .iter()
            .map(DirectoryObject::short_name)
            .filter(|name| seen.insert(name.clone()))
            .collect())
    }

    async fn list_in_base(&mut self, filter: &str) -> Result<Vec<String>> {
        let base = self.info.search_base.clone();
        self.list_short_names(&base, filter, SearchScope::Subtree).await
    }

    pub async fn get_users(&mut self) -> Result<Vec<String>> {
        self.list_in_base(USERS_FILTER).await
    }

    pub async fn get_disabled_users(&mut self) -> Result<Vec<String>> {
        self.list_in_base(DISABLED_USERS_FILTER).await
    }

    pub async fn get_groups(&mut self) -> Result<Vec<String>> {
        self.list_in_base(GROUPS_FILTER).await
    }

    /// All organizational units. OUs carry no `sAMAccountName`, so their
    /// short identifier is the DN.
    pub async fn get_ous(&mut self) -> Result<Vec<String>> {
        self.list_in_base(OUS_FILTER).await
    }

    pub async fn get_dialin_users(&mut self) -> Result<Vec<String>> {
        self.list_in_base(DIALIN_USERS_FILTER).await
    }

    /// Short names of objects below the organizational unit `ou`
    pub async fn get_objects_in_ou(
        &mut self,
        ou: &str,
        filter: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>> {
        if !self.object_exists_with_class(ou, "organizationalUnit").await? {
            return Err(AdError::object_not_found(ou));
        }
        self.list_short_names(ou, filter, scope).await
    }

    pub async fn get_ous_in_ou(&mut self, ou: &str, scope: SearchScope) -> Result<Vec<String>> {
        let mut ous = self.get_objects_in_ou(ou, OUS_FILTER, scope).await?;
        // the base itself matches a subtree search
        ous.retain(|dn| !adclient_core::utils::dn_eq(dn, ou));
        Ok(ous)
    }

    pub async fn get_users_in_ou(&mut self, ou: &str, scope: SearchScope) -> Result<Vec<String>> {
        self.get_objects_in_ou(ou, USERS_FILTER, scope).await
    }

    pub async fn get_groups_in_ou(&mut self, ou: &str, scope: SearchScope) -> Result<Vec<String>> {
        self.get_objects_in_ou(ou, GROUPS_FILTER, scope).await
    }

    pub async fn get_computers_in_ou(
        &mut self,
        ou: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>> {
        self.get_objects_in_ou(ou, COMPUTERS_FILTER, scope).await
    }

    /// Account-control flags of `user`, evaluated now
    pub async fn get_user_controls(&mut self, user: &str) -> Result<AccountControl> {
        let attrs = self
            .get_attributes(user, &AccountState::ATTRIBUTES)
            .await?;
        let state = AccountState::from_attributes(&attrs)?;
        Ok(AccountControl::evaluate(&state, Utc::now()))
    }

    pub async fn get_user_control(&mut self, user: &str, flag: AccountFlag) -> Result<bool> {
        Ok(self.get_user_controls(user).await?.get(flag))
    }

    pub async fn is_user_disabled(&mut self, user: &str) -> Result<bool> {
        self.get_user_control(user, AccountFlag::Disabled).await
    }

    pub async fn is_user_locked(&mut self, user: &str) -> Result<bool> {
        self.get_user_control(user, AccountFlag::Locked).await
    }

    pub async fn is_user_expired(&mut self, user: &str) -> Result<bool> {
        self.get_user_control(user, AccountFlag::Expired).await
    }

    pub async fn is_user_must_change_password(&mut self, user: &str) -> Result<bool> {
        self.get_user_control(user, AccountFlag::MustChangePassword).await
    }

    pub async fn is_user_dont_expire_password(&mut self, user: &str) -> Result<bool> {
        self.get_user_control(user, AccountFlag::DontExpirePassword).await
    }
}
