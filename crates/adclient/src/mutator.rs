//! Object mutator
//!
//! Creates, deletes, renames and moves directory objects and writes their
//! attributes. Each call is its own request to the server; a failed
//! multi-step call leaves whatever the failing step left behind.
//!
//! The account-control writers read `userAccountControl`, flip their own
//! bits and write the result back. Nothing stops another client from
//! changing the same attribute in between, in which case one of the two
//! updates is lost.

use crate::query::{FRAMED_IP_ADDRESS, SAM_ACCOUNT_NAME};
use crate::session::Session;
use adclient_core::error::{codes, AdError, ErrorKind};
use adclient_core::types::{
    encode_password, encode_text, parse_int, uac, Modification, NewEntry, ALLOW_DIALIN,
    LOCKOUT_TIME, USER_ACCOUNT_CONTROL,
};
use adclient_core::utils::{
    dn_to_domain, escape_dn_value, explode_dn, ip_to_int, merge_dn, parent_dn, rdn,
    unescape_dn_value,
};
use adclient_core::Result;
use tracing::{debug, info};

fn entry(attrs: Vec<(&str, Vec<&str>)>) -> NewEntry {
    attrs
        .into_iter()
        .map(|(name, values)| (name.to_string(), encode_text(&values)))
        .collect()
}

impl Session {
    async fn add_entry(&mut self, dn: &str, attrs: NewEntry) -> Result<()> {
        info!("Creating '{}'", dn);
        self.transport
            .add(dn, attrs)
            .await
            .map_err(|e| e.context(&format!("create {}", dn)))
    }

    async fn modify_entry(&mut self, dn: &str, mods: Vec<Modification>) -> Result<()> {
        debug!(
            "Modifying '{}': {}",
            dn,
            mods.iter().map(Modification::attr).collect::<Vec<_>>().join(", ")
        );
        self.transport.modify(dn, mods).await
    }

    /// Make sure `container` exists, creating it as an organizational unit
    async fn ensure_container(&mut self, container: &str) -> Result<()> {
        if self.object_exists(container).await? {
            return Ok(());
        }
        self.create_ou(container).await
    }

    /// Create a user account. It starts disabled, with a password that never
    /// expires; returns the new DN.
    pub async fn create_user(
        &mut self,
        cn: &str,
        container: &str,
        short_name: &str,
    ) -> Result<String> {
        self.ensure_container(container).await?;

        let dn = format!("CN={},{}", escape_dn_value(cn), container);
        let upn = format!("{}@{}", short_name, dn_to_domain(&dn));
        let control = uac::NEW_USER.to_string();

        self.add_entry(
            &dn,
            entry(vec![
                ("objectClass", vec!["top", "person", "organizationalPerson", "user"]),
                ("cn", vec![cn]),
                (SAM_ACCOUNT_NAME, vec![short_name]),
                ("userPrincipalName", vec![upn.as_str()]),
                (USER_ACCOUNT_CONTROL, vec![control.as_str()]),
            ]),
        )
        .await?;
        Ok(dn)
    }

    pub async fn create_group(
        &mut self,
        cn: &str,
        container: &str,
        short_name: &str,
    ) -> Result<String> {
        self.ensure_container(container).await?;

        let dn = format!("CN={},{}", escape_dn_value(cn), container);
        self.add_entry(
            &dn,
            entry(vec![
                ("objectClass", vec!["top", "group"]),
                ("cn", vec![cn]),
                (SAM_ACCOUNT_NAME, vec![short_name]),
            ]),
        )
        .await?;
        Ok(dn)
    }

    /// Create a computer account named `NAME$`
    pub async fn create_computer(&mut self, name: &str, container: &str) -> Result<String> {
        self.ensure_container(container).await?;

        let dn = format!("CN={},{}", escape_dn_value(name), container);
        let account = format!("{}$", name.to_uppercase());
        let control = uac::NEW_COMPUTER.to_string();

        self.add_entry(
            &dn,
            entry(vec![
                (
                    "objectClass",
                    vec!["top", "person", "organizationalPerson", "user", "computer"],
                ),
                ("cn", vec![name]),
                (SAM_ACCOUNT_NAME, vec![account.as_str()]),
                (USER_ACCOUNT_CONTROL, vec![control.as_str()]),
            ]),
        )
        .await?;
        Ok(dn)
    }

    /// Create the organizational unit `dn` and any missing parent units.
    ///
    /// Every component of `dn` must be an `OU` or a `DC`.
    pub async fn create_ou(&mut self, dn: &str) -> Result<()> {
        let parts = explode_dn(dn)?;
        if parts.is_empty()
            || !parts[0].0.eq_ignore_ascii_case("ou")
            || parts.iter().any(|(attr, _)| {
                !attr.eq_ignore_ascii_case("ou") && !attr.eq_ignore_ascii_case("dc")
            })
        {
            return Err(AdError::new(
                ErrorKind::Configuration,
                codes::DN_SYNTAX_ERROR,
                format!("'{}' is not an organizational unit DN", dn),
            ));
        }

        for i in (1..parts.len()).rev() {
            if !parts[i].0.eq_ignore_ascii_case("ou") {
                continue;
            }
            let ancestor = merge_dn(&parts[i..]);
            if !self.object_exists(&ancestor).await? {
                self.add_ou_entry(&ancestor, &parts[i].1).await?;
            }
        }
        self.add_ou_entry(dn, &parts[0].1).await
    }

    async fn add_ou_entry(&mut self, dn: &str, value: &str) -> Result<()> {
        let name = unescape_dn_value(value);
        self.add_entry(
            dn,
            entry(vec![
                ("objectClass", vec!["top", "organizationalUnit"]),
                ("ou", vec![name.as_str()]),
            ]),
        )
        .await
    }

    /// Delete one object. Objects with children are refused by the server.
    pub async fn delete_dn(&mut self, dn: &str) -> Result<()> {
        info!("Deleting '{}'", dn);
        self.transport
            .delete(dn)
            .await
            .map_err(|e| e.context(&format!("delete {}", dn)))
    }

    /// Give `object` the common name `cn`; returns the new DN
    pub async fn rename_dn(&mut self, object: &str, cn: &str) -> Result<String> {
        let dn = self.resolve_dn(object).await?;
        let parent = parent_dn(&dn).ok_or_else(|| AdError::dn_syntax(&dn))?;
        let new_rdn = format!("CN={}", escape_dn_value(cn));

        info!("Renaming '{}' to '{}'", dn, new_rdn);
        self.transport.modify_dn(&dn, &new_rdn, None).await?;
        Ok(format!("{},{}", new_rdn, parent))
    }

    /// Change both the account name and the common name of a user
    pub async fn rename_user(&mut self, user: &str, short_name: &str, cn: &str) -> Result<String> {
        let dn = self.user_dn(user).await?;
        let upn = format!("{}@{}", short_name, dn_to_domain(&dn));

        self.modify_entry(
            &dn,
            vec![
                Modification::replace_text(SAM_ACCOUNT_NAME, &[short_name]),
                Modification::replace_text("userPrincipalName", &[upn.as_str()]),
            ],
        )
        .await?;
        self.rename_dn(&dn, cn).await
    }

    pub async fn rename_group(
        &mut self,
        group: &str,
        short_name: &str,
        cn: &str,
    ) -> Result<String> {
        let dn = self.resolve_dn(group).await?;
        if !self.object_exists_with_class(&dn, "group").await? {
            return Err(AdError::new(
                ErrorKind::NotFound,
                codes::OBJECT_NOT_FOUND,
                format!("'{}' is not a group", group),
            ));
        }

        self.modify_entry(
            &dn,
            vec![Modification::replace_text(SAM_ACCOUNT_NAME, &[short_name])],
        )
        .await?;
        self.rename_dn(&dn, cn).await
    }

    /// Move `object` below `container`; returns the new DN
    pub async fn move_object(&mut self, object: &str, container: &str) -> Result<String> {
        let dn = self.resolve_dn(object).await?;
        let current_rdn = rdn(&dn).ok_or_else(|| AdError::dn_syntax(&dn))?;
        if !self.object_exists(container).await? {
            return Err(AdError::object_not_found(container));
        }

        info!("Moving '{}' to '{}'", dn, container);
        self.transport
            .modify_dn(&dn, &current_rdn, Some(container))
            .await?;
        Ok(format!("{},{}", current_rdn, container))
    }

    pub async fn move_user(&mut self, user: &str, container: &str) -> Result<String> {
        let dn = self.user_dn(user).await?;
        self.move_object(&dn, container).await
    }

    /// DN of `user`, which must be a user account
    async fn user_dn(&mut self, user: &str) -> Result<String> {
        let object = self.get_object(user, &["objectClass"]).await?;
        if !object.is_user() {
            return Err(AdError::new(
                ErrorKind::NotFound,
                codes::OBJECT_NOT_FOUND,
                format!("'{}' is not a user", user),
            ));
        }
        Ok(object.dn)
    }

    async fn set_user_attribute(&mut self, user: &str, attr: &str, value: &str) -> Result<()> {
        let dn = self.user_dn(user).await?;
        self.modify_entry(&dn, vec![replace_value(attr, value)]).await
    }

    /// Set one attribute of any object. An empty value clears it.
    pub async fn set_object_attribute(
        &mut self,
        object: &str,
        attr: &str,
        value: &str,
    ) -> Result<()> {
        let dn = self.resolve_dn(object).await?;
        self.modify_entry(&dn, vec![replace_value(attr, value)]).await
    }

    /// Replace all values of one attribute
    pub async fn set_object_attribute_values(
        &mut self,
        object: &str,
        attr: &str,
        values: &[&str],
    ) -> Result<()> {
        let dn = self.resolve_dn(object).await?;
        self.modify_entry(&dn, vec![Modification::replace_text(attr, values)]).await
    }

    pub async fn clear_object_attribute(&mut self, object: &str, attr: &str) -> Result<()> {
        let dn = self.resolve_dn(object).await?;
        self.modify_entry(&dn, vec![Modification::Replace {
            attr: attr.to_string(),
            values: Vec::new(),
        }])
        .await
    }

    pub async fn set_user_password(&mut self, user: &str, password: &str) -> Result<()> {
        let dn = self.user_dn(user).await?;
        info!("Setting password of '{}'", dn);
        self.modify_entry(
            &dn,
            vec![Modification::replace_bytes("unicodePwd", encode_password(password))],
        )
        .await
    }

    /// Change a password as the user would, proving the old one
    pub async fn change_user_password(
        &mut self,
        user: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let dn = self.user_dn(user).await?;
        info!("Changing password of '{}'", dn);
        self.modify_entry(
            &dn,
            vec![
                Modification::Delete {
                    attr: "unicodePwd".to_string(),
                    values: vec![encode_password(old_password)],
                },
                Modification::Add {
                    attr: "unicodePwd".to_string(),
                    values: vec![encode_password(new_password)],
                },
            ],
        )
        .await
    }

    pub async fn set_user_last_name(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "sn", value).await
    }

    pub async fn set_user_initials(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "initials", value).await
    }

    pub async fn set_user_first_name(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "givenName", value).await
    }

    pub async fn set_user_display_name(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "displayName", value).await
    }

    pub async fn set_user_room(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "physicalDeliveryOfficeName", value).await
    }

    pub async fn set_user_address(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "streetAddress", value).await
    }

    pub async fn set_user_info(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "info", value).await
    }

    pub async fn set_user_title(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "title", value).await
    }

    pub async fn set_user_department(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "department", value).await
    }

    pub async fn set_user_company(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "company", value).await
    }

    pub async fn set_user_phone(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "telephoneNumber", value).await
    }

    pub async fn set_user_description(&mut self, user: &str, value: &str) -> Result<()> {
        self.set_user_attribute(user, "description", value).await
    }

    /// Framed IP address from a dotted quad
    pub async fn set_user_ip_address(&mut self, user: &str, ip: &str) -> Result<()> {
        let value = ip_to_int(ip)?.to_string();
        self.set_user_attribute(user, FRAMED_IP_ADDRESS, &value).await
    }

    pub async fn set_user_dialin_allowed(&mut self, user: &str) -> Result<()> {
        self.set_user_attribute(user, ALLOW_DIALIN, "TRUE").await
    }

    pub async fn set_user_dialin_disabled(&mut self, user: &str) -> Result<()> {
        self.set_user_attribute(user, ALLOW_DIALIN, "FALSE").await
    }

    /// Read-modify-write of `userAccountControl`, sent together with `extra`
    async fn update_account_control(
        &mut self,
        user: &str,
        set: i64,
        clear: i64,
        extra: Vec<Modification>,
    ) -> Result<()> {
        let dn = self.user_dn(user).await?;
        let attrs = self.get_attributes(&dn, &[USER_ACCOUNT_CONTROL]).await?;
        let current = parse_int(&attrs, USER_ACCOUNT_CONTROL)?
            .ok_or_else(|| AdError::attribute_not_found(&dn, USER_ACCOUNT_CONTROL))?;

        let updated = (current | set) & !clear;
        let mut mods = extra;
        if updated != current {
            let value = updated.to_string();
            mods.push(Modification::replace_text(USER_ACCOUNT_CONTROL, &[value.as_str()]));
        }
        if mods.is_empty() {
            return Ok(());
        }
        self.modify_entry(&dn, mods).await
    }

    pub async fn enable_user(&mut self, user: &str) -> Result<()> {
        self.update_account_control(user, 0, uac::ACCOUNTDISABLE, Vec::new()).await
    }

    pub async fn disable_user(&mut self, user: &str) -> Result<()> {
        self.update_account_control(user, uac::ACCOUNTDISABLE, 0, Vec::new()).await
    }

    /// Reset the lockout time and clear a stale lockout bit
    pub async fn unlock_user(&mut self, user: &str) -> Result<()> {
        let reset = vec![Modification::replace_text(LOCKOUT_TIME, &["0"])];
        self.update_account_control(user, 0, uac::LOCKOUT, reset).await
    }
}

fn replace_value(attr: &str, value: &str) -> Modification {
    if value.is_empty() {
        Modification::Replace {
            attr: attr.to_string(),
            values: Vec::new(),
        }
    } else {
        Modification::replace_text(attr, &[value])
    }
}
