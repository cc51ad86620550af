//! Account control flags
//!
//! Active Directory keeps most account state in the `userAccountControl`
//! bitmask. Lock-out and expiry also depend on time-based attributes, so
//! flags are evaluated against an explicit "now".

use super::AttributeMap;
use crate::error::{AdError, ErrorKind, Result};
use crate::utils::filetime_to_unix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `userAccountControl` bits
pub mod uac {
    pub const ACCOUNTDISABLE: i64 = 0x0002;
    pub const LOCKOUT: i64 = 0x0010;
    pub const PASSWD_NOTREQD: i64 = 0x0020;
    pub const NORMAL_ACCOUNT: i64 = 0x0200;
    pub const WORKSTATION_TRUST_ACCOUNT: i64 = 0x1000;
    pub const DONT_EXPIRE_PASSWORD: i64 = 0x10000;

    /// Normal account, disabled, password never expires
    pub const NEW_USER: i64 = NORMAL_ACCOUNT | ACCOUNTDISABLE | DONT_EXPIRE_PASSWORD;
    /// Workstation trust account, no password required
    pub const NEW_COMPUTER: i64 = WORKSTATION_TRUST_ACCOUNT | PASSWD_NOTREQD;
}

pub const USER_ACCOUNT_CONTROL: &str = "userAccountControl";
pub const USER_ACCOUNT_CONTROL_COMPUTED: &str = "msDS-User-Account-Control-Computed";
pub const PWD_LAST_SET: &str = "pwdLastSet";
pub const ACCOUNT_EXPIRES: &str = "accountExpires";
pub const LOCKOUT_TIME: &str = "lockoutTime";
pub const ALLOW_DIALIN: &str = "msNPAllowDialin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountFlag {
    Disabled,
    Locked,
    Expired,
    MustChangePassword,
    DontExpirePassword,
    DialinAllowed,
}

impl AccountFlag {
    pub const ALL: [AccountFlag; 6] = [
        AccountFlag::Disabled,
        AccountFlag::Locked,
        AccountFlag::Expired,
        AccountFlag::MustChangePassword,
        AccountFlag::DontExpirePassword,
        AccountFlag::DialinAllowed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountFlag::Disabled => "disabled",
            AccountFlag::Locked => "locked",
            AccountFlag::Expired => "expired",
            AccountFlag::MustChangePassword => "mustChangePassword",
            AccountFlag::DontExpirePassword => "dontExpirePassword",
            AccountFlag::DialinAllowed => "dialinAllowed",
        }
    }
}

impl fmt::Display for AccountFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountFlag {
    type Err = AdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AccountFlag::ALL
            .iter()
            .copied()
            .find(|flag| flag.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AdError::config(format!("Unknown account flag: {}", s)))
    }
}

/// Raw account-control inputs read from a user object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    pub user_account_control: i64,
    pub computed_control: i64,
    pub pwd_last_set: Option<i64>,
    /// FILETIME; `0` and `i64::MAX` mean never
    pub account_expires: i64,
    pub dialin_allowed: bool,
}

impl AccountState {
    /// Attributes needed by [`AccountState::from_attributes`]
    pub const ATTRIBUTES: [&'static str; 5] = [
        USER_ACCOUNT_CONTROL,
        USER_ACCOUNT_CONTROL_COMPUTED,
        PWD_LAST_SET,
        ACCOUNT_EXPIRES,
        ALLOW_DIALIN,
    ];

    pub fn from_attributes(attrs: &AttributeMap) -> Result<Self> {
        Ok(Self {
            user_account_control: parse_int(attrs, USER_ACCOUNT_CONTROL)?.unwrap_or(0),
            computed_control: parse_int(attrs, USER_ACCOUNT_CONTROL_COMPUTED)?.unwrap_or(0),
            pwd_last_set: parse_int(attrs, PWD_LAST_SET)?,
            account_expires: parse_int(attrs, ACCOUNT_EXPIRES)?.unwrap_or(0),
            dialin_allowed: attrs
                .first_text(ALLOW_DIALIN)?
                .map(|v| v.eq_ignore_ascii_case("TRUE"))
                .unwrap_or(false),
        })
    }
}

/// Read an integer attribute. Absent is `None`; garbage is a protocol error.
pub fn parse_int(attrs: &AttributeMap, name: &str) -> Result<Option<i64>> {
    match attrs.first_text(name)? {
        Some(value) => value.trim().parse::<i64>().map(Some).map_err(|_| {
            AdError::new(
                ErrorKind::Protocol,
                crate::error::codes::UNKNOWN,
                format!("attribute '{}' is not an integer: '{}'", name, value),
            )
        }),
        None => Ok(None),
    }
}

/// Named account state flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountControl {
    pub disabled: bool,
    pub locked: bool,
    pub expired: bool,
    pub must_change_password: bool,
    pub dont_expire_password: bool,
    pub dialin_allowed: bool,
}

impl AccountControl {
    pub fn evaluate(state: &AccountState, now: DateTime<Utc>) -> Self {
        let uac = state.user_account_control;
        let dont_expire_password = uac & uac::DONT_EXPIRE_PASSWORD != 0;

        Self {
            disabled: uac & uac::ACCOUNTDISABLE != 0,
            locked: (state.computed_control | uac) & uac::LOCKOUT != 0,
            expired: now.timestamp() > filetime_to_unix(state.account_expires),
            must_change_password: state.pwd_last_set == Some(0) && !dont_expire_password,
            dont_expire_password,
            dialin_allowed: state.dialin_allowed,
        }
    }

    pub fn get(&self, flag: AccountFlag) -> bool {
        match flag {
            AccountFlag::Disabled => self.disabled,
            AccountFlag::Locked => self.locked,
            AccountFlag::Expired => self.expired,
            AccountFlag::MustChangePassword => self.must_change_password,
            AccountFlag::DontExpirePassword => self.dont_expire_password,
            AccountFlag::DialinAllowed => self.dialin_allowed,
        }
    }
}
