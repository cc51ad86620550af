//! Utility functions for directory names and Active Directory value formats

use crate::error::{AdError, Result};
use std::net::Ipv4Addr;

/// Split a DN into `(attribute, value)` pairs, leftmost RDN first.
///
/// Escaped separators (`\,`, `\=`) stay inside the value; values are kept in
/// their escaped form. An empty string is the root DN and yields no pairs.
pub fn explode_dn(dn: &str) -> Result<Vec<(String, String)>> {
    let dn = dn.trim();
    if dn.is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in dn.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escaped = true;
            }
            ',' | ';' => {
                parts.push(split_rdn(&current, dn)?);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if escaped {
        return Err(AdError::dn_syntax(dn));
    }
    parts.push(split_rdn(&current, dn)?);

    Ok(parts)
}

fn split_rdn(rdn: &str, dn: &str) -> Result<(String, String)> {
    let mut escaped = false;
    for (i, c) in rdn.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' => {
                let attr = rdn[..i].trim();
                let value = rdn[i + 1..].trim();
                if attr.is_empty() || value.is_empty() {
                    return Err(AdError::dn_syntax(dn));
                }
                return Ok((attr.to_string(), value.to_string()));
            }
            _ => {}
        }
    }
    Err(AdError::dn_syntax(dn))
}

/// Join `(attribute, value)` pairs back into a DN
pub fn merge_dn(parts: &[(String, String)]) -> String {
    parts
        .iter()
        .map(|(attr, value)| format!("{}={}", attr, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether `s` parses as a non-root DN
pub fn looks_like_dn(s: &str) -> bool {
    matches!(explode_dn(s), Ok(parts) if !parts.is_empty())
}

/// Case-folded DN used as a key for comparisons and visited sets.
///
/// Strings that are not DNs are folded as-is.
pub fn normalize_dn(dn: &str) -> String {
    match explode_dn(dn) {
        Ok(parts) => parts
            .iter()
            .map(|(attr, value)| format!("{}={}", attr.to_lowercase(), value.to_lowercase()))
            .collect::<Vec<_>>()
            .join(","),
        Err(_) => dn.trim().to_lowercase(),
    }
}

pub fn dn_eq(a: &str, b: &str) -> bool {
    normalize_dn(a) == normalize_dn(b)
}

/// DN of the container holding `dn`
pub fn parent_dn(dn: &str) -> Option<String> {
    let parts = explode_dn(dn).ok()?;
    if parts.len() < 2 {
        return None;
    }
    Some(merge_dn(&parts[1..]))
}

/// Leftmost RDN as `attr=value`
pub fn rdn(dn: &str) -> Option<String> {
    let parts = explode_dn(dn).ok()?;
    parts.first().map(|(attr, value)| format!("{}={}", attr, value))
}

/// `DC=corp,DC=example,DC=com` -> `corp.example.com`
pub fn dn_to_domain(dn: &str) -> String {
    explode_dn(dn)
        .unwrap_or_default()
        .into_iter()
        .filter(|(attr, _)| attr.eq_ignore_ascii_case("dc"))
        .map(|(_, value)| value)
        .collect::<Vec<_>>()
        .join(".")
}

/// `corp.example.com` -> `DC=corp,DC=example,DC=com`
pub fn domain_to_dn(domain: &str) -> String {
    domain
        .split('.')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(|label| format!("DC={}", label))
        .collect::<Vec<_>>()
        .join(",")
}

/// Domain naming context holding `dn`: its trailing `DC=` components
pub fn naming_context(dn: &str) -> String {
    domain_to_dn(&dn_to_domain(dn))
}

/// Escape a value for use inside an RDN (RFC 4514)
pub fn escape_dn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                out.push('\\');
                out.push(c);
            }
            '#' if i == 0 => out.push_str("\\#"),
            ' ' if i == 0 || i == last => out.push_str("\\ "),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

/// Undo RFC 4514 escaping: `\,` -> `,` and `\2C` -> `,`
pub fn unescape_dn_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let hex_pair = bytes
                .get(i + 1..i + 3)
                .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|s| u8::from_str_radix(s, 16).ok());
            match hex_pair {
                Some(b) => {
                    out.push(b);
                    i += 3;
                }
                None => {
                    out.push(bytes[i + 1]);
                    i += 2;
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Offset between 1601-01-01 and 1970-01-01 in 100ns intervals
const FILETIME_UNIX_EPOCH: i64 = 116_444_736_000_000_000;

/// Convert a Windows FILETIME (100ns intervals since 1601-01-01 UTC) to UNIX seconds.
///
/// `0` and `i64::MAX` mean "never" and map to `i64::MAX`.
pub fn filetime_to_unix(filetime: i64) -> i64 {
    if filetime == 0 || filetime == i64::MAX {
        return i64::MAX;
    }
    (filetime - FILETIME_UNIX_EPOCH) / 10_000_000
}

/// Dotted quad -> signed 32-bit integer as stored in `msRADIUSFramedIPAddress`
pub fn ip_to_int(ip: &str) -> Result<i32> {
    let addr: Ipv4Addr = ip
        .trim()
        .parse()
        .map_err(|_| AdError::config(format!("wrong ipv4 address: {}", ip)))?;
    Ok(u32::from(addr) as i32)
}

/// Signed 32-bit integer text -> dotted quad
pub fn int_to_ip(value: &str) -> Result<String> {
    let raw: i64 = value
        .trim()
        .parse()
        .map_err(|_| AdError::config(format!("wrong ip value: {}", value)))?;
    if raw < i64::from(i32::MIN) || raw > i64::from(u32::MAX) {
        return Err(AdError::config(format!("wrong ip value: {}", value)));
    }
    let bits = if raw < 0 { raw + (1 << 32) } else { raw };
    Ok(Ipv4Addr::from(bits as u32).to_string())
}

/// Binary security identifier -> `S-1-5-21-...`
pub fn decode_sid(bytes: &[u8]) -> Result<String> {
    if bytes.len() < 8 {
        return Err(AdError::unknown(format!(
            "SID too short: {} bytes",
            bytes.len()
        )));
    }

    let revision = bytes[0];
    let sub_count = bytes[1] as usize;
    if bytes.len() < 8 + sub_count * 4 {
        return Err(AdError::unknown(format!(
            "SID declares {} sub-authorities but has {} bytes",
            sub_count,
            bytes.len()
        )));
    }

    let authority = bytes[2..8]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

    let mut sid = format!("S-{}-{}", revision, authority);
    for chunk in bytes[8..8 + sub_count * 4].chunks_exact(4) {
        let sub = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        sid.push('-');
        sid.push_str(&sub.to_string());
    }
    Ok(sid)
}

/// Formats a binary GUID (Active Directory mixed-endian layout) as a string.
pub fn format_guid(bytes: &[u8]) -> String {
    if bytes.len() != 16 {
        return hex::encode(bytes);
    }

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[3],
        bytes[2],
        bytes[1],
        bytes[0],
        bytes[5],
        bytes[4],
        bytes[7],
        bytes[6],
        bytes[8],
        bytes[9],
        bytes[10],
        bytes[11],
        bytes[12],
        bytes[13],
        bytes[14],
        bytes[15]
    )
}
