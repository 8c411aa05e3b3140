//! Configuration option model
//!
//! Deserialized payload of the `rr_config` endpoint and the per-type value
//! conversions used when displaying and submitting option values. Each
//! option arrives as a `NAME=VALUE` string plus a type tag; the stored
//! value is always text and the type tag decides how it is rendered and
//! validated.

use crate::error::ValidationError;
use crate::format::{format_precision, remove_trailing_zeros, CONFIG_PRECISION};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Option value type reported by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum OptionKind {
    /// Stored as `0`/`1`, edited as `false`/`true`
    Bool,
    /// Floating-point number
    Double,
    /// Dotted-quad IPv4 address
    IpAddr,
    /// Six-octet MAC address
    MacAddr,
    /// Free text (also the fallback for unknown type tags)
    Text,
}

impl From<String> for OptionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "bool" => OptionKind::Bool,
            "double" => OptionKind::Double,
            "ip_addr" => OptionKind::IpAddr,
            "mac_addr" => OptionKind::MacAddr,
            "text" => OptionKind::Text,
            other => {
                tracing::debug!("Unknown option type '{}', treating as text", other);
                OptionKind::Text
            }
        }
    }
}

impl OptionKind {
    /// Type label shown in the options table
    pub fn describe(&self) -> &'static str {
        match self {
            OptionKind::Bool => "bool",
            OptionKind::Double => "double",
            OptionKind::IpAddr => "ip-addr",
            OptionKind::MacAddr => "mac-addr",
            OptionKind::Text => "unknown",
        }
    }

    /// Convert a stored value into its display form.
    pub fn convert_for_display(&self, raw: &str) -> Result<String, ValidationError> {
        match self {
            OptionKind::Bool => match raw {
                "0" => Ok("false".to_string()),
                "1" => Ok("true".to_string()),
                _ => Err(ValidationError::NotZeroOrOne),
            },
            OptionKind::Double => {
                let num: f64 = raw.parse().map_err(|_| ValidationError::NotNumeric)?;
                Ok(remove_trailing_zeros(&format_precision(
                    num,
                    CONFIG_PRECISION,
                )))
            }
            OptionKind::IpAddr => normalize_ip_addr(raw),
            OptionKind::MacAddr => normalize_mac_addr(raw),
            OptionKind::Text => Ok(raw.to_string()),
        }
    }

    /// Convert an entered value into the form sent to the firmware.
    pub fn convert_for_set(&self, input: &str) -> Result<String, ValidationError> {
        match self {
            OptionKind::Bool => match input {
                "false" => Ok("0".to_string()),
                "true" => Ok("1".to_string()),
                _ => Err(ValidationError::NotFalseOrTrue),
            },
            OptionKind::Double => Ok(input.to_string()),
            OptionKind::IpAddr => normalize_ip_addr(input),
            OptionKind::MacAddr => normalize_mac_addr(input),
            OptionKind::Text => Ok(input.to_string()),
        }
    }
}

/// One configuration option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    /// Option name (the part before the first `=`)
    pub name: String,
    /// Stored value as text
    pub value: String,
    /// Value type
    pub kind: OptionKind,
}

impl ConfigOption {
    /// Display form of the stored value, falling back to the raw text when
    /// the stored value does not validate for its own type.
    pub fn display_value(&self) -> String {
        self.kind
            .convert_for_display(&self.value)
            .unwrap_or_else(|_| self.value.clone())
    }
}

/// Raw option entry as sent by the firmware
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigOption {
    /// `NAME=VALUE` string, split at the first `=`
    pub nameval: String,
    /// Type tag
    #[serde(rename = "type")]
    pub kind: OptionKind,
}

/// Full `rr_config` payload
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigResponse {
    /// Options in firmware order
    pub options: Vec<RawConfigOption>,
}

/// Split raw options into an ordered name → option map.
///
/// Entries without a `=` separator are dropped.
pub fn parse_options_list(options: &[RawConfigOption]) -> BTreeMap<String, ConfigOption> {
    let mut result = BTreeMap::new();
    for raw in options {
        let Some(eq_index) = raw.nameval.find('=') else {
            tracing::warn!("Config option without separator: {:?}", raw.nameval);
            continue;
        };
        let name = raw.nameval[..eq_index].to_string();
        let value = raw.nameval[eq_index + 1..].to_string();
        result.insert(
            name.clone(),
            ConfigOption {
                name,
                value,
                kind: raw.kind,
            },
        );
    }
    result
}

/// Normalize a dotted-quad IPv4 address, rejecting malformed input.
pub fn normalize_ip_addr(input: &str) -> Result<String, ValidationError> {
    let comps: Vec<&str> = input.split('.').collect();
    if comps.len() != 4 {
        return Err(ValidationError::AddressComponentCount);
    }
    let mut res_comps = Vec::with_capacity(4);
    for comp in comps {
        if comp.is_empty() || comp.len() > 3 || !comp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::AddressComponent);
        }
        let val: u32 = comp.parse().map_err(|_| ValidationError::AddressComponent)?;
        if val > 255 {
            return Err(ValidationError::AddressComponent);
        }
        res_comps.push(val.to_string());
    }
    Ok(res_comps.join("."))
}

/// Normalize a colon-separated MAC address to uppercase two-digit octets.
pub fn normalize_mac_addr(input: &str) -> Result<String, ValidationError> {
    let comps: Vec<&str> = input.split(':').collect();
    if comps.len() != 6 {
        return Err(ValidationError::AddressComponentCount);
    }
    let mut res_comps = Vec::with_capacity(6);
    for comp in comps {
        if comp.is_empty() || comp.len() > 2 || !comp.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::AddressComponent);
        }
        let val = u8::from_str_radix(comp, 16).map_err(|_| ValidationError::AddressComponent)?;
        res_comps.push(format!("{val:02X}"));
    }
    Ok(res_comps.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(nameval: &str, kind: &str) -> RawConfigOption {
        RawConfigOption {
            nameval: nameval.to_string(),
            kind: OptionKind::from(kind.to_string()),
        }
    }

    #[test]
    fn nameval_splits_at_first_equals() {
        let parsed = parse_options_list(&[raw("Greeting=a=b", "text")]);
        let option = &parsed["Greeting"];
        assert_eq!(option.value, "a=b");
        assert_eq!(option.kind, OptionKind::Text);
    }

    #[test]
    fn malformed_nameval_is_dropped() {
        let parsed = parse_options_list(&[raw("NoSeparator", "text"), raw("A=1", "double")]);
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("A"));
    }

    #[test]
    fn bool_conversions() {
        assert_eq!(OptionKind::Bool.convert_for_display("0").unwrap(), "false");
        assert_eq!(OptionKind::Bool.convert_for_display("1").unwrap(), "true");
        assert_eq!(
            OptionKind::Bool.convert_for_display("yes"),
            Err(ValidationError::NotZeroOrOne)
        );
        assert_eq!(OptionKind::Bool.convert_for_set("true").unwrap(), "1");
        assert_eq!(
            OptionKind::Bool.convert_for_set("1"),
            Err(ValidationError::NotFalseOrTrue)
        );
    }

    #[test]
    fn double_display_strips_trailing_zeros() {
        assert_eq!(OptionKind::Double.convert_for_display("2.5000").unwrap(), "2.5");
        assert_eq!(OptionKind::Double.convert_for_display("100").unwrap(), "100");
        assert_eq!(
            OptionKind::Double.convert_for_display("abc"),
            Err(ValidationError::NotNumeric)
        );
    }

    #[test]
    fn ip_normalization() {
        assert_eq!(normalize_ip_addr("192.168.001.1").unwrap(), "192.168.1.1");
        assert_eq!(
            normalize_ip_addr("192.168.1"),
            Err(ValidationError::AddressComponentCount)
        );
        assert_eq!(
            normalize_ip_addr("192.168.1.256"),
            Err(ValidationError::AddressComponent)
        );
        assert_eq!(
            normalize_ip_addr("192.168.1.x"),
            Err(ValidationError::AddressComponent)
        );
    }

    #[test]
    fn mac_normalization() {
        assert_eq!(
            normalize_mac_addr("0:1:a:ff:B:c").unwrap(),
            "00:01:0A:FF:0B:0C"
        );
        assert_eq!(
            normalize_mac_addr("0:1:2:3:4"),
            Err(ValidationError::AddressComponentCount)
        );
        assert_eq!(
            normalize_mac_addr("0:1:2:3:4:zz"),
            Err(ValidationError::AddressComponent)
        );
    }

    #[test]
    fn unknown_type_falls_back_to_text() {
        let parsed = parse_options_list(&[raw("X=anything", "mystery")]);
        assert_eq!(parsed["X"].kind, OptionKind::Text);
        assert_eq!(parsed["X"].display_value(), "anything");
    }

    #[test]
    fn display_value_falls_back_on_bad_stored_value() {
        let option = ConfigOption {
            name: "Flag".to_string(),
            value: "7".to_string(),
            kind: OptionKind::Bool,
        };
        assert_eq!(option.display_value(), "7");
    }
}
