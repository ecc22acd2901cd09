//! Selection of physical disks by hints.
//!
//! A hint is a mapping of device property to an expected value, for instance
//! `{serial: S1}` or `{size: ">= 100", rotational: false}`. String properties
//! accept the operators `s==` (the default), `s!=`, `s<`, `s<=`, `s>`, `s>=`,
//! `<in>` (substring) and `<or>` (any of several values). A string property
//! given as a bare number also matches decimal or `0x` hexadecimal device text
//! of the same value. The size, in GiB,
//! accepts `==` (the default), `!=`, `<`, `<=`, `>`, `>=` and `<or>`.

use std::str::FromStr;

use log::trace;
use serde_json::Value;
use strum_macros::{EnumString, IntoStaticStr};

use raidplan_api::{
    config::{HintValue, PhysicalDiskHint},
    constants::{DEV_DISK_BY_PATH, DEV_PATH, GIB},
    error::{InvalidHintError, InvalidInputError, RaidplanError},
    inventory::DeviceRecord,
};

/// Finds the block devices matching a physical disk hint.
pub trait HintMatcher {
    /// Returns the names of the devices matching the hint. The order must only
    /// depend on the arguments. An empty list means nothing matched; errors are
    /// reserved for hints that cannot be interpreted.
    fn find_devices(
        &self,
        devices: &[DeviceRecord],
        hint: &PhysicalDiskHint,
    ) -> Result<Vec<String>, RaidplanError>;
}

/// Hint matcher comparing hints against the fields of the device records.
/// Matching devices are returned in inventory order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceHintMatcher;

impl DeviceHintMatcher {
    /// Checks that every entry of the hint can be interpreted.
    pub fn check(&self, hint: &PhysicalDiskHint) -> Result<(), InvalidHintError> {
        parse_hint(hint).map(|_| ())
    }
}

impl HintMatcher for DeviceHintMatcher {
    fn find_devices(
        &self,
        devices: &[DeviceRecord],
        hint: &PhysicalDiskHint,
    ) -> Result<Vec<String>, RaidplanError> {
        let conditions = parse_hint(hint)
            .map_err(|e| RaidplanError::new(InvalidInputError::InvalidHint(e)))?;

        let matching: Vec<String> = devices
            .iter()
            .filter(|device| {
                conditions
                    .iter()
                    .all(|(name, condition)| condition.matches(device.get(name.field())))
            })
            .filter_map(|device| device.name().map(String::from))
            .collect();

        trace!("Devices matching hint {hint}: {matching:?}");
        Ok(matching)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
enum HintName {
    Name,
    Model,
    Vendor,
    Serial,
    Wwn,
    WwnWithExtension,
    WwnVendorExtension,
    Hctl,
    ByPath,
    Tran,
    Size,
    Rotational,
}

impl HintName {
    /// Name of the device record field the hint is compared against.
    fn field(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn holds<T: Ord + ?Sized>(self, actual: &T, expected: &T) -> bool {
        match self {
            Comparison::Eq => actual == expected,
            Comparison::Ne => actual != expected,
            Comparison::Lt => actual < expected,
            Comparison::Le => actual <= expected,
            Comparison::Gt => actual > expected,
            Comparison::Ge => actual >= expected,
        }
    }
}

// Longer operators first, "<=" must not be read as "<".
const STRING_OPERATORS: &[(&str, Comparison)] = &[
    ("s==", Comparison::Eq),
    ("s!=", Comparison::Ne),
    ("s<=", Comparison::Le),
    ("s>=", Comparison::Ge),
    ("s<", Comparison::Lt),
    ("s>", Comparison::Gt),
];

const NUMBER_OPERATORS: &[(&str, Comparison)] = &[
    ("==", Comparison::Eq),
    ("!=", Comparison::Ne),
    ("<=", Comparison::Le),
    (">=", Comparison::Ge),
    ("<", Comparison::Lt),
    (">", Comparison::Gt),
];

const OR_OPERATOR: &str = "<or>";
const IN_OPERATOR: &str = "<in>";

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Text(Comparison, String),
    Contains(String),
    AnyText(Vec<String>),
    /// String field given as a bare number in the document, e.g. an unquoted
    /// `wwn: 0x5000c500a1b2c3d4` that YAML reads as an integer.
    TextNumber(u64),
    Number(Comparison, u64),
    AnyNumber(Vec<u64>),
    Flag(bool),
}

impl Condition {
    /// Evaluates the condition against the value of a device field. Devices
    /// that do not report the field never match.
    fn matches(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };

        match self {
            Condition::Text(comparison, expected) => {
                text_of(actual).is_some_and(|a| comparison.holds(a.as_str(), expected.as_str()))
            }
            Condition::Contains(expected) => {
                text_of(actual).is_some_and(|a| a.contains(expected.as_str()))
            }
            Condition::AnyText(expected) => {
                text_of(actual).is_some_and(|a| expected.iter().any(|e| *e == a))
            }
            Condition::TextNumber(expected) => {
                text_of(actual).is_some_and(|a| parse_integer_text(&a) == Some(*expected))
            }
            Condition::Number(comparison, expected) => {
                gib_of(actual).is_some_and(|a| comparison.holds(&a, expected))
            }
            Condition::AnyNumber(expected) => {
                gib_of(actual).is_some_and(|a| expected.contains(&a))
            }
            Condition::Flag(expected) => flag_of(actual).is_some_and(|a| a == *expected),
        }
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads decimal or `0x` prefixed hexadecimal text as a number.
fn parse_integer_text(s: &str) -> Option<u64> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn gib_of(value: &Value) -> Option<u64> {
    let bytes = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    Some(bytes / GIB)
}

fn flag_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_u64().and_then(|n| parse_flag(&n.to_string())),
        Value::String(s) => parse_flag(s),
        _ => None,
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_hint(hint: &PhysicalDiskHint) -> Result<Vec<(HintName, Condition)>, InvalidHintError> {
    hint.iter()
        .map(|(name, value)| {
            let hint_name =
                HintName::from_str(name).map_err(|_| InvalidHintError::UnknownHint {
                    name: name.into(),
                })?;
            Ok((hint_name, parse_condition(hint_name, name, value)?))
        })
        .collect()
}

fn parse_condition(
    hint_name: HintName,
    name: &str,
    value: &HintValue,
) -> Result<Condition, InvalidHintError> {
    let invalid_value = || InvalidHintError::InvalidValue {
        name: name.into(),
        value: value.to_string(),
    };

    match (hint_name, value) {
        (HintName::Rotational, HintValue::Boolean(b)) => Ok(Condition::Flag(*b)),
        (HintName::Rotational, HintValue::Integer(n)) => parse_flag(&n.to_string())
            .map(Condition::Flag)
            .ok_or_else(invalid_value),
        (HintName::Rotational, HintValue::String(s)) => {
            parse_flag(s).map(Condition::Flag).ok_or_else(invalid_value)
        }
        (HintName::Size, HintValue::Integer(n)) => Ok(Condition::Number(Comparison::Eq, *n)),
        (HintName::Size, HintValue::String(s)) => parse_number_expression(name, s),
        (_, HintValue::Boolean(_)) => Err(invalid_value()),
        (_, HintValue::Integer(n)) => Ok(Condition::TextNumber(*n)),
        (_, HintValue::String(s)) => parse_text_expression(name, s).map(|condition| {
            match hint_name {
                HintName::Name => with_prefix(condition, DEV_PATH),
                HintName::ByPath => with_prefix(condition, DEV_DISK_BY_PATH),
                _ => condition,
            }
        }),
    }
}

/// Splits a leading `<word>` operator off an expression.
fn split_keyword(expression: &str) -> Option<(&str, &str)> {
    let rest = expression.strip_prefix('<')?;
    let end = rest.find('>')?;
    let keyword = &rest[..end];
    if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return None;
    }
    Some((&expression[..end + 2], &rest[end + 1..]))
}

fn split_alternatives(values: &str) -> Vec<String> {
    values
        .split(OR_OPERATOR)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

fn parse_text_expression(name: &str, expression: &str) -> Result<Condition, InvalidHintError> {
    let expression = expression.trim();

    if let Some((keyword, rest)) = split_keyword(expression) {
        return match keyword {
            IN_OPERATOR => Ok(Condition::Contains(rest.trim().into())),
            OR_OPERATOR => match split_alternatives(rest) {
                alternatives if alternatives.is_empty() => Err(InvalidHintError::InvalidValue {
                    name: name.into(),
                    value: expression.into(),
                }),
                alternatives => Ok(Condition::AnyText(alternatives)),
            },
            _ => Err(InvalidHintError::UnsupportedOperator {
                name: name.into(),
                operator: keyword.into(),
            }),
        };
    }

    for (operator, comparison) in STRING_OPERATORS {
        if let Some(rest) = expression.strip_prefix(operator) {
            return Ok(Condition::Text(*comparison, rest.trim().into()));
        }
    }

    Ok(Condition::Text(Comparison::Eq, expression.into()))
}

fn parse_number_expression(name: &str, expression: &str) -> Result<Condition, InvalidHintError> {
    let expression = expression.trim();
    let parse_number = |s: &str| {
        s.trim()
            .parse::<u64>()
            .map_err(|_| InvalidHintError::InvalidValue {
                name: name.into(),
                value: expression.into(),
            })
    };

    if let Some((keyword, rest)) = split_keyword(expression) {
        return match keyword {
            OR_OPERATOR => {
                let alternatives = split_alternatives(rest)
                    .iter()
                    .map(|alternative| parse_number(alternative))
                    .collect::<Result<Vec<_>, _>>()?;
                if alternatives.is_empty() {
                    return Err(InvalidHintError::InvalidValue {
                        name: name.into(),
                        value: expression.into(),
                    });
                }
                Ok(Condition::AnyNumber(alternatives))
            }
            _ => Err(InvalidHintError::UnsupportedOperator {
                name: name.into(),
                operator: keyword.into(),
            }),
        };
    }

    for (operator, comparison) in NUMBER_OPERATORS {
        if let Some(rest) = expression.strip_prefix(operator) {
            return Ok(Condition::Number(*comparison, parse_number(rest)?));
        }
    }

    Ok(Condition::Number(Comparison::Eq, parse_number(expression)?))
}

/// Hints on device paths may omit the directory, e.g. `name: sda`.
fn with_prefix(condition: Condition, directory: &str) -> Condition {
    let prefixed = |value: String| {
        if value.starts_with(&format!("{directory}/")) {
            value
        } else {
            format!("{directory}/{}", value.trim_start_matches('/'))
        }
    };

    match condition {
        Condition::Text(comparison, value) => Condition::Text(comparison, prefixed(value)),
        Condition::AnyText(values) => {
            Condition::AnyText(values.into_iter().map(prefixed).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use raidplan_api::{error::ErrorKind, inventory::BlockDevice};

    fn inventory() -> Vec<DeviceRecord> {
        vec![
            BlockDevice {
                name: "/dev/sda".into(),
                model: Some("Virtual Disk".into()),
                size: 32 * GIB,
                rotational: true,
                serial: Some("S1".into()),
                wwn: Some("0x5000c500a1b2c3d4".into()),
                vendor: Some("Msft".into()),
                hctl: Some("0:0:0:0".into()),
                by_path: Some("/dev/disk/by-path/pci-0000:00:1f.2-ata-1".into()),
                ..Default::default()
            },
            BlockDevice {
                name: "/dev/sdb".into(),
                model: Some("Virtual Disk".into()),
                size: 64 * GIB,
                rotational: true,
                serial: Some("S2".into()),
                vendor: Some("Msft".into()),
                hctl: Some("0:0:0:1".into()),
                ..Default::default()
            },
            BlockDevice {
                name: "/dev/nvme0n1".into(),
                model: Some("SAMSUNG MZVPV512HDGL".into()),
                size: 512 * GIB + 1,
                rotational: false,
                serial: Some("12345".into()),
                tran: Some("nvme".into()),
                ..Default::default()
            },
        ]
        .iter()
        .map(|device| device.to_record().unwrap())
        .collect()
    }

    fn find(hint: &[(&str, HintValue)]) -> Vec<String> {
        let hint: PhysicalDiskHint = hint.iter().cloned().collect();
        DeviceHintMatcher.find_devices(&inventory(), &hint).unwrap()
    }

    fn find_err(hint: &[(&str, HintValue)]) -> InvalidHintError {
        let hint: PhysicalDiskHint = hint.iter().cloned().collect();
        let error = DeviceHintMatcher
            .find_devices(&inventory(), &hint)
            .unwrap_err();
        match error.kind() {
            ErrorKind::InvalidInput(InvalidInputError::InvalidHint(e)) => e.clone(),
            other => panic!("Unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_string_hints() {
        assert_eq!(find(&[("serial", "S1".into())]), vec!["/dev/sda"]);
        assert_eq!(find(&[("serial", "s== S2".into())]), vec!["/dev/sdb"]);
        assert_eq!(
            find(&[("model", "Virtual Disk".into())]),
            vec!["/dev/sda", "/dev/sdb"]
        );
        assert_eq!(
            find(&[("serial", "s!= S1".into())]),
            vec!["/dev/sdb", "/dev/nvme0n1"]
        );
        assert_eq!(find(&[("model", "<in> SAMSUNG".into())]), vec!["/dev/nvme0n1"]);
        assert_eq!(
            find(&[("serial", "<or> S2 <or> 12345".into())]),
            vec!["/dev/sdb", "/dev/nvme0n1"]
        );
        assert_eq!(find(&[("serial", "s< S2".into())]), vec!["/dev/sda", "/dev/nvme0n1"]);
        assert_eq!(find(&[("hctl", "0:0:0:1".into())]), vec!["/dev/sdb"]);
        assert!(find(&[("serial", "S9".into())]).is_empty());
    }

    #[test]
    fn test_numeric_value_on_string_hint() {
        assert_eq!(find(&[("serial", 12345u64.into())]), vec!["/dev/nvme0n1"]);
        assert!(find(&[("serial", 1234u64.into())]).is_empty());

        // YAML reads unquoted hexadecimal values as integers
        let hint: PhysicalDiskHint = serde_yaml::from_str("wwn: 0x5000c500a1b2c3d4").unwrap();
        assert_eq!(
            hint.iter().next(),
            Some(("wwn", &HintValue::Integer(0x5000c500a1b2c3d4)))
        );
        assert_eq!(
            DeviceHintMatcher.find_devices(&inventory(), &hint).unwrap(),
            vec!["/dev/sda"]
        );
        assert_eq!(
            find(&[("wwn", "0x5000c500a1b2c3d4".into())]),
            vec!["/dev/sda"]
        );
    }

    #[test]
    fn test_tran_hints() {
        assert_eq!(find(&[("tran", "nvme".into())]), vec!["/dev/nvme0n1"]);
        assert_eq!(
            find(&[("tran", "<or> sata <or> nvme".into())]),
            vec!["/dev/nvme0n1"]
        );
        // Devices without a reported transport never match
        assert!(find(&[("tran", "s!= nvme".into())]).is_empty());
    }

    #[test]
    fn test_parse_integer_text() {
        assert_eq!(parse_integer_text("12345"), Some(12345));
        assert_eq!(parse_integer_text(" 0x1F "), Some(31));
        assert_eq!(parse_integer_text("0X1f"), Some(31));
        assert_eq!(parse_integer_text("eui.002538646100e442"), None);
        assert_eq!(parse_integer_text("S1"), None);
    }

    #[test]
    fn test_missing_field_never_matches() {
        assert_eq!(
            find(&[("wwn", "s!= 0x5000c500a1b2c3d4".into())]),
            Vec::<String>::new()
        );
        assert_eq!(
            find(&[("vendor", "s!= Msft".into())]),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_size_hints() {
        assert_eq!(find(&[("size", 32u64.into())]), vec!["/dev/sda"]);
        assert_eq!(find(&[("size", "512".into())]), vec!["/dev/nvme0n1"]);
        assert_eq!(
            find(&[("size", ">= 64".into())]),
            vec!["/dev/sdb", "/dev/nvme0n1"]
        );
        assert_eq!(find(&[("size", "< 64".into())]), vec!["/dev/sda"]);
        assert_eq!(find(&[("size", "!= 64".into())]), vec!["/dev/sda", "/dev/nvme0n1"]);
        assert_eq!(
            find(&[("size", "<or> 32 <or> 64".into())]),
            vec!["/dev/sda", "/dev/sdb"]
        );
    }

    #[test]
    fn test_rotational_hints() {
        assert_eq!(find(&[("rotational", false.into())]), vec!["/dev/nvme0n1"]);
        assert_eq!(
            find(&[("rotational", "yes".into())]),
            vec!["/dev/sda", "/dev/sdb"]
        );
        assert_eq!(find(&[("rotational", 0u64.into())]), vec!["/dev/nvme0n1"]);
    }

    #[test]
    fn test_path_hints() {
        assert_eq!(find(&[("name", "sdb".into())]), vec!["/dev/sdb"]);
        assert_eq!(find(&[("name", "/dev/sdb".into())]), vec!["/dev/sdb"]);
        assert_eq!(
            find(&[("name", "<or> sda <or> /dev/nvme0n1".into())]),
            vec!["/dev/sda", "/dev/nvme0n1"]
        );
        assert_eq!(
            find(&[("by_path", "pci-0000:00:1f.2-ata-1".into())]),
            vec!["/dev/sda"]
        );
        assert_eq!(
            find(&[("by_path", "/dev/disk/by-path/pci-0000:00:1f.2-ata-1".into())]),
            vec!["/dev/sda"]
        );
    }

    #[test]
    fn test_all_hints_must_match() {
        assert_eq!(
            find(&[("model", "Virtual Disk".into()), ("size", ">= 64".into())]),
            vec!["/dev/sdb"]
        );
        assert!(find(&[("serial", "S1".into()), ("size", 64u64.into())]).is_empty());
    }

    #[test]
    fn test_invalid_hints() {
        assert_eq!(
            find_err(&[("colour", "blue".into())]),
            InvalidHintError::UnknownHint {
                name: "colour".into()
            }
        );
        assert_eq!(
            find_err(&[("size", "big".into())]),
            InvalidHintError::InvalidValue {
                name: "size".into(),
                value: "big".into()
            }
        );
        assert_eq!(
            find_err(&[("size", true.into())]),
            InvalidHintError::InvalidValue {
                name: "size".into(),
                value: "true".into()
            }
        );
        assert_eq!(
            find_err(&[("rotational", "sometimes".into())]),
            InvalidHintError::InvalidValue {
                name: "rotational".into(),
                value: r#""sometimes""#.into()
            }
        );
        assert_eq!(
            find_err(&[("size", "<in> 10".into())]),
            InvalidHintError::UnsupportedOperator {
                name: "size".into(),
                operator: "<in>".into()
            }
        );
        assert_eq!(
            find_err(&[("serial", "<all-in> S1".into())]),
            InvalidHintError::UnsupportedOperator {
                name: "serial".into(),
                operator: "<all-in>".into()
            }
        );
        assert_eq!(
            find_err(&[("serial", "<or>".into())]),
            InvalidHintError::InvalidValue {
                name: "serial".into(),
                value: "<or>".into()
            }
        );
    }

    #[test]
    fn test_check() {
        let hint: PhysicalDiskHint = [("serial", "S1")].into_iter().collect();
        DeviceHintMatcher.check(&hint).unwrap();

        let hint: PhysicalDiskHint = [("serials", "S1")].into_iter().collect();
        assert_eq!(
            DeviceHintMatcher.check(&hint),
            Err(InvalidHintError::UnknownHint {
                name: "serials".into()
            })
        );
    }

    #[test]
    fn test_split_keyword() {
        assert_eq!(split_keyword("<in> abc"), Some(("<in>", " abc")));
        assert_eq!(split_keyword("<or>a<or>b"), Some(("<or>", "a<or>b")));
        assert_eq!(split_keyword("<= 10"), None);
        assert_eq!(split_keyword("< 10"), None);
        assert_eq!(split_keyword("abc"), None);
    }
}
