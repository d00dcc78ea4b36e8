use crate::error::{Error, ErrorType};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Capability tokens declared on characteristics and descriptors.
///
/// The encrypt and secure tiers are only declared here; the platform BLE stack enforces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeFlag {
    Read,
    Write,
    Notify,
    EncryptRead,
    EncryptWrite,
    SecureRead,
    SecureWrite,
    WritableAuxiliaries,
}

impl AttributeFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeFlag::Read => "read",
            AttributeFlag::Write => "write",
            AttributeFlag::Notify => "notify",
            AttributeFlag::EncryptRead => "encrypt-read",
            AttributeFlag::EncryptWrite => "encrypt-write",
            AttributeFlag::SecureRead => "secure-read",
            AttributeFlag::SecureWrite => "secure-write",
            AttributeFlag::WritableAuxiliaries => "writable-auxiliaries",
        }
    }
}

impl fmt::Display for AttributeFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flag = match s {
            "read" => AttributeFlag::Read,
            "write" => AttributeFlag::Write,
            "notify" => AttributeFlag::Notify,
            "encrypt-read" => AttributeFlag::EncryptRead,
            "encrypt-write" => AttributeFlag::EncryptWrite,
            "secure-read" => AttributeFlag::SecureRead,
            "secure-write" => AttributeFlag::SecureWrite,
            "writable-auxiliaries" => AttributeFlag::WritableAuxiliaries,
            _ => {
                return Err(Error::from_string(
                    format!("Unknown attribute flag: {}", s),
                    ErrorType::InvalidArgs,
                ))
            }
        };
        Ok(flag)
    }
}

/// Ordered set of [`AttributeFlag`]s, kept in declaration order for export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AttributeFlag>", into = "Vec<AttributeFlag>")]
pub struct AttributeFlags(Vec<AttributeFlag>);

impl AttributeFlags {
    pub fn new() -> Self {
        AttributeFlags(Vec::new())
    }

    pub fn insert(&mut self, flag: AttributeFlag) {
        if !self.0.contains(&flag) {
            self.0.push(flag);
        }
    }

    pub fn contains(&self, flag: AttributeFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_readable(&self) -> bool {
        self.0.iter().any(|f| {
            matches!(
                f,
                AttributeFlag::Read | AttributeFlag::EncryptRead | AttributeFlag::SecureRead
            )
        })
    }

    pub fn is_writable(&self) -> bool {
        self.0.iter().any(|f| {
            matches!(
                f,
                AttributeFlag::Write | AttributeFlag::EncryptWrite | AttributeFlag::SecureWrite
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = AttributeFlag> + '_ {
        self.0.iter().copied()
    }

    /// Wire-visible flag strings.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|f| f.as_str().to_string()).collect()
    }
}

impl From<Vec<AttributeFlag>> for AttributeFlags {
    fn from(flags: Vec<AttributeFlag>) -> Self {
        flags.into_iter().collect()
    }
}

impl From<AttributeFlags> for Vec<AttributeFlag> {
    fn from(flags: AttributeFlags) -> Self {
        flags.0
    }
}

impl<const N: usize> From<[AttributeFlag; N]> for AttributeFlags {
    fn from(flags: [AttributeFlag; N]) -> Self {
        flags.into_iter().collect()
    }
}

impl FromIterator<AttributeFlag> for AttributeFlags {
    fn from_iter<I: IntoIterator<Item = AttributeFlag>>(iter: I) -> Self {
        let mut flags = AttributeFlags::new();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_vocabulary() {
        for s in [
            "read",
            "write",
            "notify",
            "encrypt-read",
            "encrypt-write",
            "secure-read",
            "secure-write",
            "writable-auxiliaries",
        ] {
            let flag: AttributeFlag = s.parse().unwrap();
            assert_eq!(flag.as_str(), s);
        }
        let err = "broadcast".parse::<AttributeFlag>().unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidArgs);
    }

    #[test]
    fn keeps_declaration_order_without_duplicates() {
        let flags = AttributeFlags::from([
            AttributeFlag::Write,
            AttributeFlag::Read,
            AttributeFlag::Write,
        ]);
        assert_eq!(flags.to_strings(), vec!["write", "read"]);
        assert!(flags.is_readable());
        assert!(flags.is_writable());
        assert!(!flags.contains(AttributeFlag::Notify));
    }

    #[test]
    fn deserializes_from_kebab_case_list() {
        let flags: AttributeFlags =
            serde_json::from_str(r#"["secure-read", "writable-auxiliaries"]"#).unwrap();
        assert!(flags.contains(AttributeFlag::SecureRead));
        assert!(flags.contains(AttributeFlag::WritableAuxiliaries));
        assert!(flags.is_readable());
        assert!(!flags.is_writable());
    }
}
