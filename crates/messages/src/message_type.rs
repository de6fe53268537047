//! `@type` URIs: prefix, protocol family, version and message name.
//!
//! Both the legacy `did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/` prefix and the
//! `https://didcomm.org/` prefix are accepted on input. Outbound messages
//! always use the `https://didcomm.org/` form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MessageError;

pub const LEGACY_PREFIX: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/";
pub const DIDCOMM_PREFIX: &str = "https://didcomm.org/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    Legacy,
    DidComm,
}

impl Prefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prefix::Legacy => LEGACY_PREFIX,
            Prefix::DidComm => DIDCOMM_PREFIX,
        }
    }
}

/// A `major.minor` protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
}

impl ProtocolVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        ProtocolVersion { major, minor }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ProtocolVersion {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || MessageError::MalformedType(format!("bad protocol version '{}'", s));
        let (major, minor) = s.split_once('.').ok_or_else(bad)?;
        Ok(ProtocolVersion {
            major: major.parse().map_err(|_| bad())?,
            minor: minor.parse().map_err(|_| bad())?,
        })
    }
}

/// A parsed `@type` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageType {
    pub prefix: Prefix,
    pub family: String,
    pub version: ProtocolVersion,
    pub name: String,
}

impl MessageType {
    pub fn new(family: &str, version: ProtocolVersion, name: &str) -> Self {
        MessageType {
            prefix: Prefix::DidComm,
            family: family.to_string(),
            version,
            name: name.to_string(),
        }
    }

    pub fn parse(uri: &str) -> Result<Self, MessageError> {
        let (prefix, rest) = if let Some(rest) = uri.strip_prefix(LEGACY_PREFIX) {
            (Prefix::Legacy, rest)
        } else if let Some(rest) = uri.strip_prefix(DIDCOMM_PREFIX) {
            (Prefix::DidComm, rest)
        } else {
            return Err(MessageError::MalformedType(uri.to_string()));
        };

        let mut parts = rest.split('/');
        let (family, version, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(f), Some(v), Some(n)) if !f.is_empty() && !n.is_empty() => (f, v, n),
            _ => return Err(MessageError::MalformedType(uri.to_string())),
        };
        if parts.next().is_some() {
            return Err(MessageError::MalformedType(uri.to_string()));
        }

        Ok(MessageType {
            prefix,
            family: family.to_string(),
            version: version.parse()?,
            name: name.to_string(),
        })
    }

    pub fn uri(&self) -> String {
        format!(
            "{}{}/{}/{}",
            self.prefix.as_str(),
            self.family,
            self.version,
            self.name
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

impl FromStr for MessageType {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::parse(s)
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.uri())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        MessageType::parse(&s).map_err(serde::de::Error::custom)
    }
}
