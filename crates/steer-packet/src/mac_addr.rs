use std::str::FromStr;

use nom_derive::*;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use super::SteerParseError;

/// 6-byte IEEE 802 address. Used for clients, BSSIDs and transport
/// endpoints alike.
#[derive(Debug, Default, NomBE, PartialOrd, Ord, PartialEq, Eq, Clone, Copy, Hash)]
pub struct MacAddr {
    octets: [u8; 6],
}

impl MacAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.octets
    }

    pub fn is_zero(&self) -> bool {
        self.octets.iter().all(|&b| b == 0)
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self { octets }
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.octets[0],
            self.octets[1],
            self.octets[2],
            self.octets[3],
            self.octets[4],
            self.octets[5],
        )
    }
}

impl FromStr for MacAddr {
    type Err = SteerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| SteerParseError::InvalidMacAddr {
                message: s.to_string(),
            })?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| SteerParseError::InvalidMacAddr {
                message: s.to_string(),
            })?;
        }
        if parts.next().is_some() {
            return Err(SteerParseError::InvalidMacAddr {
                message: s.to_string(),
            });
        }
        Ok(Self { octets })
    }
}

impl Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
