use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 48-bit IEEE 802 MAC address.
///
/// Rendered as upper-case colon-separated hex (`AA:BB:CC:DD:EE:FF`).
/// Parsing accepts `:` or `-` as separators, case-insensitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacParseError {
    #[error("expected 6 octet groups, got {0}")]
    GroupCount(usize),
    #[error("invalid octet group {0:?}")]
    BadGroup(String),
}

impl MacAddr {
    /// The all-ones broadcast address, `FF:FF:FF:FF:FF:FF`.
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }
}

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut count = 0;
        for group in s.split(|c| c == ':' || c == '-') {
            if count == 6 {
                return Err(MacParseError::GroupCount(count + 1));
            }
            if group.len() != 2 {
                return Err(MacParseError::BadGroup(group.to_string()));
            }
            octets[count] = u8::from_str_radix(group, 16)
                .map_err(|_| MacParseError::BadGroup(group.to_string()))?;
            count += 1;
        }
        if count != 6 {
            return Err(MacParseError::GroupCount(count));
        }
        Ok(MacAddr(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}
