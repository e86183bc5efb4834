//! IPv4 address and CIDR helpers.
//!
//! Parsing is strict: a CIDR with host bits set is rejected, the same way
//! network tooling rejects `10.0.0.1/24` when a network is expected.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrError {
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),
    #[error("invalid CIDR '{0}': {1}")]
    InvalidCidr(String, String),
}

/// An IPv4 network in CIDR notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Network containing `addr`; host bits are cleared and the prefix is
    /// capped at 32
    pub fn masked(addr: Ipv4Addr, prefix: u8) -> Self {
        let prefix = prefix.min(32);
        Ipv4Cidr {
            network: mask(addr, prefix),
            prefix,
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// True if `addr` lies inside this network
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        mask(addr, self.prefix) == self.network
    }

    /// True if the two networks share at least one address.
    ///
    /// Both network addresses are masked to the shorter of the two prefixes;
    /// the networks overlap iff the masked values are equal.
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        let shorter = self.prefix.min(other.prefix);
        mask(self.network, shorter) == mask(other.network, shorter)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cidr(s)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = AddrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_cidr(&value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

fn mask(addr: Ipv4Addr, prefix: u8) -> Ipv4Addr {
    let bits = u32::from(addr);
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) };
    Ipv4Addr::from(bits & mask)
}

/// Parse a dotted-quad IPv4 literal
///
/// # Examples
/// ```
/// use deploycheck::utils::ip_utils::parse_ipv4;
///
/// assert!(parse_ipv4("192.168.10.5").is_ok());
/// assert!(parse_ipv4("192.168.10.256").is_err());
/// ```
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, AddrError> {
    s.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| AddrError::InvalidAddress(s.to_string()))
}

/// Parse a CIDR block such as `10.10.0.0/23`.
///
/// A bare address is accepted as a /32. Host bits beyond the prefix are
/// rejected.
///
/// # Examples
/// ```
/// use deploycheck::utils::ip_utils::parse_cidr;
///
/// let net = parse_cidr("10.10.0.0/23").unwrap();
/// assert_eq!(net.prefix(), 23);
/// assert!(parse_cidr("10.10.1.0/23").is_err()); // host bits set
/// ```
pub fn parse_cidr(s: &str) -> Result<Ipv4Cidr, AddrError> {
    let trimmed = s.trim();
    let (addr_part, prefix_part) = match trimmed.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (trimmed, None),
    };

    let network = addr_part
        .parse::<Ipv4Addr>()
        .map_err(|_| AddrError::InvalidCidr(s.to_string(), "bad network address".to_string()))?;

    let prefix = match prefix_part {
        Some(p) => p
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| AddrError::InvalidCidr(s.to_string(), format!("bad prefix length '{}'", p)))?,
        None => 32,
    };

    if mask(network, prefix) != network {
        return Err(AddrError::InvalidCidr(s.to_string(), "host bits set".to_string()));
    }

    Ok(Ipv4Cidr { network, prefix })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Cidr {
        parse_cidr(s).unwrap()
    }

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_ipv4("10.0.0.5").unwrap(), Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(parse_ipv4(" 10.0.0.5 ").unwrap(), Ipv4Addr::new(10, 0, 0, 5));
        assert!(parse_ipv4("10.0.0").is_err());
        assert!(parse_ipv4("not-an-ip").is_err());
        assert!(parse_ipv4("::1").is_err());
    }

    #[test]
    fn test_parse_cidr() {
        let cidr = net("10.10.0.0/23");
        assert_eq!(cidr.network(), Ipv4Addr::new(10, 10, 0, 0));
        assert_eq!(cidr.prefix(), 23);
        assert_eq!(cidr.to_string(), "10.10.0.0/23");

        assert_eq!(net("10.1.2.3").prefix(), 32);
        assert_eq!(net("0.0.0.0/0").prefix(), 0);

        assert!(matches!(parse_cidr("10.10.1.0/23"), Err(AddrError::InvalidCidr(_, _))));
        assert!(parse_cidr("10.10.0.0/33").is_err());
        assert!(parse_cidr("10.10.0.0/").is_err());
        assert!(parse_cidr("10.10.0/24").is_err());
    }

    #[test]
    fn test_masked() {
        let cidr = Ipv4Cidr::masked(Ipv4Addr::new(10, 1, 2, 3), 16);
        assert_eq!(cidr.to_string(), "10.1.0.0/16");
        assert_eq!(Ipv4Cidr::masked(Ipv4Addr::new(10, 1, 2, 3), 40).prefix(), 32);
    }

    #[test]
    fn test_contains() {
        let infra = net("192.168.10.0/24");
        assert!(infra.contains(Ipv4Addr::new(192, 168, 10, 1)));
        assert!(infra.contains(Ipv4Addr::new(192, 168, 10, 255)));
        assert!(!infra.contains(Ipv4Addr::new(192, 168, 11, 1)));
        assert!(net("0.0.0.0/0").contains(Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_overlaps() {
        let wide = net("10.10.0.0/23");
        let inner = net("10.10.1.0/24");
        let outside = net("10.10.2.0/24");

        assert!(wide.overlaps(&inner));
        assert!(inner.overlaps(&wide));
        assert!(!wide.overlaps(&outside));
        assert!(!outside.overlaps(&wide));
        assert!(wide.overlaps(&wide));
        assert!(net("0.0.0.0/0").overlaps(&outside));
    }

    #[test]
    fn test_overlap_symmetry_over_a_grid() {
        let nets: Vec<Ipv4Cidr> = [
            "10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24", "10.2.0.0/16",
            "172.16.0.0/12", "172.20.0.0/16", "192.168.0.0/24", "192.168.0.128/25",
        ]
        .iter()
        .map(|s| net(s))
        .collect();

        for a in &nets {
            assert!(a.overlaps(a), "{} should overlap itself", a);
            for b in &nets {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{} vs {}", a, b);
            }
        }
    }
}
