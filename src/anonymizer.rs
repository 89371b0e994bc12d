//! Client address masking.
//!
//! Nulls out the last octet of IPv4 addresses and everything after the NLA
//! of IPv6 addresses by default; see RFC 2374 section 3.1 for the unicast
//! structure of IPv6 addresses.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::AnonymizerError;

pub const DEFAULT_IPV4_MASK: &str = "255.255.255.0";
pub const DEFAULT_IPV6_MASK: &str = "ffff:ffff:ffff::";

#[derive(Debug, Clone)]
pub struct Anonymizer {
    ipv4_mask: Ipv4Addr,
    ipv6_mask: Ipv6Addr,
}

impl Default for Anonymizer {
    fn default() -> Self {
        Self {
            ipv4_mask: Ipv4Addr::new(255, 255, 255, 0),
            ipv6_mask: Ipv6Addr::new(0xffff, 0xffff, 0xffff, 0, 0, 0, 0, 0),
        }
    }
}

impl Anonymizer {
    pub fn new(ipv4_mask: &str, ipv6_mask: &str) -> Result<Self, AnonymizerError> {
        let ipv4_mask = ipv4_mask
            .parse::<Ipv4Addr>()
            .map_err(|_| AnonymizerError::InvalidMask(ipv4_mask.to_string()))?;
        let ipv6_mask = ipv6_mask
            .parse::<Ipv6Addr>()
            .map_err(|_| AnonymizerError::InvalidMask(ipv6_mask.to_string()))?;

        Ok(Self { ipv4_mask, ipv6_mask })
    }

    /// Mask an address string, re-rendering in canonical compressed form.
    ///
    /// IPv4-mapped IPv6 addresses are unmapped, masked with the IPv4 mask,
    /// and re-rendered in the `::ffff:` dotted form they arrived in.
    pub fn anonymize(&self, original: &str) -> Result<String, AnonymizerError> {
        let address = original
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| AnonymizerError::InvalidAddress(original.to_string()))?;

        match address {
            IpAddr::V4(v4) => Ok(self.mask_v4(v4).to_string()),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(mapped) => Ok(format!("::ffff:{}", self.mask_v4(mapped))),
                None => Ok(self.mask_v6(v6).to_string()),
            },
        }
    }

    fn mask_v4(&self, address: Ipv4Addr) -> Ipv4Addr {
        let mut octets = address.octets();
        for (octet, mask) in octets.iter_mut().zip(self.ipv4_mask.octets()) {
            *octet &= mask;
        }
        Ipv4Addr::from(octets)
    }

    fn mask_v6(&self, address: Ipv6Addr) -> Ipv6Addr {
        let mut octets = address.octets();
        for (octet, mask) in octets.iter_mut().zip(self.ipv6_mask.octets()) {
            *octet &= mask;
        }
        Ipv6Addr::from(octets)
    }
}
