//! CIDR-aware address type and allowed-IP sets
//!
//! Both families share one 16-byte representation: IPv4 lives under the
//! IPv4-mapped IPv6 prefix `::ffff:0:0/96`, with the family bit length
//! recorded separately so text output keeps the dotted form. A single type
//! covers subnets and hosts; `network()` and `host()` are the two views.

use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::wg::Error;

/// Prefix bytes of IPv4-mapped IPv6 addresses (`::ffff:0:0/96`).
pub(crate) const V4_IN_V6_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];

/// An IP address plus prefix length, either a subnet or a host route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr {
    /// Unified address buffer; IPv4 is stored IPv4-mapped.
    addr: [u8; 16],
    /// Family bit length, 32 or 128. Fixed at parse time.
    bits: u8,
    /// Prefix length, `0..=bits`.
    prefix: u8,
}

impl Addr {
    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub(crate) fn buf(&self) -> &[u8; 16] {
        &self.addr
    }

    /// Netmask over the unified buffer. For IPv4 the mapped prefix counts
    /// as network bits, so the mask has `96 + prefix` leading ones.
    fn mask(&self) -> [u8; 16] {
        let ones = 128 - u32::from(self.bits) + u32::from(self.prefix);
        let mut mask = [0u8; 16];
        for (i, byte) in mask.iter_mut().enumerate() {
            let bit = i as u32 * 8;
            *byte = if ones >= bit + 8 {
                0xff
            } else if ones <= bit {
                0
            } else {
                0xff << (8 - (ones - bit))
            };
        }
        mask
    }

    /// The subnet address: host bits zeroed, prefix unchanged.
    pub fn network(&self) -> Addr {
        let mask = self.mask();
        let mut addr = self.addr;
        for i in 0..16 {
            addr[i] &= mask[i];
        }
        Addr { addr, ..*self }
    }

    /// Same address reinterpreted as a single host (`/32` or `/128`).
    pub fn host(&self) -> Addr {
        Addr {
            prefix: self.bits,
            ..*self
        }
    }

    /// First and last address of the subnet, inclusive. Both keep the
    /// subnet's own prefix length.
    pub fn range(&self) -> (Addr, Addr) {
        let mask = self.mask();
        let mut start = self.addr;
        let mut end = self.addr;
        for i in 0..16 {
            start[i] &= mask[i];
            end[i] = (end[i] & mask[i]) | !mask[i];
        }
        (Addr { addr: start, ..*self }, Addr { addr: end, ..*self })
    }

    /// Membership test over the unified buffer. Cross-family checks come
    /// out false because the v4-mapped prefix never matches a native v6
    /// network (and vice versa), except under a genuine `::/0`.
    pub fn contains(&self, other: &Addr) -> bool {
        let mask = self.mask();
        (0..16).all(|i| other.addr[i] & mask[i] == self.addr[i] & mask[i])
    }

    /// Big-endian numeric value of the address trimmed to the family
    /// length. Ordinal arithmetic only, never display.
    pub fn as_int(&self) -> u128 {
        if self.bits == 32 {
            let mut quad = [0u8; 4];
            quad.copy_from_slice(&self.addr[12..]);
            u128::from(u32::from_be_bytes(quad))
        } else {
            u128::from_be_bytes(self.addr)
        }
    }

    /// Inverse of `as_int`, always a host route of the given family.
    fn from_int(value: u128, bits: u8) -> Addr {
        let mut addr = [0u8; 16];
        if bits == 32 {
            addr[..12].copy_from_slice(&V4_IN_V6_PREFIX);
            addr[12..].copy_from_slice(&(value as u32).to_be_bytes());
        } else {
            addr = value.to_be_bytes();
        }
        Addr {
            addr,
            bits,
            prefix: bits,
        }
    }
}

impl Default for Addr {
    /// `::/0`. Parser scratch value for configs still missing an Address;
    /// never produced from valid input.
    fn default() -> Self {
        Addr {
            addr: [0; 16],
            bits: 128,
            prefix: 0,
        }
    }
}

impl FromStr for Addr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        let invalid = || Error::InvalidAddress(s.to_string());

        let (ip, prefix) = s.split_once('/').ok_or_else(invalid)?;

        // The textual form fixes the family for good.
        let (addr, bits) = if ip.contains(':') {
            let v6: Ipv6Addr = ip.parse().map_err(|_| invalid())?;
            (v6.octets(), 128)
        } else {
            let v4: Ipv4Addr = ip.parse().map_err(|_| invalid())?;
            (v4.to_ipv6_mapped().octets(), 32)
        };

        // Canonical decimal prefix only: no sign, no leading zeros.
        if prefix.is_empty()
            || !prefix.bytes().all(|b| b.is_ascii_digit())
            || (prefix.len() > 1 && prefix.starts_with('0'))
        {
            return Err(invalid());
        }
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        if prefix > bits {
            return Err(invalid());
        }

        Ok(Addr { addr, bits, prefix })
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits == 32 {
            let mut quad = [0u8; 4];
            quad.copy_from_slice(&self.addr[12..]);
            write!(f, "{}/{}", Ipv4Addr::from(quad), self.prefix)
        } else {
            write!(f, "{}/{}", Ipv6Addr::from(self.addr), self.prefix)
        }
    }
}

impl Ord for Addr {
    /// Specificity order: fewer host bits first, then raw buffer bytes,
    /// then family length. Drives the AllowedIPs rendering order.
    fn cmp(&self, other: &Self) -> Ordering {
        let self_hosts = self.bits - self.prefix;
        let other_hosts = other.bits - other.prefix;
        self_hosts
            .cmp(&other_hosts)
            .then_with(|| self.addr.cmp(&other.addr))
            .then_with(|| self.bits.cmp(&other.bits))
    }
}

impl PartialOrd for Addr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An AllowedIPs list, kept sorted most-specific first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddrSet(Vec<Addr>);

impl AddrSet {
    pub fn push(&mut self, addr: Addr) {
        self.0.push(addr);
        self.0.sort();
    }

    pub fn first(&self) -> Option<&Addr> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Addr> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Addr> for AddrSet {
    fn from(addr: Addr) -> Self {
        AddrSet(vec![addr])
    }
}

impl FromStr for AddrSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut addrs = Vec::new();
        for part in s.split(',') {
            addrs.push(part.trim().parse()?);
        }
        addrs.sort();
        Ok(AddrSet(addrs))
    }
}

impl fmt::Display for AddrSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for addr in &self.0 {
            write!(f, "{}{}", sep, addr)?;
            sep = ", ";
        }
        Ok(())
    }
}

/// Ordinal address allocation: the n-th address after the start of a range,
/// as produced by [`Addr::range`]. The last address of the range is never
/// handed out, so the sum must stay strictly below `end`. Checked addition
/// keeps the top of a full-width range from wrapping.
pub fn next_ip(start: &Addr, end: &Addr, n: u128) -> Result<Addr, Error> {
    let candidate = start
        .as_int()
        .checked_add(n)
        .filter(|v| *v < end.as_int())
        .ok_or(Error::AddressSpaceExhausted)?;
    Ok(Addr::from_int(candidate, start.bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    // (input, network, range start, range end, host)
    const VALID: [[&str; 5]; 7] = [
        [
            "0.0.0.0/0",
            "0.0.0.0/0",
            "0.0.0.0/0",
            "255.255.255.255/0",
            "0.0.0.0/32",
        ],
        [
            "1.2.3.4/8",
            "1.0.0.0/8",
            "1.0.0.0/8",
            "1.255.255.255/8",
            "1.2.3.4/32",
        ],
        [
            "1.2.3.4/16",
            "1.2.0.0/16",
            "1.2.0.0/16",
            "1.2.255.255/16",
            "1.2.3.4/32",
        ],
        [
            "1.2.3.4/24",
            "1.2.3.0/24",
            "1.2.3.0/24",
            "1.2.3.255/24",
            "1.2.3.4/32",
        ],
        [
            "1.2.3.4/32",
            "1.2.3.4/32",
            "1.2.3.4/32",
            "1.2.3.4/32",
            "1.2.3.4/32",
        ],
        [
            "255.255.255.255/32",
            "255.255.255.255/32",
            "255.255.255.255/32",
            "255.255.255.255/32",
            "255.255.255.255/32",
        ],
        ["::1/128", "::1/128", "::1/128", "::1/128", "::1/128"],
    ];

    const INVALID: [&str; 10] = [
        "1.2.3.4/33",
        "0.0.0.256/0",
        "1::0::1/128",
        "::1/129",
        "10.10.10.10.10",
        "0.0.0.0",
        "::",
        "1.2.3.4/",
        "1.2.3.4/+1",
        "1.2.3.4/08",
    ];

    #[test]
    fn test_roundtrip() {
        for row in VALID {
            let addr: Addr = row[0].parse().unwrap();
            assert_eq!(addr.to_string(), row[0]);
        }
    }

    #[test]
    fn test_network() {
        for row in VALID {
            let addr: Addr = row[0].parse().unwrap();
            assert_eq!(addr.network().to_string(), row[1], "network of {}", row[0]);
        }
    }

    #[test]
    fn test_range() {
        for row in VALID {
            let addr: Addr = row[0].parse().unwrap();
            let (start, end) = addr.range();
            assert_eq!(start.to_string(), row[2], "range start of {}", row[0]);
            assert_eq!(end.to_string(), row[3], "range end of {}", row[0]);
        }
    }

    #[test]
    fn test_host() {
        for row in VALID {
            let addr: Addr = row[0].parse().unwrap();
            let host = addr.host();
            assert_eq!(host.to_string(), row[4], "host of {}", row[0]);
            assert_eq!(host.prefix(), host.bits());
        }
    }

    #[test]
    fn test_v4_mapped_prefix() {
        for row in VALID {
            let addr: Addr = row[0].parse().unwrap();
            let mapped = addr.buf().starts_with(&V4_IN_V6_PREFIX);
            assert_eq!(
                addr.bits() == 32,
                mapped,
                "v4-in-v6 prefix mismatch for {}",
                row[0]
            );
        }
    }

    #[test]
    fn test_invalid() {
        for text in INVALID {
            assert!(text.parse::<Addr>().is_err(), "{:?} should not parse", text);
        }
    }

    #[test]
    fn test_contains() {
        let net: Addr = "1.2.3.0/24".parse().unwrap();
        assert!(net.contains(&"1.2.3.4/32".parse().unwrap()));
        assert!(net.contains(&"1.2.3.255/32".parse().unwrap()));
        assert!(!net.contains(&"1.2.4.0/32".parse().unwrap()));
    }

    #[test]
    fn test_contains_cross_family() {
        let v4: Addr = "0.0.0.0/0".parse().unwrap();
        let v6: Addr = "fd00::1/128".parse().unwrap();
        assert!(!v4.contains(&v6));
        assert!(!v6.host().contains(&"0.0.0.1/32".parse().unwrap()));
    }

    #[test]
    fn test_next_ip_fills_subnet() {
        for row in VALID {
            let network: Addr = row[0].parse().unwrap();
            let host_bits = u32::from(network.bits() - network.prefix());
            if host_bits == 0 || host_bits > 16 {
                continue;
            }
            let n = 1u128 << host_bits;
            let (start, end) = network.range();
            for i in 0..n - 1 {
                let ip = next_ip(&start, &end, i).unwrap();
                assert!(network.contains(&ip), "{} not in {}", ip, network);
            }
            assert!(matches!(
                next_ip(&start, &end, n - 1),
                Err(Error::AddressSpaceExhausted)
            ));
        }
    }

    #[test]
    fn test_next_ip_host_route_has_no_room() {
        let host: Addr = "1.2.3.4/32".parse().unwrap();
        let (start, end) = host.range();
        assert!(next_ip(&start, &end, 0).is_err());
    }

    #[test]
    fn test_next_ip_31_and_127() {
        // A /31 or /127 has exactly one allocatable ordinal: the network
        // address itself.
        for text in ["10.0.0.0/31", "fd00::/127"] {
            let network: Addr = text.parse().unwrap();
            let (start, end) = network.range();
            let first = next_ip(&start, &end, 0).unwrap();
            assert_eq!(first.as_int(), start.as_int());
            assert!(next_ip(&start, &end, 1).is_err());
        }
    }

    #[test]
    fn test_next_ip_top_of_v6_space() {
        // start + n overflows u128; must report exhaustion, not wrap.
        let top: Addr = "ffff:ffff:ffff:ffff:ffff:ffff:ffff:0/112".parse().unwrap();
        let (start, end) = top.range();
        assert!(next_ip(&start, &end, u128::MAX).is_err());
        assert!(next_ip(&start, &end, 1).is_ok());
    }

    #[test]
    fn test_addrset_sort_most_specific_first() {
        let set: AddrSet = "10.0.0.0/8, 1.2.3.4/32, 192.168.0.0/16"
            .parse()
            .unwrap();
        assert_eq!(set.to_string(), "1.2.3.4/32, 192.168.0.0/16, 10.0.0.0/8");
    }

    #[test]
    fn test_addrset_render_is_stable() {
        let texts = VALID.map(|row| row[0]).join(", ");
        let once = texts.parse::<AddrSet>().unwrap().to_string();
        let twice = once.parse::<AddrSet>().unwrap().to_string();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_addrset_invalid_entry_rejected() {
        assert!("1.2.3.4/32, nonsense".parse::<AddrSet>().is_err());
        assert!("".parse::<AddrSet>().is_err());
    }
}
