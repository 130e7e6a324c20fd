use anyhow::{Result, anyhow};
use std::net::IpAddr;
use std::str::FromStr;

/// One allow-listed network. Host bits beyond the prefix are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    network: IpAddr,
    prefix: u8,
}

impl FromStr for IpRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr.trim(), Some(prefix.trim())),
            None => (s, None),
        };
        let network: IpAddr = addr
            .parse()
            .map_err(|_| anyhow!("invalid network address '{}'", s))?;
        let max = if network.is_ipv4() { 32 } else { 128 };
        let prefix = match prefix {
            Some(p) => p
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= max)
                .ok_or_else(|| anyhow!("invalid prefix length in '{}'", s))?,
            None => max,
        };
        Ok(Self { network, prefix })
    }
}

impl IpRange {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, canonical(ip)) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

fn mask_u32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix as u32)
    }
}

fn mask_u128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - prefix as u32)
    }
}

/// IPv4-mapped IPv6 callers are matched as IPv4.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}

/// Caller network-origin check.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    ranges: Option<Vec<IpRange>>,
}

impl AccessGate {
    pub fn allow_all() -> Self {
        Self { ranges: None }
    }

    /// An absent or empty list allows every caller.
    pub fn from_config(networks: Option<&[String]>) -> Result<Self> {
        match networks {
            Some(list) if !list.is_empty() => {
                let ranges = list
                    .iter()
                    .map(|n| n.parse::<IpRange>())
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self {
                    ranges: Some(ranges),
                })
            }
            _ => Ok(Self::allow_all()),
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.ranges.is_some()
    }

    pub fn allowed(&self, remote_ip: &str) -> bool {
        let Some(ranges) = &self.ranges else {
            return true;
        };
        let Ok(ip) = remote_ip.trim().parse::<IpAddr>() else {
            return false;
        };
        ranges.iter().any(|r| r.contains(ip))
    }
}
