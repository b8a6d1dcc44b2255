use serde_plain::{derive_deserialize_from_fromstr, derive_serialize_from_display};
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// The longest prefix a subnet may have. AWS does not allow subnets smaller than a `/28`.
pub const MAX_SUBNET_PREFIX: u8 = 28;

/// An IPv4 network in CIDR notation, e.g. `10.0.0.0/16`. Host bits must be zero.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self, String> {
        if prefix > 32 {
            return Err(format!("prefix length {} is larger than 32", prefix));
        }
        let cidr = Self { address, prefix };
        if u32::from(address) & !cidr.mask() != 0 {
            return Err(format!(
                "'{}/{}' has host bits set, did you mean '{}/{}'",
                address,
                prefix,
                Ipv4Addr::from(u32::from(address) & cidr.mask()),
                prefix
            ));
        }
        Ok(cidr)
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// The number of addresses in the block.
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }

    fn first(&self) -> u64 {
        u64::from(u32::from(self.address))
    }

    fn last(&self) -> u64 {
        self.first() + self.size() - 1
    }

    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.first() && other.last() <= self.last()
    }

    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Split the block into the smallest power-of-two number of equal blocks that is at least
    /// `count`. Returns `None` if the resulting blocks would be smaller than a `/28`.
    pub fn split(&self, count: u32) -> Option<Vec<Ipv4Cidr>> {
        let blocks = count.max(1).checked_next_power_of_two()?;
        let extra_bits = blocks.trailing_zeros();
        let prefix = u32::from(self.prefix) + extra_bits;
        if prefix > u32::from(MAX_SUBNET_PREFIX) {
            return None;
        }
        let prefix = u8::try_from(prefix).ok()?;
        let step = 1u64 << (32 - u32::from(prefix));
        (0..u64::from(blocks))
            .map(|i| {
                let address = u32::try_from(self.first() + i * step).ok()?;
                Some(Ipv4Cidr {
                    address: Ipv4Addr::from(address),
                    prefix,
                })
            })
            .collect()
    }
}

impl Display for Ipv4Cidr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("'{}' is missing a '/<prefix>' suffix", s))?;
        let address = address
            .parse::<Ipv4Addr>()
            .map_err(|e| format!("'{}' is not an IPv4 address: {}", address, e))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|e| format!("'{}' is not a prefix length: {}", prefix, e))?;
        Self::new(address, prefix)
    }
}

derive_serialize_from_display!(Ipv4Cidr);
derive_deserialize_from_fromstr!(Ipv4Cidr, "an IPv4 CIDR block such as 10.0.0.0/16");
