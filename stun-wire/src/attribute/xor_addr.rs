// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use byteorder::{BigEndian, ByteOrder};

use crate::message::{StunParseError, TransactionId, MAGIC_COOKIE};

use super::{
    check_len, Attribute, AttributeStaticType, AttributeType, AttributeWrite, RawAttribute,
};

/// The address family of a [`XorMappedAddress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4, family value 0x01
    IPV4,
    /// IPv6, family value 0x02
    IPV6,
}

impl AddressFamily {
    fn to_byte(self) -> u8 {
        match self {
            AddressFamily::IPV4 => 0x1,
            AddressFamily::IPV6 => 0x2,
        }
    }

    fn from_byte(byte: u8) -> Result<AddressFamily, StunParseError> {
        match byte {
            0x1 => Ok(AddressFamily::IPV4),
            0x2 => Ok(AddressFamily::IPV6),
            _ => Err(StunParseError::InvalidAttributeData),
        }
    }
}

/// The XorMappedAddress [`Attribute`]
///
/// Holds the address exactly as it is encoded on the wire, i.e. after the XOR with the magic
/// cookie and the [`TransactionId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorMappedAddress {
    xored: SocketAddr,
}

impl AttributeStaticType for XorMappedAddress {
    const TYPE: AttributeType = AttributeType(0x0020);
}

impl Attribute for XorMappedAddress {
    fn get_type(&self) -> AttributeType {
        Self::TYPE
    }

    fn length(&self) -> u16 {
        match self.xored {
            SocketAddr::V4(_) => 8,
            SocketAddr::V6(_) => 20,
        }
    }
}

impl AttributeWrite<'_> for XorMappedAddress {
    fn write_inline(&self, dest: &mut [u8]) -> usize {
        dest[0] = 0x0;
        BigEndian::write_u16(&mut dest[2..4], self.xored.port());
        match self.xored.ip() {
            IpAddr::V4(ip) => {
                dest[1] = AddressFamily::IPV4.to_byte();
                dest[4..8].copy_from_slice(&ip.octets());
                8
            }
            IpAddr::V6(ip) => {
                dest[1] = AddressFamily::IPV6.to_byte();
                dest[4..20].copy_from_slice(&ip.octets());
                20
            }
        }
    }
}

impl TryFrom<&RawAttribute<'_>> for XorMappedAddress {
    type Error = StunParseError;

    fn try_from(raw: &RawAttribute) -> Result<Self, Self::Error> {
        raw.check_type_and_len(Self::TYPE, 4..=20)?;
        let port = BigEndian::read_u16(&raw.value[2..4]);
        let ip = match AddressFamily::from_byte(raw.value[1])? {
            AddressFamily::IPV4 => {
                check_len(raw.value.len(), 8..=8)?;
                IpAddr::V4(Ipv4Addr::from(BigEndian::read_u32(&raw.value[4..8])))
            }
            AddressFamily::IPV6 => {
                check_len(raw.value.len(), 20..=20)?;
                IpAddr::V6(Ipv6Addr::from(BigEndian::read_u128(&raw.value[4..20])))
            }
        };
        Ok(Self {
            xored: SocketAddr::new(ip, port),
        })
    }
}

impl XorMappedAddress {
    /// Create a new XorMappedAddress [`Attribute`]
    ///
    /// An IPv4-mapped IPv6 address (`::ffff:a.b.c.d`) is stored as the IPv4 address it maps.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// # use std::net::SocketAddr;
    /// let addr = "127.0.0.1:1234".parse().unwrap();
    /// let mapped_addr = XorMappedAddress::new(addr, 0x5678.into());
    /// assert_eq!(mapped_addr.addr(0x5678.into()), addr);
    ///
    /// let mapped: SocketAddr = "[::ffff:127.0.0.1]:1234".parse().unwrap();
    /// let mapped_addr = XorMappedAddress::new(mapped, 0x5678.into());
    /// assert_eq!(mapped_addr.addr(0x5678.into()), addr);
    /// ```
    pub fn new(addr: SocketAddr, transaction: TransactionId) -> Self {
        let addr = match addr {
            SocketAddr::V6(v6) => match v6.ip().to_ipv4_mapped() {
                Some(v4) => SocketAddr::new(IpAddr::V4(v4), v6.port()),
                None => addr,
            },
            SocketAddr::V4(_) => addr,
        };
        Self {
            xored: Self::xor_addr(addr, transaction),
        }
    }

    /// Retrieve the address stored in a [`XorMappedAddress`]
    pub fn addr(&self, transaction: TransactionId) -> SocketAddr {
        Self::xor_addr(self.xored, transaction)
    }

    /// The address family this attribute is encoded with
    pub fn family(&self) -> AddressFamily {
        match self.xored {
            SocketAddr::V4(_) => AddressFamily::IPV4,
            SocketAddr::V6(_) => AddressFamily::IPV6,
        }
    }

    fn xor_addr(addr: SocketAddr, transaction: TransactionId) -> SocketAddr {
        let port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
        match addr {
            SocketAddr::V4(addr) => {
                let const_octets = MAGIC_COOKIE.to_be_bytes();
                let addr_octets = addr.ip().octets();
                let octets = bytewise_xor!(4, const_octets, addr_octets, 0);
                SocketAddr::new(IpAddr::V4(Ipv4Addr::from(octets)), port)
            }
            SocketAddr::V6(addr) => {
                let transaction: u128 = transaction.into();
                let const_octets = ((MAGIC_COOKIE as u128) << 96
                    | (transaction & 0x0000_0000_ffff_ffff_ffff_ffff_ffff_ffff))
                    .to_be_bytes();
                let addr_octets = addr.ip().octets();
                let octets = bytewise_xor!(16, const_octets, addr_octets, 0);
                SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port)
            }
        }
    }
}

impl std::fmt::Display for XorMappedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.xored {
            SocketAddr::V4(_) => write!(f, "{}: {}", Self::TYPE, self.addr(0x0.into())),
            SocketAddr::V6(addr) => write!(f, "{}: XOR({})", Self::TYPE, addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::trace;

    fn written(attr: &XorMappedAddress) -> Vec<u8> {
        let mut dest = [0; 32];
        let len = attr.write_inline(&mut dest);
        assert_eq!(len, attr.length() as usize);
        dest[..len].to_vec()
    }

    #[test]
    fn xor_mapped_address_ipv4() {
        let _log = crate::tests::test_init_log();
        let transaction: TransactionId = 0x9876_5432_1098_7654_3210.into();
        let addr: SocketAddr = "192.168.0.1:3178".parse().unwrap();
        let mapped = XorMappedAddress::new(addr, transaction);
        trace!("{mapped}");
        assert_eq!(mapped.family(), AddressFamily::IPV4);
        assert_eq!(mapped.addr(transaction), addr);
        let bytes = written(&mapped);
        assert_eq!(bytes, [0x00, 0x01, 0x2d, 0x78, 0xe1, 0xba, 0xa4, 0x43]);

        let raw = RawAttribute::new(XorMappedAddress::TYPE, &bytes);
        let parsed = XorMappedAddress::try_from(&raw).unwrap();
        assert_eq!(parsed.addr(transaction), addr);
    }

    #[test]
    fn xor_mapped_address_ipv6() {
        let _log = crate::tests::test_init_log();
        let transaction: TransactionId = 0x0102_0304_0506_0708_090a_0b0c.into();
        let addr: SocketAddr = "[fd12:3456:789a::1]:5000".parse().unwrap();
        let mapped = XorMappedAddress::new(addr, transaction);
        trace!("{mapped}");
        assert_eq!(mapped.family(), AddressFamily::IPV6);
        assert_eq!(mapped.addr(transaction), addr);
        let bytes = written(&mapped);
        assert_eq!(bytes.len(), 20);
        assert_eq!(bytes[..4], [0x00, 0x02, 0x32, 0x9a]);
        // the first four address bytes are only xored with the magic cookie
        assert_eq!(bytes[4..8], [0xfd ^ 0x21, 0x12 ^ 0x12, 0x34 ^ 0xa4, 0x56 ^ 0x42]);
        // the remaining bytes also with the transaction id
        assert_eq!(bytes[8..12], [0x78 ^ 0x01, 0x9a ^ 0x02, 0x03, 0x04]);
        assert_eq!(bytes[19], 0x01 ^ 0x0c);

        // a different transaction produces a different address
        assert_ne!(mapped.addr(0x1.into()), addr);
    }

    #[test]
    fn xor_mapped_address_v4_mapped() {
        let _log = crate::tests::test_init_log();
        let transaction: TransactionId = 0x42.into();
        let addr: SocketAddr = "[::ffff:10.0.0.2]:40000".parse().unwrap();
        let mapped = XorMappedAddress::new(addr, transaction);
        assert_eq!(mapped.family(), AddressFamily::IPV4);
        assert_eq!(mapped.length(), 8);
        assert_eq!(
            mapped.addr(transaction),
            "10.0.0.2:40000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn xor_mapped_address_invalid() {
        let _log = crate::tests::test_init_log();
        // unknown family
        let raw = RawAttribute::new(XorMappedAddress::TYPE, &[0, 3, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            XorMappedAddress::try_from(&raw),
            Err(StunParseError::InvalidAttributeData)
        ));
        // ipv4 with the size of ipv6
        let raw = RawAttribute::new(XorMappedAddress::TYPE, &[0, 1, 0, 0, 1, 2, 3, 4, 5]);
        assert!(matches!(
            XorMappedAddress::try_from(&raw),
            Err(StunParseError::TooLarge {
                expected: 8,
                actual: 9
            })
        ));
        let raw = RawAttribute::new(XorMappedAddress::TYPE, &[0, 2, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            XorMappedAddress::try_from(&raw),
            Err(StunParseError::Truncated {
                expected: 20,
                actual: 8
            })
        ));
        let raw = RawAttribute::new(XorMappedAddress::TYPE, &[0, 1]);
        assert!(matches!(
            XorMappedAddress::try_from(&raw),
            Err(StunParseError::Truncated {
                expected: 4,
                actual: 2
            })
        ));
    }
}
