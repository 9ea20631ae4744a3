// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;

use byteorder::{BigEndian, ByteOrder};
use crc::{Crc, CRC_32_ISO_HDLC};

use crate::canonical::CanonicalView;
use crate::message::StunParseError;

use super::{Attribute, AttributeStaticType, AttributeType, AttributeWrite, RawAttribute};

use tracing::debug;

static CRC_ALGO: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// The Fingerprint [`Attribute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    fingerprint: u32,
}

impl AttributeStaticType for Fingerprint {
    const TYPE: AttributeType = AttributeType(0x8028);
}

impl Attribute for Fingerprint {
    fn get_type(&self) -> AttributeType {
        Self::TYPE
    }

    fn length(&self) -> u16 {
        4
    }
}

impl AttributeWrite<'_> for Fingerprint {
    fn write_inline(&self, dest: &mut [u8]) -> usize {
        BigEndian::write_u32(&mut dest[..4], self.fingerprint);
        4
    }
}

impl TryFrom<&RawAttribute<'_>> for Fingerprint {
    type Error = StunParseError;

    fn try_from(raw: &RawAttribute) -> Result<Self, Self::Error> {
        raw.check_type_and_len(Self::TYPE, 4..=4)?;
        Ok(Self {
            fingerprint: BigEndian::read_u32(raw.value),
        })
    }
}

impl Fingerprint {
    /// The value the CRC is XOR-ed with, "STUN" in ASCII
    pub const XOR_CONSTANT: u32 = 0x5354_554E;
    /// The size of a Fingerprint attribute including its header
    pub const PADDED_LEN: usize = 8;

    /// Create a new Fingerprint [`Attribute`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// let fingerprint = Fingerprint::new(0x360e219f);
    /// assert_eq!(fingerprint.fingerprint(), 0x360e219f);
    /// ```
    pub fn new(fingerprint: u32) -> Self {
        Self { fingerprint }
    }

    /// Retrieve the fingerprint value
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Compute the fingerprint of a [`CanonicalView`] as required by STUN.  The returned value
    /// already has [`Fingerprint::XOR_CONSTANT`] applied.
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::attribute::*;
    /// # use stun_wire::canonical::CanonicalView;
    /// let view = CanonicalView::new(&[99; 20], 0x6363, []);
    /// assert_eq!(Fingerprint::compute(&view), 0xeeba_c172 ^ Fingerprint::XOR_CONSTANT);
    /// ```
    pub fn compute(view: &CanonicalView<'_>) -> u32 {
        let mut digest = CRC_ALGO.digest();
        for chunk in view.chunks() {
            digest.update(chunk);
        }
        digest.finalize() ^ Self::XOR_CONSTANT
    }

    /// Check that `expected` is the fingerprint of `view`
    #[tracing::instrument(
        name = "Fingerprint::verify",
        level = "trace",
        skip(view)
    )]
    pub fn verify(view: &CanonicalView<'_>, expected: u32) -> bool {
        let computed = Self::compute(view);
        if computed != expected {
            debug!("fingerprint mismatch {computed:#010x} != {expected:#010x}");
            return false;
        }
        true
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:#010x}", Self::TYPE, self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ICE_REQUEST;

    #[test]
    fn fingerprint_raw() {
        let _log = crate::tests::test_init_log();
        let raw = RawAttribute::from_bytes(&ICE_REQUEST[92..]).unwrap();
        let fingerprint = Fingerprint::try_from(&raw).unwrap();
        assert_eq!(fingerprint.fingerprint(), 0x360e219f);
        assert_eq!(fingerprint.length(), 4);

        let mut dest = [0; 32];
        assert_eq!(fingerprint.write_inline(&mut dest), 4);
        assert_eq!(dest[..4], ICE_REQUEST[96..]);
    }

    #[test]
    fn fingerprint_wrong_size() {
        let _log = crate::tests::test_init_log();
        let raw = RawAttribute::new(Fingerprint::TYPE, &[1, 2, 3]);
        assert!(matches!(
            Fingerprint::try_from(&raw),
            Err(StunParseError::Truncated {
                expected: 4,
                actual: 3
            })
        ));
        let raw = RawAttribute::new(Fingerprint::TYPE, &[1, 2, 3, 4, 5]);
        assert!(matches!(
            Fingerprint::try_from(&raw),
            Err(StunParseError::TooLarge {
                expected: 4,
                actual: 5
            })
        ));
        let raw = RawAttribute::new(0.into(), &[1, 2, 3, 4]);
        assert!(matches!(
            Fingerprint::try_from(&raw),
            Err(StunParseError::WrongAttributeImplementation)
        ));
    }

    #[test]
    fn fingerprint_chunking() {
        let _log = crate::tests::test_init_log();
        let mut header = [0; 20];
        header.copy_from_slice(&ICE_REQUEST[..20]);
        let whole = CanonicalView::new(&header, 80, [&ICE_REQUEST[20..92]]);
        let split = CanonicalView::new(
            &header,
            80,
            [&ICE_REQUEST[20..21], &ICE_REQUEST[21..60], &ICE_REQUEST[60..92]],
        );
        assert_eq!(Fingerprint::compute(&whole), 0x360e219f);
        assert_eq!(Fingerprint::compute(&split), 0x360e219f);
        assert!(Fingerprint::verify(&split, 0x360e219f));
        assert!(!Fingerprint::verify(&split, 0x360e219e));
    }
}
