// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;

use hmac::{Hmac, Mac};

use crate::canonical::CanonicalView;
use crate::message::{StunParseError, StunWriteError};

use super::{Attribute, AttributeStaticType, AttributeType, AttributeWrite, RawAttribute};

use tracing::{debug, error};

type HmacSha1 = Hmac<sha1::Sha1>;

/// The MessageIntegrity [`Attribute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIntegrity {
    hmac: [u8; 20],
}

impl AttributeStaticType for MessageIntegrity {
    const TYPE: AttributeType = AttributeType(0x0008);
}

impl Attribute for MessageIntegrity {
    fn get_type(&self) -> AttributeType {
        Self::TYPE
    }

    fn length(&self) -> u16 {
        20
    }
}

impl AttributeWrite<'_> for MessageIntegrity {
    fn write_inline(&self, dest: &mut [u8]) -> usize {
        dest[..self.hmac.len()].copy_from_slice(&self.hmac);
        self.hmac.len()
    }
}

impl TryFrom<&RawAttribute<'_>> for MessageIntegrity {
    type Error = StunParseError;

    fn try_from(raw: &RawAttribute) -> Result<Self, Self::Error> {
        raw.check_type_and_len(Self::TYPE, 20..=20)?;
        let mut hmac = [0; 20];
        hmac.copy_from_slice(raw.value);
        Ok(Self { hmac })
    }
}

impl MessageIntegrity {
    /// The size of a MessageIntegrity attribute including its header
    pub const PADDED_LEN: usize = 24;

    /// Create a new MessageIntegrity [`Attribute`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// let hmac = [0;20];
    /// let integrity = MessageIntegrity::new(hmac);
    /// assert_eq!(integrity.hmac(), &hmac);
    /// ```
    pub fn new(hmac: [u8; 20]) -> Self {
        Self { hmac }
    }

    /// Retrieve the value of the hmac
    pub fn hmac(&self) -> &[u8; 20] {
        &self.hmac
    }

    fn hmac_over(view: &CanonicalView<'_>, key: &[u8]) -> Option<HmacSha1> {
        let mut hmac = HmacSha1::new_from_slice(key).ok()?;
        for chunk in view.chunks() {
            hmac.update(chunk);
        }
        Some(hmac)
    }

    /// Compute the Message Integrity value of a [`CanonicalView`] using a key
    ///
    /// Note: use `MessageIntegrity::verify` for the actual verification to ensure constant time
    /// checks of the values to defeat certain types of timing attacks.
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::attribute::*;
    /// # use stun_wire::canonical::CanonicalView;
    /// let key = [40; 10];
    /// let view = CanonicalView::new(&[10; 20], 0x0a0a, [&[10u8; 10][..]]);
    /// let expected = [209, 217, 210, 15, 124, 78, 87, 181, 211, 233, 165, 180, 44, 142, 81, 233, 138, 186, 184, 97];
    /// let integrity = MessageIntegrity::compute(&view, &key).unwrap();
    /// assert_eq!(integrity, expected);
    /// ```
    #[tracing::instrument(
        name = "MessageIntegrity::compute",
        level = "trace",
        err,
        skip(view, key)
    )]
    pub fn compute(view: &CanonicalView<'_>, key: &[u8]) -> Result<[u8; 20], StunWriteError> {
        let hmac = Self::hmac_over(view, key).ok_or(StunWriteError::IntegrityFailed)?;
        Ok(hmac.finalize().into_bytes().into())
    }

    /// Check that `expected` is the Message Integrity value of a [`CanonicalView`] using a key.
    ///
    /// The comparison is performed in constant time.
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::attribute::*;
    /// # use stun_wire::canonical::CanonicalView;
    /// let key = [40; 10];
    /// let view = CanonicalView::new(&[10; 20], 0x0a0a, [&[10u8; 10][..]]);
    /// let expected = [209, 217, 210, 15, 124, 78, 87, 181, 211, 233, 165, 180, 44, 142, 81, 233, 138, 186, 184, 97];
    /// assert!(MessageIntegrity::verify(&view, &key, &expected));
    /// assert!(!MessageIntegrity::verify(&view, &[41; 10], &expected));
    /// ```
    #[tracing::instrument(
        name = "MessageIntegrity::verify",
        level = "debug",
        skip(view, key, expected)
    )]
    pub fn verify(view: &CanonicalView<'_>, key: &[u8], expected: &[u8; 20]) -> bool {
        let Some(hmac) = Self::hmac_over(view, key) else {
            error!("failed to create hmac from key data");
            return false;
        };
        if hmac.verify_slice(expected).is_err() {
            debug!("integrity check failed");
            return false;
        }
        true
    }
}

impl std::fmt::Display for MessageIntegrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: 0x", Self::TYPE)?;
        for val in self.hmac.iter() {
            write!(f, "{:02x}", val)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ICE_REQUEST;
    use tracing::trace;

    const PASSWORD: &[u8] = b"xJcE9AQAR7kczUDVOXRUCl";

    fn ice_request_view() -> CanonicalView<'static> {
        let mut header = [0; 20];
        header.copy_from_slice(&ICE_REQUEST[..20]);
        CanonicalView::new(&header, 72, [&ICE_REQUEST[20..68]])
    }

    #[test]
    fn message_integrity_raw() {
        let _log = crate::tests::test_init_log();
        let raw = RawAttribute::from_bytes(&ICE_REQUEST[68..]).unwrap();
        let integrity = MessageIntegrity::try_from(&raw).unwrap();
        trace!("{integrity}");
        assert_eq!(integrity.hmac()[..], ICE_REQUEST[72..92]);

        let mut dest = [0; 32];
        assert_eq!(integrity.write_inline(&mut dest), 20);
        assert_eq!(dest[..20], ICE_REQUEST[72..92]);
    }

    #[test]
    fn message_integrity_wrong_size() {
        let _log = crate::tests::test_init_log();
        let raw = RawAttribute::new(MessageIntegrity::TYPE, &ICE_REQUEST[72..91]);
        assert!(matches!(
            MessageIntegrity::try_from(&raw),
            Err(StunParseError::Truncated {
                expected: 20,
                actual: 19
            })
        ));
        let raw = RawAttribute::new(MessageIntegrity::TYPE, &ICE_REQUEST[72..93]);
        assert!(matches!(
            MessageIntegrity::try_from(&raw),
            Err(StunParseError::TooLarge {
                expected: 20,
                actual: 21
            })
        ));
    }

    #[test]
    fn compute_ice_request() {
        let _log = crate::tests::test_init_log();
        let view = ice_request_view();
        let hmac = MessageIntegrity::compute(&view, PASSWORD).unwrap();
        assert_eq!(hmac[..], ICE_REQUEST[72..92]);
        assert!(MessageIntegrity::verify(&view, PASSWORD, &hmac));
    }

    #[test]
    fn verify_wrong_key() {
        let _log = crate::tests::test_init_log();
        let view = ice_request_view();
        let mut expected = [0; 20];
        expected.copy_from_slice(&ICE_REQUEST[72..92]);
        assert!(!MessageIntegrity::verify(&view, b"wrong", &expected));
        assert!(!MessageIntegrity::verify(&view, b"", &expected));
    }

    #[test]
    fn verify_wrong_length_field() {
        let _log = crate::tests::test_init_log();
        let mut header = [0; 20];
        header.copy_from_slice(&ICE_REQUEST[..20]);
        let mut expected = [0; 20];
        expected.copy_from_slice(&ICE_REQUEST[72..92]);
        // the length including the trailing fingerprint must not validate
        let view = CanonicalView::new(&header, 80, [&ICE_REQUEST[20..68]]);
        assert!(!MessageIntegrity::verify(&view, PASSWORD, &expected));
    }
}
