// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The set of attributes found in a Binding request

use std::convert::TryFrom;

use crate::message::StunParseError;

use super::{
    AttributeStaticType, Fingerprint, IceControlled, IceControlling, MessageIntegrity, Priority,
    RawAttribute, UnknownAttributes, UseCandidate, Username,
};

use tracing::{trace, warn};

/// The location and value of a MESSAGE-INTEGRITY attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityRef<'a> {
    offset: usize,
    hmac: &'a [u8; 20],
}

impl<'a> IntegrityRef<'a> {
    /// Offset of the attribute header from the start of the attribute section
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The HMAC-SHA1 value carried by the attribute
    pub fn hmac(&self) -> &'a [u8; 20] {
        self.hmac
    }
}

/// The location and value of a FINGERPRINT attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintRef {
    offset: usize,
    value: u32,
}

impl FingerprintRef {
    /// Offset of the attribute header from the start of the attribute section
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The fingerprint value carried by the attribute
    pub fn value(&self) -> u32 {
        self.value
    }
}

/// Errors produced by [`StunAttributes::parse`]
///
/// # Examples
///
/// ```
/// # use stun_wire::attribute::*;
/// // an unknown comprehension-required attribute 0x0033
/// let data = [0x00, 0x33, 0x00, 0x00];
/// let answer = match StunAttributes::parse(&data) {
///     Ok(_) => "parsed",
///     Err(AttributesError::Unknown(_)) => "420",
///     Err(AttributesError::Malformed(_)) => "drop",
/// };
/// assert_eq!(answer, "420");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributesError {
    /// The attribute section cannot be parsed.  No response should be sent.
    #[error("Malformed attributes: {}", .0)]
    Malformed(#[from] StunParseError),
    /// Attributes requiring comprehension were not understood.
    #[error("Unknown attributes: {}", .0)]
    Unknown(UnknownAttributes),
}

/// The attributes of a Binding request that are relevant to answering it
///
/// Values borrow from the parsed data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StunAttributes<'a> {
    username: Option<&'a [u8]>,
    message_integrity: Option<IntegrityRef<'a>>,
    fingerprint: Option<FingerprintRef>,
    priority: Option<u32>,
    use_candidate: bool,
    ice_controlled: bool,
    ice_controlling: bool,
}

impl<'a> StunAttributes<'a> {
    /// Parse the attribute section of a message
    ///
    /// Parsing stops after a FINGERPRINT attribute.  Any attribute following MESSAGE-INTEGRITY
    /// other than FINGERPRINT is an error.  Attributes with a type >= 0x8000 that are not
    /// otherwise handled are ignored.  Other unhandled attributes are collected and returned as
    /// [`AttributesError::Unknown`] once the section has been parsed.  If more than
    /// [`UNKNOWN_ATTRIBUTES_CAPACITY`](super::UNKNOWN_ATTRIBUTES_CAPACITY) unknown attributes are
    /// found, parsing stops and the first ones are returned.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// let data = [
    ///     0x00, 0x06, 0x00, 0x03, b'a', b':', b'b', 0x00, // USERNAME "a:b"
    ///     0x00, 0x25, 0x00, 0x00,                         // USE-CANDIDATE
    ///     0x00, 0x24, 0x00, 0x04, 0x00, 0x00, 0x01, 0x00, // PRIORITY 256
    /// ];
    /// let attrs = StunAttributes::parse(&data).unwrap();
    /// assert_eq!(attrs.username(), Some(&b"a:b"[..]));
    /// assert!(attrs.use_candidate());
    /// assert_eq!(attrs.priority(), Some(256));
    /// assert!(attrs.message_integrity().is_none());
    /// ```
    #[tracing::instrument(
        name = "attributes_parse",
        level = "trace",
        skip(data),
        fields(
            data.len = data.len()
        )
    )]
    pub fn parse(data: &'a [u8]) -> Result<Self, AttributesError> {
        let mut ret = Self::default();
        let mut unknown = UnknownAttributes::default();
        let mut offset = 0;

        while offset < data.len() {
            let raw = RawAttribute::from_bytes(&data[offset..])?;
            let padded_len = raw.padded_len();
            if offset + padded_len > data.len() {
                warn!(
                    "attribute {} padded length {} larger than the remaining {} bytes",
                    raw.get_type(),
                    padded_len,
                    data.len() - offset
                );
                return Err(StunParseError::Truncated {
                    expected: padded_len,
                    actual: data.len() - offset,
                }
                .into());
            }
            let atype = raw.get_type();
            if ret.message_integrity.is_some() && atype != Fingerprint::TYPE {
                warn!("attribute {atype} after message integrity");
                return Err(StunParseError::AttributeAfterIntegrity(atype).into());
            }
            trace!("found attribute {atype} at offset {offset}");

            match atype {
                Username::TYPE => ret.username = Some(Username::try_from(&raw)?.username()),
                MessageIntegrity::TYPE => {
                    raw.check_type_and_len(MessageIntegrity::TYPE, 20..=20)?;
                    let hmac = <&[u8; 20]>::try_from(raw.value)
                        .map_err(|_| StunParseError::InvalidAttributeData)?;
                    ret.message_integrity = Some(IntegrityRef { offset, hmac });
                }
                Fingerprint::TYPE => {
                    let fingerprint = Fingerprint::try_from(&raw)?;
                    ret.fingerprint = Some(FingerprintRef {
                        offset,
                        value: fingerprint.fingerprint(),
                    });
                    if offset + padded_len < data.len() {
                        trace!(
                            "ignoring {} bytes after fingerprint",
                            data.len() - offset - padded_len
                        );
                    }
                    break;
                }
                Priority::TYPE => ret.priority = Some(Priority::try_from(&raw)?.priority()),
                UseCandidate::TYPE => ret.use_candidate = true,
                IceControlled::TYPE => ret.ice_controlled = true,
                IceControlling::TYPE => ret.ice_controlling = true,
                atype if !atype.comprehension_required() => {
                    trace!("ignoring optional attribute {atype}");
                }
                atype => {
                    if let Err(e) = unknown.try_push(atype) {
                        warn!("{e}, ignoring any further attributes");
                        break;
                    }
                }
            }

            offset += padded_len;
        }

        if unknown.is_empty() {
            Ok(ret)
        } else {
            Err(AttributesError::Unknown(unknown))
        }
    }

    /// The value of the USERNAME attribute
    pub fn username(&self) -> Option<&'a [u8]> {
        self.username
    }

    /// The MESSAGE-INTEGRITY attribute
    pub fn message_integrity(&self) -> Option<&IntegrityRef<'a>> {
        self.message_integrity.as_ref()
    }

    /// The FINGERPRINT attribute
    pub fn fingerprint(&self) -> Option<&FingerprintRef> {
        self.fingerprint.as_ref()
    }

    /// The value of the PRIORITY attribute
    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    /// Whether a USE-CANDIDATE attribute is present
    pub fn use_candidate(&self) -> bool {
        self.use_candidate
    }

    /// Whether an ICE-CONTROLLED attribute is present
    pub fn ice_controlled(&self) -> bool {
        self.ice_controlled
    }

    /// Whether an ICE-CONTROLLING attribute is present
    pub fn ice_controlling(&self) -> bool {
        self.ice_controlling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeType, UNKNOWN_ATTRIBUTES_CAPACITY};
    use crate::tests::ICE_REQUEST;
    use byteorder::{BigEndian, ByteOrder};
    use rand::Rng;

    fn attr(atype: u16, value: &[u8]) -> Vec<u8> {
        let mut ret = vec![0; 4];
        BigEndian::write_u16(&mut ret[0..2], atype);
        BigEndian::write_u16(&mut ret[2..4], value.len() as u16);
        ret.extend_from_slice(value);
        while ret.len() % 4 != 0 {
            ret.push(0);
        }
        ret
    }

    #[test]
    fn ice_request() {
        let _log = crate::tests::test_init_log();
        let attrs = StunAttributes::parse(&ICE_REQUEST[20..]).unwrap();
        assert_eq!(attrs.username(), Some(&b"p9KA:SQAt"[..]));
        assert_eq!(attrs.priority(), Some(0x6e7f1eff));
        assert!(attrs.ice_controlling());
        assert!(!attrs.ice_controlled());
        assert!(attrs.use_candidate());
        let integrity = attrs.message_integrity().unwrap();
        assert_eq!(integrity.offset(), 48);
        assert_eq!(integrity.hmac()[..], ICE_REQUEST[72..92]);
        let fingerprint = attrs.fingerprint().unwrap();
        assert_eq!(fingerprint.offset(), 72);
        assert_eq!(fingerprint.value(), 0x360e219f);
    }

    #[test]
    fn parse_idempotent() {
        let _log = crate::tests::test_init_log();
        let first = StunAttributes::parse(&ICE_REQUEST[20..]).unwrap();
        let second = StunAttributes::parse(&ICE_REQUEST[20..]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty() {
        let _log = crate::tests::test_init_log();
        assert_eq!(StunAttributes::parse(&[]).unwrap(), StunAttributes::default());
    }

    #[test]
    fn unknown_attributes_in_order() {
        let _log = crate::tests::test_init_log();
        let mut data = attr(0x0006, b"a:b");
        data.extend(attr(0x0033, &[1, 2, 3]));
        // optional attributes are ignored
        data.extend(attr(0xc001, &[1]));
        data.extend(attr(0x0002, &[]));
        data.extend(attr(0x0033, &[4]));
        let Err(AttributesError::Unknown(unknown)) = StunAttributes::parse(&data) else {
            unreachable!();
        };
        assert_eq!(
            unknown.as_slice(),
            &[
                AttributeType::new(0x0033),
                AttributeType::new(0x0002),
                AttributeType::new(0x0033)
            ]
        );
        assert!(!unknown.is_truncated());
    }

    #[test]
    fn unknown_attributes_overflow() {
        let _log = crate::tests::test_init_log();
        let mut data = vec![];
        for i in 0..UNKNOWN_ATTRIBUTES_CAPACITY as u16 + 1 {
            data.extend(attr(0x0100 + i, &[]));
        }
        // never reached
        data.extend(attr(0x0006, b"a:b"));
        let Err(AttributesError::Unknown(unknown)) = StunAttributes::parse(&data) else {
            unreachable!();
        };
        assert_eq!(unknown.len(), UNKNOWN_ATTRIBUTES_CAPACITY);
        assert!(unknown.is_truncated());
        for (i, atype) in unknown.iter().enumerate() {
            assert_eq!(atype.value(), 0x0100 + i as u16);
        }
    }

    #[test]
    fn malformed_after_unknown() {
        let _log = crate::tests::test_init_log();
        let mut data = attr(0x0033, &[]);
        data.extend(attr(Priority::TYPE.value(), &[1, 2, 3]));
        assert!(matches!(
            StunAttributes::parse(&data),
            Err(AttributesError::Malformed(StunParseError::Truncated {
                expected: 4,
                actual: 3
            }))
        ));
    }

    #[test]
    fn attribute_after_integrity() {
        let _log = crate::tests::test_init_log();
        let mut data = attr(MessageIntegrity::TYPE.value(), &[0; 20]);
        data.extend(attr(UseCandidate::TYPE.value(), &[]));
        assert!(matches!(
            StunAttributes::parse(&data),
            Err(AttributesError::Malformed(
                StunParseError::AttributeAfterIntegrity(UseCandidate::TYPE)
            ))
        ));
        // unknown attributes are not accepted after integrity either
        let mut data = attr(MessageIntegrity::TYPE.value(), &[0; 20]);
        data.extend(attr(0x0033, &[]));
        assert!(matches!(
            StunAttributes::parse(&data),
            Err(AttributesError::Malformed(
                StunParseError::AttributeAfterIntegrity(_)
            ))
        ));
    }

    #[test]
    fn wrong_sizes() {
        let _log = crate::tests::test_init_log();
        for (atype, len) in [
            (MessageIntegrity::TYPE, 19),
            (MessageIntegrity::TYPE, 21),
            (Fingerprint::TYPE, 3),
            (Fingerprint::TYPE, 5),
            (Priority::TYPE, 8),
        ] {
            let data = attr(atype.value(), &vec![0; len]);
            assert!(matches!(
                StunAttributes::parse(&data),
                Err(AttributesError::Malformed(_))
            ));
        }
    }

    #[test]
    fn long_username() {
        let _log = crate::tests::test_init_log();
        let mut username = b"p9KA:".to_vec();
        username.extend([b'x'; 600]);
        let mut data = attr(Username::TYPE.value(), &username);
        data.extend(attr(UseCandidate::TYPE.value(), &[]));
        let attrs = StunAttributes::parse(&data).unwrap();
        assert_eq!(attrs.username(), Some(&username[..]));
        assert!(attrs.use_candidate());
    }

    #[test]
    fn stop_after_fingerprint() {
        let _log = crate::tests::test_init_log();
        let mut data = attr(Fingerprint::TYPE.value(), &[1, 2, 3, 4]);
        // neither the unknown attribute nor the truncated data is looked at
        data.extend(attr(0x0033, &[]));
        data.extend([0x00, 0x06, 0xff]);
        let attrs = StunAttributes::parse(&data).unwrap();
        assert_eq!(attrs.fingerprint().unwrap().value(), 0x01020304);
    }

    #[test]
    fn truncated() {
        let _log = crate::tests::test_init_log();
        let data = attr(Username::TYPE.value(), b"abcde");
        // missing padding
        assert!(matches!(
            StunAttributes::parse(&data[..data.len() - 1]),
            Err(AttributesError::Malformed(StunParseError::Truncated { .. }))
        ));
        // missing value
        assert!(matches!(
            StunAttributes::parse(&data[..6]),
            Err(AttributesError::Malformed(StunParseError::Truncated { .. }))
        ));
        // missing header
        assert!(matches!(
            StunAttributes::parse(&data[..2]),
            Err(AttributesError::Malformed(StunParseError::Truncated { .. }))
        ));
    }

    #[test]
    fn mangled_lengths() {
        let _log = crate::tests::test_init_log();
        let mut rng = rand::rng();
        // attribute length fields in ICE_REQUEST relative to the attribute section
        let length_offsets = [2, 18, 26, 38, 42, 50, 74];
        for _ in 0..1000 {
            let mut data = ICE_REQUEST[20..].to_vec();
            let idx = length_offsets[rng.random_range(0..length_offsets.len())];
            let len = rng.random::<u16>();
            BigEndian::write_u16(&mut data[idx..idx + 2], len);
            let end = rng.random_range(0..=data.len());
            // must not panic
            let _ = StunAttributes::parse(&data[..end]);
        }
    }
}
