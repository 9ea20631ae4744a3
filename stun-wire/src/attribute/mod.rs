// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN Attributes
//!
//! Provides implementations for parsing and writing the STUN attributes needed to answer ICE
//! connectivity checks as specified in [RFC5389] and [RFC8445].
//!
//! Received attributes are handled through [`RawAttribute`], a borrowed view of a single TLV, and
//! [`StunAttributes`], the result of parsing the whole attribute section of a request.
//!
//! [RFC5389]: https://tools.ietf.org/html/rfc5389
//! [RFC8445]: https://tools.ietf.org/html/rfc8445
//!
//! # Examples
//!
//! ### Parse a [`RawAttribute`]
//!
//! ```
//! use stun_wire::prelude::*;
//! use stun_wire::attribute::{Priority, RawAttribute};
//!
//! let attribute_data = [
//!     0x00, 0x24, 0x00, 0x04, // Attribute type (0x0024: Priority) and length (0x0004)
//!     0x6e, 0x7f, 0x1e, 0xff, // priority value
//! ];
//!
//! let raw = RawAttribute::from_bytes(&attribute_data).unwrap();
//! assert_eq!(raw.get_type(), Priority::TYPE);
//! assert_eq!(raw.padded_len(), 8);
//!
//! // Can also parse data into a typed attribute as needed
//! let priority = Priority::try_from(&raw).unwrap();
//! assert_eq!(priority.priority(), 0x6e7f1eff);
//! ```

macro_rules! bytewise_xor {
    ($size:literal, $a:expr, $b:expr, $default:literal) => {{
        let mut arr = [$default; $size];
        for (i, item) in arr.iter_mut().enumerate() {
            *item = $a[i] ^ $b[i];
        }
        arr
    }};
}

mod error;
pub use error::{ErrorCode, UnknownAttributes, UnknownAttributesFull, UNKNOWN_ATTRIBUTES_CAPACITY};
mod fingerprint;
pub use fingerprint::Fingerprint;
mod ice;
pub use ice::{IceControlled, IceControlling, Priority, UseCandidate};
mod integrity;
pub use integrity::MessageIntegrity;
mod set;
pub use set::{AttributesError, FingerprintRef, IntegrityRef, StunAttributes};
mod user;
pub use user::{split_username, Username};
mod xor_addr;
pub use xor_addr::{AddressFamily, XorMappedAddress};

use crate::message::StunParseError;

use byteorder::{BigEndian, ByteOrder};

/// The type of an [`Attribute`] in a STUN [`Message`](crate::message::Message)
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct AttributeType(u16);

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#x}: {})", self.0, self.0, self.name())
    }
}

impl AttributeType {
    /// Create a new AttributeType from an existing value
    ///
    /// Note: the value passed in is not encoded as in a stun message
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::attribute::AttributeType;
    /// assert_eq!(AttributeType::new(0x123).value(), 0x123);
    /// ```
    pub const fn new(val: u16) -> Self {
        Self(val)
    }

    /// Return the integer value of this AttributeType
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns a human readable name of this `AttributeType` or "unknown"
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::prelude::*;
    /// # use stun_wire::attribute::*;
    /// assert_eq!(XorMappedAddress::TYPE.name(), "XOR-MAPPED-ADDRESS");
    /// ```
    pub fn name(self) -> &'static str {
        match self {
            Username::TYPE => "USERNAME",
            MessageIntegrity::TYPE => "MESSAGE-INTEGRITY",
            ErrorCode::TYPE => "ERROR-CODE",
            UnknownAttributes::TYPE => "UNKNOWN-ATTRIBUTES",
            XorMappedAddress::TYPE => "XOR-MAPPED-ADDRESS",
            Priority::TYPE => "PRIORITY",
            UseCandidate::TYPE => "USE-CANDIDATE",
            Fingerprint::TYPE => "FINGERPRINT",
            IceControlled::TYPE => "ICE-CONTROLLED",
            IceControlling::TYPE => "ICE-CONTROLLING",
            _ => "unknown",
        }
    }

    /// Check if comprehension is required for an `AttributeType`.  All integer attribute
    /// values < 0x8000 require comprehension.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::AttributeType;
    /// assert_eq!(AttributeType::new(0x0).comprehension_required(), true);
    /// assert_eq!(AttributeType::new(0x8000).comprehension_required(), false);
    /// ```
    pub fn comprehension_required(self) -> bool {
        self.0 < 0x8000
    }
}
impl From<u16> for AttributeType {
    fn from(f: u16) -> Self {
        Self::new(f)
    }
}
impl From<AttributeType> for u16 {
    fn from(f: AttributeType) -> Self {
        f.0
    }
}

/// Structure for holding the header of a STUN attribute.  Contains the type and the length
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeHeader {
    atype: AttributeType,
    length: u16,
}

impl AttributeHeader {
    /// The size of an attribute header on the wire
    pub const LENGTH: usize = 4;

    pub(crate) fn new(atype: AttributeType, length: u16) -> Self {
        Self { atype, length }
    }

    fn parse(data: &[u8]) -> Result<Self, StunParseError> {
        if data.len() < Self::LENGTH {
            return Err(StunParseError::Truncated {
                expected: Self::LENGTH,
                actual: data.len(),
            });
        }
        let ret = Self {
            atype: BigEndian::read_u16(&data[0..2]).into(),
            length: BigEndian::read_u16(&data[2..4]),
        };
        Ok(ret)
    }

    pub(crate) fn write_into(&self, ret: &mut [u8]) {
        BigEndian::write_u16(&mut ret[0..2], self.atype.into());
        BigEndian::write_u16(&mut ret[2..4], self.length);
    }

    /// Returns the type of the attribute
    pub fn get_type(&self) -> AttributeType {
        self.atype
    }

    /// Returns the length of the attribute
    pub fn length(&self) -> u16 {
        self.length
    }
}

impl TryFrom<&[u8]> for AttributeHeader {
    type Error = StunParseError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        AttributeHeader::parse(value)
    }
}

/// A STUN attribute for use in [`Message`](crate::message::Message)s
pub trait Attribute: std::fmt::Debug {
    /// Retrieve the type of an `Attribute`.
    fn get_type(&self) -> AttributeType;

    /// Retrieve the length of an `Attribute`.  This is not the padded length as stored in a
    /// `Message` and does not include the size of the attribute header.
    fn length(&self) -> u16;
}

/// The static [`AttributeType`] of an [`Attribute`] implementation
pub trait AttributeStaticType {
    /// The [`AttributeType`]
    const TYPE: AttributeType;
}

/// Maximum number of value bytes an [`AttributeWrite`] implementation may store inline.
pub const INLINE_VALUE_SIZE: usize = 32;

/// Write an [`Attribute`] into a [`MessageBuilder`](crate::builder::MessageBuilder)
///
/// The value of an attribute is made of a fixed part of at most [`INLINE_VALUE_SIZE`] bytes that
/// is copied into the builder followed by an optional borrowed payload.
pub trait AttributeWrite<'a>: Attribute {
    /// Write the fixed part of the value into `dest`, returning the number of bytes written.
    /// `dest` is [`INLINE_VALUE_SIZE`] bytes long.
    fn write_inline(&self, dest: &mut [u8]) -> usize;

    /// Variable length data following the fixed part of the value.
    fn payload(&self) -> &'a [u8] {
        &[]
    }
}

pub(crate) fn padded_attr_len(len: usize) -> usize {
    if len % 4 == 0 {
        len
    } else {
        len + 4 - len % 4
    }
}

/// The header and raw bytes of an unparsed [`Attribute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    /// The [`AttributeHeader`] of this [`RawAttribute`]
    pub header: AttributeHeader,
    /// The raw bytes of this [`RawAttribute`]
    pub value: &'a [u8],
}

impl std::fmt::Display for RawAttribute<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RawAttribute (type: {}, len: {}, data: {:x?})",
            self.header.get_type(),
            self.header.length(),
            self.value
        )
    }
}

impl<'a> RawAttribute<'a> {
    /// Create a new [`RawAttribute`]
    pub fn new(atype: AttributeType, data: &'a [u8]) -> Self {
        Self {
            header: AttributeHeader {
                atype,
                length: data.len() as u16,
            },
            value: data,
        }
    }

    /// Deserialize a `RawAttribute` from bytes.
    ///
    /// Only the value bytes must be present.  Any padding is not checked.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::{RawAttribute, AttributeType};
    /// let data = &[0, 1, 0, 2, 5, 6, 0, 0];
    /// let attr = RawAttribute::from_bytes(data).unwrap();
    /// assert_eq!(attr.get_type(), AttributeType::new(1));
    /// assert_eq!(attr.length(), 2);
    /// assert_eq!(attr.value, &[5, 6]);
    /// ```
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, StunParseError> {
        let header = AttributeHeader::parse(data)?;
        let available = data.len() - AttributeHeader::LENGTH;
        // the advertised length is larger than actual data -> error
        if header.length() as usize > available {
            return Err(StunParseError::Truncated {
                expected: header.length() as usize,
                actual: available,
            });
        }
        Ok(Self {
            header,
            value: &data[AttributeHeader::LENGTH..AttributeHeader::LENGTH + header.length() as usize],
        })
    }

    /// Returns the [`AttributeType`] of this [`RawAttribute`]
    pub fn get_type(&self) -> AttributeType {
        self.header.get_type()
    }

    /// Returns the length of this [`RawAttribute`]
    pub fn length(&self) -> u16 {
        self.header.length()
    }

    /// The length in bytes of this attribute as stored in a
    /// [`Message`](crate::message::Message) including any padding and the attribute header.
    pub fn padded_len(&self) -> usize {
        AttributeHeader::LENGTH + padded_attr_len(self.length() as usize)
    }

    /// Helper for checking that a raw attribute is of a particular type and within a certain range
    pub fn check_type_and_len(
        &self,
        atype: AttributeType,
        allowed_range: impl std::ops::RangeBounds<usize>,
    ) -> Result<(), StunParseError> {
        if self.header.get_type() != atype {
            return Err(StunParseError::WrongAttributeImplementation);
        }
        check_len(self.value.len(), allowed_range)
    }
}

impl Attribute for RawAttribute<'_> {
    fn get_type(&self) -> AttributeType {
        self.header.get_type()
    }

    fn length(&self) -> u16 {
        self.header.length()
    }
}

impl<'a> AttributeWrite<'a> for RawAttribute<'a> {
    fn write_inline(&self, _dest: &mut [u8]) -> usize {
        0
    }

    fn payload(&self) -> &'a [u8] {
        self.value
    }
}

fn check_len(
    len: usize,
    allowed_range: impl std::ops::RangeBounds<usize>,
) -> Result<(), StunParseError> {
    match allowed_range.start_bound() {
        std::ops::Bound::Unbounded => (),
        std::ops::Bound::Included(start) => {
            if len < *start {
                return Err(StunParseError::Truncated {
                    expected: *start,
                    actual: len,
                });
            }
        }
        std::ops::Bound::Excluded(start) => {
            if len <= *start {
                return Err(StunParseError::Truncated {
                    expected: start + 1,
                    actual: len,
                });
            }
        }
    }
    match allowed_range.end_bound() {
        std::ops::Bound::Unbounded => (),
        std::ops::Bound::Included(end) => {
            if len > *end {
                return Err(StunParseError::TooLarge {
                    expected: *end,
                    actual: len,
                });
            }
        }
        std::ops::Bound::Excluded(end) => {
            if len >= *end {
                return Err(StunParseError::TooLarge {
                    expected: *end - 1,
                    actual: len,
                });
            }
        }
    }
    Ok(())
}
