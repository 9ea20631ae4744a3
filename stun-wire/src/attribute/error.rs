// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;

use byteorder::{BigEndian, ByteOrder};
use smallvec::SmallVec;

use crate::message::{StunParseError, StunWriteError};

use super::{Attribute, AttributeStaticType, AttributeType, AttributeWrite, RawAttribute};

/// The ErrorCode [`Attribute`]
///
/// The reason phrase is borrowed and written after the fixed four byte code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode<'a> {
    code: u16,
    reason: &'a str,
}

impl AttributeStaticType for ErrorCode<'_> {
    const TYPE: AttributeType = AttributeType(0x0009);
}

impl Attribute for ErrorCode<'_> {
    fn get_type(&self) -> AttributeType {
        Self::TYPE
    }

    fn length(&self) -> u16 {
        self.reason.len() as u16 + 4
    }
}

impl<'a> AttributeWrite<'a> for ErrorCode<'a> {
    fn write_inline(&self, dest: &mut [u8]) -> usize {
        dest[0] = 0;
        dest[1] = 0;
        dest[2] = (self.code / 100) as u8;
        dest[3] = (self.code % 100) as u8;
        4
    }

    fn payload(&self) -> &'a [u8] {
        self.reason.as_bytes()
    }
}

impl<'a> TryFrom<&RawAttribute<'a>> for ErrorCode<'a> {
    type Error = StunParseError;

    fn try_from(raw: &RawAttribute<'a>) -> Result<Self, Self::Error> {
        raw.check_type_and_len(Self::TYPE, 4..=ErrorCode::MAX_REASON_LEN + 4)?;
        let code_h = (raw.value[2] & 0x7) as u16;
        let code_tens = raw.value[3] as u16;
        if !(3..7).contains(&code_h) || code_tens > 99 {
            return Err(StunParseError::InvalidAttributeData);
        }
        Ok(Self {
            code: code_h * 100 + code_tens,
            reason: std::str::from_utf8(&raw.value[4..])
                .map_err(|_| StunParseError::InvalidAttributeData)?,
        })
    }
}

impl<'a> ErrorCode<'a> {
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const UNKNOWN_ATTRIBUTE: u16 = 420;

    /// The maximum length of a reason phrase in bytes
    pub const MAX_REASON_LEN: usize = 763;

    /// Create a new [`ErrorCode`] [`Attribute`]
    ///
    /// # Errors
    ///
    /// - When the code value is out of range [300, 699]
    /// - When the reason is longer than [`ErrorCode::MAX_REASON_LEN`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// let error = ErrorCode::new(400, "Bad request").unwrap();
    /// assert_eq!(error.code(), 400);
    /// assert_eq!(error.reason(), "Bad request");
    /// assert!(ErrorCode::new(299, "too low").is_err());
    /// ```
    pub fn new(code: u16, reason: &'a str) -> Result<Self, StunWriteError> {
        if !(300..700).contains(&code) {
            return Err(StunWriteError::OutOfRange {
                value: code as usize,
                min: 300,
                max: 699,
            });
        }
        if reason.len() > Self::MAX_REASON_LEN {
            return Err(StunWriteError::TooLarge {
                expected: Self::MAX_REASON_LEN,
                actual: reason.len(),
            });
        }
        Ok(Self { code, reason })
    }

    /// The error code value
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The error code reason string
    pub fn reason(&self) -> &'a str {
        self.reason
    }
}

impl std::fmt::Display for ErrorCode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} '{}'", Self::TYPE, self.code, self.reason)
    }
}

/// The maximum number of attribute types an [`UnknownAttributes`] can hold
pub const UNKNOWN_ATTRIBUTES_CAPACITY: usize = 15;

/// Returned by [`UnknownAttributes::try_push`] when the list is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No space to store unknown attribute {}", .0)]
pub struct UnknownAttributesFull(pub AttributeType);

/// The UnknownAttributes [`Attribute`]
///
/// Holds at most [`UNKNOWN_ATTRIBUTES_CAPACITY`] attribute types in the order they were added.
/// Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownAttributes {
    attributes: SmallVec<[AttributeType; UNKNOWN_ATTRIBUTES_CAPACITY]>,
    truncated: bool,
}

impl AttributeStaticType for UnknownAttributes {
    const TYPE: AttributeType = AttributeType(0x000A);
}

impl Attribute for UnknownAttributes {
    fn get_type(&self) -> AttributeType {
        Self::TYPE
    }

    fn length(&self) -> u16 {
        (self.attributes.len() as u16) * 2
    }
}

impl AttributeWrite<'_> for UnknownAttributes {
    fn write_inline(&self, dest: &mut [u8]) -> usize {
        for (i, attr) in self.attributes.iter().enumerate() {
            BigEndian::write_u16(&mut dest[i * 2..i * 2 + 2], attr.value());
        }
        self.attributes.len() * 2
    }
}

impl TryFrom<&RawAttribute<'_>> for UnknownAttributes {
    type Error = StunParseError;

    fn try_from(raw: &RawAttribute) -> Result<Self, Self::Error> {
        raw.check_type_and_len(Self::TYPE, ..=UNKNOWN_ATTRIBUTES_CAPACITY * 2)?;
        if raw.value.len() % 2 != 0 {
            /* all attributes are 16-bits */
            return Err(StunParseError::Truncated {
                expected: raw.value.len() + 1,
                actual: raw.value.len(),
            });
        }
        Ok(Self {
            attributes: raw
                .value
                .chunks_exact(2)
                .map(|attr| BigEndian::read_u16(attr).into())
                .collect(),
            truncated: false,
        })
    }
}

impl UnknownAttributes {
    /// Append an [`AttributeType`] to the list
    ///
    /// # Errors
    ///
    /// - When the list already holds [`UNKNOWN_ATTRIBUTES_CAPACITY`] entries.  The list is marked
    ///   as truncated.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// let mut unknown = UnknownAttributes::default();
    /// for i in 0..UNKNOWN_ATTRIBUTES_CAPACITY as u16 {
    ///     unknown.try_push(AttributeType::new(0x7000 + i)).unwrap();
    /// }
    /// assert!(unknown.try_push(AttributeType::new(0x7fff)).is_err());
    /// assert_eq!(unknown.len(), UNKNOWN_ATTRIBUTES_CAPACITY);
    /// assert!(unknown.is_truncated());
    /// ```
    pub fn try_push(&mut self, atype: AttributeType) -> Result<(), UnknownAttributesFull> {
        if self.attributes.len() >= UNKNOWN_ATTRIBUTES_CAPACITY {
            self.truncated = true;
            return Err(UnknownAttributesFull(atype));
        }
        self.attributes.push(atype);
        Ok(())
    }

    /// Whether no attribute types have been added
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The number of attribute types in the list
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Iterate over the attribute types in the order they were added
    pub fn iter(&self) -> impl Iterator<Item = AttributeType> + '_ {
        self.attributes.iter().copied()
    }

    /// The attribute types in the order they were added
    pub fn as_slice(&self) -> &[AttributeType] {
        &self.attributes
    }

    /// Whether an attribute type was refused because the list was full
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl std::fmt::Display for UnknownAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [", Self::TYPE)?;
        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:#06x}", attr.value())?;
        }
        write!(f, "]")?;
        if self.truncated {
            write!(f, " (truncated)")?;
        }
        Ok(())
    }
}
