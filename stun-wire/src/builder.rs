// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Building outgoing STUN messages
//!
//! A [`MessageBuilder`] holds the message header and an ordered list of attribute segments.  Each
//! segment stores the attribute header and the fixed part of the value inline, optionally
//! followed by a borrowed payload.  Padding is taken from a static block of zeros so nothing is
//! copied into the builder apart from the fixed parts.
//!
//! MESSAGE-INTEGRITY and FINGERPRINT are computed over a [`CanonicalView`] of the segments
//! preceding them, the same view a receiver reconstructs from the message.
//!
//! # Examples
//!
//! ```
//! # use stun_wire::attribute::*;
//! # use stun_wire::builder::MessageBuilder;
//! # use stun_wire::message::*;
//! let tid = TransactionId::generate();
//! let mtype = MessageType::from_class_method(MessageClass::Success, BINDING);
//! let mut builder = MessageBuilder::new(mtype, tid);
//! let addr = "192.168.1.2:4000".parse().unwrap();
//! builder.add_attribute(&XorMappedAddress::new(addr, tid)).unwrap();
//! builder.add_message_integrity(b"password").unwrap();
//! builder.add_fingerprint().unwrap();
//! let data = builder.build();
//! assert_eq!(data.len(), 20 + 12 + 24 + 8);
//!
//! let msg = Message::from_bytes(&data).unwrap();
//! assert_eq!(msg.transaction_id(), tid);
//! assert_eq!(msg.header().data_length(), 44);
//! ```

use byteorder::{BigEndian, ByteOrder};
use smallvec::SmallVec;

use crate::attribute::{
    padded_attr_len, AttributeHeader, AttributeStaticType, AttributeType, AttributeWrite,
    Fingerprint, MessageIntegrity, INLINE_VALUE_SIZE,
};
use crate::canonical::CanonicalView;
use crate::message::{MessageHeader, MessageType, StunWriteError, TransactionId};

use tracing::trace;

/// The maximum number of attributes a [`MessageBuilder`] can hold.
pub const MAX_SEGMENTS: usize = 8;

const SEGMENT_INLINE_SIZE: usize = AttributeHeader::LENGTH + INLINE_VALUE_SIZE;

static ZERO_PADDING: [u8; 3] = [0; 3];

#[derive(Debug, Clone)]
struct Segment<'a> {
    atype: AttributeType,
    fixed: [u8; SEGMENT_INLINE_SIZE],
    fixed_len: usize,
    payload: &'a [u8],
}

impl<'a> Segment<'a> {
    fn value_len(&self) -> usize {
        self.fixed_len - AttributeHeader::LENGTH + self.payload.len()
    }

    fn padded_len(&self) -> usize {
        AttributeHeader::LENGTH + padded_attr_len(self.value_len())
    }

    fn padding(&self) -> &'static [u8] {
        let value_len = self.value_len();
        &ZERO_PADDING[..padded_attr_len(value_len) - value_len]
    }

    fn chunks(&self) -> [&[u8]; 3] {
        [&self.fixed[..self.fixed_len], self.payload, self.padding()]
    }
}

/// Builder for an outgoing STUN message
#[derive(Debug, Clone)]
pub struct MessageBuilder<'a> {
    header: [u8; MessageHeader::LENGTH],
    transaction: TransactionId,
    length: u16,
    segments: SmallVec<[Segment<'a>; MAX_SEGMENTS]>,
    has_integrity: bool,
    has_fingerprint: bool,
}

impl<'a> MessageBuilder<'a> {
    /// Create a new [`MessageBuilder`] without any attributes
    pub fn new(mtype: MessageType, transaction: TransactionId) -> Self {
        let mut header = [0; MessageHeader::LENGTH];
        MessageHeader::new(mtype, transaction, 0).write_into(&mut header);
        Self {
            header,
            transaction,
            length: 0,
            segments: SmallVec::new(),
            has_integrity: false,
            has_fingerprint: false,
        }
    }

    /// The [`TransactionId`] of the message being built
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction
    }

    /// The current value of the message length field
    pub fn data_length(&self) -> u16 {
        self.length
    }

    /// The number of bytes the message currently occupies including the header
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        MessageHeader::LENGTH + self.length as usize
    }

    /// Whether an attribute of type `atype` has been added
    pub fn has_attribute(&self, atype: AttributeType) -> bool {
        self.segments.iter().any(|segment| segment.atype == atype)
    }

    /// Add an attribute to the message.  Only one attribute of each [`AttributeType`] can be
    /// added.
    ///
    /// # Errors
    ///
    /// - If the attribute is a [`MessageIntegrity`] or [`Fingerprint`] attribute.  Use
    ///   [`MessageBuilder::add_message_integrity`] or [`MessageBuilder::add_fingerprint`]
    ///   instead.
    /// - If a [`MessageIntegrity`] or [`Fingerprint`] attribute has already been added.
    /// - If an attribute of the same type already exists.
    /// - If the message cannot hold any more attributes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// # use stun_wire::builder::MessageBuilder;
    /// # use stun_wire::message::*;
    /// let mtype = MessageType::from_class_method(MessageClass::Request, BINDING);
    /// let mut builder = MessageBuilder::new(mtype, TransactionId::generate());
    /// assert!(builder.add_attribute(&Priority::new(100)).is_ok());
    /// assert!(builder.add_attribute(&Priority::new(200)).is_err());
    /// assert!(builder.add_attribute(&Fingerprint::new(0)).is_err());
    /// assert_eq!(builder.len(), 28);
    /// ```
    #[tracing::instrument(
        name = "message_add_attribute",
        level = "trace",
        err,
        skip(self, attr),
        fields(
            msg.transaction = %self.transaction_id(),
            attribute_type = %attr.get_type(),
        )
    )]
    pub fn add_attribute(&mut self, attr: &dyn AttributeWrite<'a>) -> Result<(), StunWriteError> {
        let atype = attr.get_type();
        if atype == MessageIntegrity::TYPE || atype == Fingerprint::TYPE {
            return Err(StunWriteError::ReservedAttribute(atype));
        }
        if self.has_fingerprint {
            return Err(StunWriteError::FingerprintExists);
        }
        if self.has_integrity {
            return Err(StunWriteError::MessageIntegrityExists);
        }
        if self.has_attribute(atype) {
            return Err(StunWriteError::AttributeExists(atype));
        }
        self.push_segment(attr)?;
        Ok(())
    }

    /// Add a MESSAGE-INTEGRITY attribute computed with `key` over everything added so far.
    ///
    /// # Errors
    ///
    /// - If a [`MessageIntegrity`] or [`Fingerprint`] attribute has already been added.
    /// - If the message cannot hold any more attributes.
    #[tracing::instrument(
        name = "message_add_integrity",
        level = "trace",
        err,
        skip(self, key),
        fields(
            msg.transaction = %self.transaction_id(),
        )
    )]
    pub fn add_message_integrity(&mut self, key: &[u8]) -> Result<(), StunWriteError> {
        if self.has_fingerprint {
            return Err(StunWriteError::FingerprintExists);
        }
        if self.has_integrity {
            return Err(StunWriteError::MessageIntegrityExists);
        }
        let idx = self.push_segment(&MessageIntegrity::new([0; 20]))?;
        let computed = MessageIntegrity::compute(&self.canonical_view(idx), key);
        let hmac = match computed {
            Ok(hmac) => hmac,
            Err(e) => {
                self.pop_segment();
                return Err(e);
            }
        };
        let value_start = AttributeHeader::LENGTH;
        self.segments[idx].fixed[value_start..value_start + hmac.len()].copy_from_slice(&hmac);
        self.has_integrity = true;
        Ok(())
    }

    /// Add a FINGERPRINT attribute computed over everything added so far.  No attributes can be
    /// added afterwards.
    ///
    /// # Errors
    ///
    /// - If a [`Fingerprint`] attribute has already been added.
    /// - If the message cannot hold any more attributes.
    #[tracing::instrument(
        name = "message_add_fingerprint",
        level = "trace",
        err,
        skip(self),
        fields(
            msg.transaction = %self.transaction_id(),
        )
    )]
    pub fn add_fingerprint(&mut self) -> Result<(), StunWriteError> {
        if self.has_fingerprint {
            return Err(StunWriteError::FingerprintExists);
        }
        let idx = self.push_segment(&Fingerprint::new(0))?;
        let fingerprint = Fingerprint::compute(&self.canonical_view(idx));
        let value_start = AttributeHeader::LENGTH;
        BigEndian::write_u32(
            &mut self.segments[idx].fixed[value_start..value_start + 4],
            fingerprint,
        );
        self.has_fingerprint = true;
        Ok(())
    }

    /// The bytes of the header and the attributes before attribute `end` with the header length
    /// field set to the length of the message ending directly after attribute `end`.
    ///
    /// This is the data covered by a MESSAGE-INTEGRITY or FINGERPRINT attribute at index `end`.
    /// If `end` is past the last attribute, the view is the complete message.
    pub fn canonical_view(&self, end: usize) -> CanonicalView<'_> {
        let length: usize = self
            .segments
            .iter()
            .take(end.saturating_add(1))
            .map(Segment::padded_len)
            .sum();
        // bounded by self.length which is a u16
        CanonicalView::new(
            &self.header,
            length as u16,
            self.segments
                .iter()
                .take(end)
                .flat_map(|segment| segment.chunks()),
        )
    }

    /// The bytes of the complete message as they are sent
    pub fn wire_view(&self) -> CanonicalView<'_> {
        CanonicalView::new(
            &self.header,
            self.length,
            self.segments.iter().flat_map(|segment| segment.chunks()),
        )
    }

    /// Write the message into `dest`, returning the number of bytes written
    ///
    /// # Errors
    ///
    /// - If `dest` is too small to hold the message.
    pub fn write_into(&self, dest: &mut [u8]) -> Result<usize, StunWriteError> {
        self.wire_view()
            .write_into(dest)
            .ok_or(StunWriteError::TooSmall {
                expected: self.len(),
                actual: dest.len(),
            })
    }

    /// Write the message into a new `Vec`
    pub fn build(&self) -> Vec<u8> {
        self.wire_view().to_vec()
    }

    fn push_segment(&mut self, attr: &dyn AttributeWrite<'a>) -> Result<usize, StunWriteError> {
        if self.segments.len() >= MAX_SEGMENTS {
            return Err(StunWriteError::TooManySegments(MAX_SEGMENTS));
        }
        let mut fixed = [0; SEGMENT_INLINE_SIZE];
        let inline_len = attr.write_inline(&mut fixed[AttributeHeader::LENGTH..]);
        let payload = attr.payload();
        let value_len = inline_len + payload.len();
        let new_length =
            self.length as usize + AttributeHeader::LENGTH + padded_attr_len(value_len);
        if new_length > u16::MAX as usize {
            return Err(StunWriteError::TooLarge {
                expected: u16::MAX as usize,
                actual: new_length,
            });
        }
        AttributeHeader::new(attr.get_type(), value_len as u16).write_into(&mut fixed);
        trace!(
            "adding attribute {} with value length {}",
            attr.get_type(),
            value_len
        );
        self.segments.push(Segment {
            atype: attr.get_type(),
            fixed,
            fixed_len: AttributeHeader::LENGTH + inline_len,
            payload,
        });
        self.length = new_length as u16;
        Ok(self.segments.len() - 1)
    }

    fn pop_segment(&mut self) {
        if let Some(segment) = self.segments.pop() {
            self.length -= segment.padded_len() as u16;
        }
    }
}
