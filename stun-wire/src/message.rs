// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN Messages
//!
//! Provides the fixed STUN header and a borrowed view of a received [`Message`] as specified in
//! [RFC5389].  Only the Binding method is given a name, any other method value is still decoded
//! so that callers can decide what to do with it.
//!
//! Parsing never copies: a [`Message`] borrows the datagram it was created from and the
//! [`StunAttributes`] produced by [`Message::parse_attributes`] borrow from the same data.
//!
//! [RFC5389]: https://tools.ietf.org/html/rfc5389
//!
//! ## Examples
//!
//! ### Parse a STUN [`Message`]
//!
//! ```
//! use stun_wire::message::{Message, MessageType, MessageClass, BINDING};
//!
//! let msg_data = [
//!     0x00, 0x01, 0x00, 0x08, // method, class and length
//!     0x21, 0x12, 0xA4, 0x42, // Fixed STUN magic bytes
//!     0x00, 0x00, 0x00, 0x00, // \
//!     0x00, 0x00, 0x00, 0x00, // } transaction ID
//!     0x00, 0x00, 0x73, 0x92, // /
//!     0x00, 0x24, 0x00, 0x04, // Priority attribute header (type and length)
//!     0x6e, 0x00, 0x01, 0xff  // Priority attribute value
//! ];
//! let msg = Message::from_bytes(&msg_data).unwrap();
//!
//! // the various parts of a message can be retreived
//! assert_eq!(msg.get_type(), MessageType::from_class_method(MessageClass::Request, BINDING));
//! assert_eq!(msg.transaction_id(), 0x7392.into());
//!
//! let attrs = msg.parse_attributes().unwrap();
//! assert_eq!(attrs.priority(), Some(0x6e0001ff));
//! ```

use std::convert::TryFrom;

use byteorder::{BigEndian, ByteOrder};

use crate::attribute::*;
use crate::canonical::CanonicalView;

use tracing::{trace, warn};

/// The value of the magic cookie (in network byte order) as specified in RFC5389, and RFC8489.
pub const MAGIC_COOKIE: u32 = 0x2112A442;

/// The method in a STUN [`Message`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Method(u16);

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#x}: {})", self.0, self.0, self.name())
    }
}

impl Method {
    /// Create a new [`Method`] from an existing value
    ///
    /// Note: the value passed in is not encoded as in a stun message
    ///
    /// Panics if the value is out of range (>= 0x1000)
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::message::Method;
    /// assert_eq!(Method::new(0x123).value(), 0x123);
    /// ```
    pub const fn new(val: u16) -> Self {
        if val >= 0x1000 {
            panic!("Method value is out of range!");
        }
        Self(val)
    }

    /// Return the integer value of this [`Method`]
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns a human readable name of this `Method` or "unknown"
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::message::*;
    /// assert_eq!(BINDING.name(), "BINDING");
    /// assert_eq!(Method::new(0x3).name(), "unknown");
    /// ```
    pub fn name(self) -> &'static str {
        match self {
            BINDING => "BINDING",
            _ => "unknown",
        }
    }
}

/// The value of the binding message type.  Can be used in either a request or an indication
/// message.
pub const BINDING: Method = Method::new(0x0001);

/// Possible errors when parsing a STUN message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StunParseError {
    /// Not a STUN message.
    #[error("The provided data is not a STUN message")]
    NotStun,
    /// The message has been truncated
    #[error("Not enough data available to parse the packet, expected {}, actual {}", .expected, .actual)]
    Truncated {
        /// The expeced number of bytes
        expected: usize,
        /// The encountered number of bytes
        actual: usize,
    },
    /// The message has been truncated
    #[error("Too many bytes for this data, expected {}, actual {}", .expected, .actual)]
    TooLarge {
        /// The expeced number of bytes
        expected: usize,
        /// The encountered number of bytes
        actual: usize,
    },
    /// An attribute was found after the message integrity attribute
    #[error("An attribute {} was encountered after a message integrity attribute", .0)]
    AttributeAfterIntegrity(AttributeType),
    /// The attribute contains invalid data
    #[error("The attribute contains invalid data")]
    InvalidAttributeData,
    /// The attribute does not parse this data
    #[error("Cannot parse with this attribute")]
    WrongAttributeImplementation,
}

/// Errors produced when writing a STUN message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StunWriteError {
    /// The attribute can only be added through a dedicated function of the builder
    #[error("The attribute {} cannot be added directly", .0)]
    ReservedAttribute(AttributeType),
    /// The attribute already exists in the message
    #[error("The attribute {} already exists in the message", .0)]
    AttributeExists(AttributeType),
    /// The fingerprint attribute already exists. Cannot write any further attributes
    #[error("The message already contains a fingerprint attribute")]
    FingerprintExists,
    /// A message integrity attribute already exists. Cannot write any further attributes
    #[error("The message already contains a message intregrity attribute")]
    MessageIntegrityExists,
    /// The attribute or message would be too large
    #[error("Too many bytes for this data, expected {}, actual {}", .expected, .actual)]
    TooLarge {
        /// The maximum number of bytes
        expected: usize,
        /// The encountered number of bytes
        actual: usize,
    },
    /// The destination is too small
    #[error("Not enough space available to write the message, expected {}, actual {}", .expected, .actual)]
    TooSmall {
        /// The expected number of bytes
        expected: usize,
        /// The encountered number of bytes
        actual: usize,
    },
    /// The message already holds the maximum number of attributes
    #[error("The message cannot hold more than {} attributes", .0)]
    TooManySegments(usize),
    /// Failed to compute integrity
    #[error("Failed to compute integrity")]
    IntegrityFailed,
    /// Out of range input provided
    #[error("Out of range input provided")]
    OutOfRange {
        /// The value provided.
        value: usize,
        /// The minimum allowed value.
        min: usize,
        /// The maximum allowed value.
        max: usize,
    },
}

/// The class of a [`Message`].
///
/// There are four classes of [`Message`]s within the STUN protocol:
///
///  - [Request][`MessageClass::Request`] indicates that a request is being made and a
///    response is expected.
///  - An [Indication][`MessageClass::Indication`] is a fire and forget [`Message`] where
///    no response is required or expected.
///  - [Success][`MessageClass::Success`] indicates that a [Request][`MessageClass::Request`]
///    was successfully handled.
///  - [Error][`MessageClass::Error`] class indicates that an error was produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageClass {
    /// A request that is expecting a response of either Success, or Error.
    Request,
    /// A request that does not expect a response.
    Indication,
    /// A success response to a previous Request.
    Success,
    /// An error response to a previous Request.
    Error,
}

impl MessageClass {
    /// Returns whether this [`MessageClass`] is of a response type.  i.e. is either
    /// [`MessageClass::Success`] or [`MessageClass::Error`].
    pub fn is_response(self) -> bool {
        matches!(self, MessageClass::Success | MessageClass::Error)
    }

    fn to_bits(self) -> u16 {
        match self {
            MessageClass::Request => 0x000,
            MessageClass::Indication => 0x010,
            MessageClass::Success => 0x100,
            MessageClass::Error => 0x110,
        }
    }
}

/// The type of a [`Message`].  A combination of a [`MessageClass`] and a STUN method.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MessageType(u16);

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MessageType(class: {:?}, method: {})",
            self.class(),
            self.method(),
        )
    }
}

impl MessageType {
    /// Create a new [`MessageType`] from the provided [`MessageClass`] and method
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::{MessageType, MessageClass, BINDING};
    /// let mtype = MessageType::from_class_method(MessageClass::Error, BINDING);
    /// assert_eq!(mtype.value(), 0x0111);
    /// ```
    pub fn from_class_method(class: MessageClass, method: Method) -> Self {
        let class_bits = MessageClass::to_bits(class);
        let method = method.value();
        let method_bits = method & 0xf | (method & 0x70) << 1 | (method & 0xf80) << 2;
        Self(class_bits | method_bits)
    }

    /// The encoded 16-bit value of this [`MessageType`]
    pub fn value(self) -> u16 {
        self.0
    }

    /// Retrieves the class of a [`MessageType`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::{MessageType, MessageClass, BINDING};
    /// let mtype = MessageType::from_class_method(MessageClass::Indication, BINDING);
    /// assert_eq!(mtype.class(), MessageClass::Indication);
    /// ```
    pub fn class(self) -> MessageClass {
        match (self.0 & 0x10) >> 4 | (self.0 & 0x100) >> 7 {
            0x0 => MessageClass::Request,
            0x1 => MessageClass::Indication,
            0x2 => MessageClass::Success,
            _ => MessageClass::Error,
        }
    }

    /// Returns whether class of a [`MessageType`] is equal to the provided [`MessageClass`]
    pub fn has_class(self, cls: MessageClass) -> bool {
        self.class() == cls
    }

    /// Returns whether the class of a [`MessageType`] indicates a response [`Message`]
    pub fn is_response(self) -> bool {
        self.class().is_response()
    }

    /// Returns the method of a [`MessageType`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::{MessageType, MessageClass, BINDING};
    /// let mtype = MessageType::from_class_method(MessageClass::Indication, BINDING);
    /// assert_eq!(mtype.method(), BINDING);
    /// ```
    pub fn method(self) -> Method {
        Method::new(self.0 & 0xf | (self.0 & 0xe0) >> 1 | (self.0 & 0x3e00) >> 2)
    }

    /// Returns whether the method of a [`MessageType`] is equal to the provided value
    pub fn has_method(self, method: Method) -> bool {
        self.method() == method
    }

    /// Convert a [`MessageType`] to network bytes
    pub fn write_into(&self, dest: &mut [u8]) {
        BigEndian::write_u16(dest, self.0);
    }

    /// Convert a set of network bytes into a [`MessageType`] or return an error
    pub fn from_bytes(data: &[u8]) -> Result<Self, StunParseError> {
        if data.len() < 2 {
            return Err(StunParseError::Truncated {
                expected: 2,
                actual: data.len(),
            });
        }
        let data = BigEndian::read_u16(data);
        if data & 0xc000 != 0x0 {
            /* not a stun packet */
            return Err(StunParseError::NotStun);
        }
        Ok(Self(data))
    }
}

impl TryFrom<&[u8]> for MessageType {
    type Error = StunParseError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        MessageType::from_bytes(value)
    }
}

/// A unique transaction identifier for each message and it's (possible) response.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct TransactionId {
    id: u128,
}

impl TransactionId {
    /// Generate a new STUN transaction identifier.
    pub fn generate() -> TransactionId {
        use rand::Rng;
        let mut rng = rand::rng();
        rng.random::<u128>().into()
    }

    /// The 12 bytes of this [`TransactionId`] in network order
    pub fn to_bytes(self) -> [u8; 12] {
        let mut ret = [0; 12];
        BigEndian::write_u32(&mut ret[..4], (self.id >> 64) as u32);
        BigEndian::write_u64(&mut ret[4..], self.id as u64);
        ret
    }

    /// The three 32-bit words of this [`TransactionId`] in the order they appear on the wire
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::TransactionId;
    /// let id = TransactionId::from(0x0102_0304_0506_0708_090a_0b0c);
    /// assert_eq!(id.words(), [0x01020304, 0x05060708, 0x090a0b0c]);
    /// ```
    pub fn words(self) -> [u32; 3] {
        [
            (self.id >> 64) as u32,
            (self.id >> 32) as u32,
            self.id as u32,
        ]
    }
}

impl From<u128> for TransactionId {
    fn from(id: u128) -> Self {
        Self {
            id: id & 0xffff_ffff_ffff_ffff_ffff_ffff,
        }
    }
}
impl From<TransactionId> for u128 {
    fn from(id: TransactionId) -> Self {
        id.id
    }
}
impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.id)
    }
}

/// The fixed length header of a STUN message.  Allows reading the message header for a quick
/// check if this message is a valid STUN message.  Can also be used to expose the length of the
/// complete message without needing to receive the entire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    mtype: MessageType,
    transaction_id: TransactionId,
    length: u16,
    cookie: u32,
}

impl MessageHeader {
    /// The length of the STUN message header.
    pub const LENGTH: usize = 20;

    /// Deserialize a `MessageHeader`
    ///
    /// The magic cookie is not checked here, see [`MessageHeader::has_magic_cookie`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::{MessageHeader, MessageType, MessageClass, BINDING};
    /// let msg_data = [0, 1, 0, 8, 33, 18, 164, 66, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 232];
    /// let header = MessageHeader::from_bytes(&msg_data).unwrap();
    /// assert_eq!(header.get_type(), MessageType::from_class_method(MessageClass::Request, BINDING));
    /// assert_eq!(header.transaction_id(), 1000.into());
    /// assert_eq!(header.data_length(), 8);
    /// assert!(header.has_magic_cookie());
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self, StunParseError> {
        if data.len() < Self::LENGTH {
            return Err(StunParseError::Truncated {
                expected: Self::LENGTH,
                actual: data.len(),
            });
        }
        let mtype = MessageType::from_bytes(data)?;
        let length = BigEndian::read_u16(&data[2..4]);
        let cookie = BigEndian::read_u32(&data[4..8]);
        let tid = BigEndian::read_u128(&data[4..20]);

        Ok(Self {
            mtype,
            transaction_id: tid.into(),
            length,
            cookie,
        })
    }

    pub(crate) fn new(mtype: MessageType, transaction_id: TransactionId, length: u16) -> Self {
        Self {
            mtype,
            transaction_id,
            length,
            cookie: MAGIC_COOKIE,
        }
    }

    /// The number of bytes of content in this [`MessageHeader`]. Adding both `data_length()`
    /// and [`MessageHeader::LENGTH`] will result in the size of the complete STUN message.
    pub fn data_length(&self) -> u16 {
        self.length
    }

    /// The [`TransactionId`] of this [`MessageHeader`]
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// The [`MessageType`] of this [`MessageHeader`]
    pub fn get_type(&self) -> MessageType {
        self.mtype
    }

    /// The value found in the magic cookie position of this [`MessageHeader`]
    pub fn cookie(&self) -> u32 {
        self.cookie
    }

    /// Whether the cookie field holds [`MAGIC_COOKIE`].  RFC3489 peers place random data here.
    pub fn has_magic_cookie(&self) -> bool {
        self.cookie == MAGIC_COOKIE
    }

    pub(crate) fn write_into(&self, dest: &mut [u8; 20]) {
        self.mtype.write_into(&mut dest[..2]);
        BigEndian::write_u16(&mut dest[2..4], self.length);
        BigEndian::write_u32(&mut dest[4..8], self.cookie);
        dest[8..20].copy_from_slice(&self.transaction_id.to_bytes());
    }
}

/// A received STUN message
///
/// Borrows the datagram it was parsed from.  Only the header and the declared length are checked
/// on construction; attributes are parsed on request with [`Message::parse_attributes`].
#[derive(Debug, Clone)]
pub struct Message<'a> {
    data: &'a [u8],
    header: MessageHeader,
    raw_header: [u8; MessageHeader::LENGTH],
}

impl std::fmt::Display for Message<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Message(class: {:?}, method: {}, transaction: {}, length: {})",
            self.class(),
            self.method(),
            self.transaction_id(),
            self.header.data_length(),
        )
    }
}

impl<'a> Message<'a> {
    /// Deserialize a `Message`
    ///
    /// Any bytes in `data` after the length declared in the header are not part of the
    /// [`Message`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::{Message, MessageType, MessageClass, BINDING};
    /// let msg_data = vec![0, 1, 0, 4, 33, 18, 164, 66, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 232, 0, 37, 0, 0, 99];
    /// let message = Message::from_bytes(&msg_data).unwrap();
    /// assert_eq!(message.get_type(), MessageType::from_class_method(MessageClass::Request, BINDING));
    /// assert_eq!(message.transaction_id(), 1000.into());
    /// assert_eq!(message.as_bytes().len(), 24);
    /// ```
    #[tracing::instrument(
        name = "message_from_bytes",
        level = "trace",
        skip(data),
        fields(
            data.len = data.len()
        )
    )]
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, StunParseError> {
        let header = MessageHeader::from_bytes(data)?;
        let mlength = header.data_length() as usize;
        if mlength + MessageHeader::LENGTH > data.len() {
            warn!(
                "malformed advertised size {} and data size {} don't match",
                mlength + MessageHeader::LENGTH,
                data.len()
            );
            return Err(StunParseError::Truncated {
                expected: mlength + MessageHeader::LENGTH,
                actual: data.len(),
            });
        }

        let mut raw_header = [0; MessageHeader::LENGTH];
        raw_header.copy_from_slice(&data[..MessageHeader::LENGTH]);

        Ok(Message {
            data: &data[..MessageHeader::LENGTH + mlength],
            header,
            raw_header,
        })
    }

    /// The [`MessageHeader`] of this [`Message`]
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// Retrieve the [`MessageType`] of a [`Message`]
    pub fn get_type(&self) -> MessageType {
        self.header.get_type()
    }

    /// Retrieve the [`MessageClass`] of a [`Message`]
    pub fn class(&self) -> MessageClass {
        self.get_type().class()
    }

    /// Returns whether the [`Message`] is of the specified [`MessageClass`]
    pub fn has_class(&self, cls: MessageClass) -> bool {
        self.class() == cls
    }

    /// Retrieve the method of a [`Message`]
    pub fn method(&self) -> Method {
        self.get_type().method()
    }

    /// Returns whether the [`Message`] is of the specified method
    pub fn has_method(&self, method: Method) -> bool {
        self.method() == method
    }

    /// Retrieve the [`TransactionId`] of a [`Message`]
    pub fn transaction_id(&self) -> TransactionId {
        self.header.transaction_id()
    }

    /// The bytes of this [`Message`] including the header
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// The bytes of the attribute section of this [`Message`]
    pub fn attribute_bytes(&self) -> &'a [u8] {
        &self.data[MessageHeader::LENGTH..]
    }

    /// Iterate over the attributes of this [`Message`] together with their offset from the start
    /// of the attribute section.  Iteration stops at the first attribute that cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::Message;
    /// # use stun_wire::attribute::Priority;
    /// # use stun_wire::prelude::*;
    /// let msg_data = [
    ///     0x00, 0x01, 0x00, 0x0c, 0x21, 0x12, 0xa4, 0x42, 0x00, 0x00, 0x00, 0x00,
    ///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
    ///     0x00, 0x25, 0x00, 0x00, // USE-CANDIDATE
    ///     0x00, 0x24, 0x00, 0x04, 0x00, 0x00, 0x00, 0x64, // PRIORITY
    /// ];
    /// let msg = Message::from_bytes(&msg_data).unwrap();
    /// let mut iter = msg.iter_attributes();
    /// assert_eq!(iter.next().unwrap().0, 0);
    /// let (offset, raw) = iter.next().unwrap();
    /// assert_eq!(offset, 4);
    /// assert_eq!(raw.get_type(), Priority::TYPE);
    /// assert!(iter.next().is_none());
    /// ```
    pub fn iter_attributes(&self) -> MessageAttributesIter<'a> {
        MessageAttributesIter {
            data: self.attribute_bytes(),
            offset: 0,
        }
    }

    /// Parse the attributes of this [`Message`]
    ///
    /// The returned offsets are relative to [`Message::attribute_bytes`].
    pub fn parse_attributes(&self) -> Result<StunAttributes<'a>, AttributesError> {
        StunAttributes::parse(self.attribute_bytes())
    }

    /// The bytes covered by the FINGERPRINT attribute of this message.
    ///
    /// Everything before the FINGERPRINT attribute with the header length set to include the
    /// FINGERPRINT attribute itself.
    pub fn fingerprint_view(&self, fingerprint: &FingerprintRef) -> CanonicalView<'a> {
        let offset = fingerprint.offset();
        // the parser only returns offsets of attributes that fit inside the message
        let length = (offset + Fingerprint::PADDED_LEN) as u16;
        CanonicalView::new(
            &self.raw_header,
            length,
            [&self.data[MessageHeader::LENGTH..MessageHeader::LENGTH + offset]],
        )
    }

    /// The bytes covered by the MESSAGE-INTEGRITY attribute of this message.
    ///
    /// Everything before the MESSAGE-INTEGRITY attribute with the header length set to end
    /// directly after the MESSAGE-INTEGRITY attribute, ignoring any following FINGERPRINT.
    pub fn integrity_view(&self, integrity: &IntegrityRef<'_>) -> CanonicalView<'a> {
        let offset = integrity.offset();
        let length = (offset + MessageIntegrity::PADDED_LEN) as u16;
        CanonicalView::new(
            &self.raw_header,
            length,
            [&self.data[MessageHeader::LENGTH..MessageHeader::LENGTH + offset]],
        )
    }

    /// Check the FINGERPRINT attribute found while parsing `attrs` against this message.
    ///
    /// Returns `false` when there is no FINGERPRINT attribute.
    #[tracing::instrument(
        name = "message_verify_fingerprint",
        level = "trace",
        skip(self, attrs),
        fields(
            msg.transaction = %self.transaction_id(),
        )
    )]
    pub fn verify_fingerprint(&self, attrs: &StunAttributes<'_>) -> bool {
        let Some(fingerprint) = attrs.fingerprint() else {
            trace!("no fingerprint attribute");
            return false;
        };
        Fingerprint::verify(&self.fingerprint_view(fingerprint), fingerprint.value())
    }

    /// Check the MESSAGE-INTEGRITY attribute found while parsing `attrs` using `key`.
    ///
    /// Returns `false` when there is no MESSAGE-INTEGRITY attribute.
    #[tracing::instrument(
        name = "message_verify_integrity",
        level = "trace",
        skip(self, attrs, key),
        fields(
            msg.transaction = %self.transaction_id(),
        )
    )]
    pub fn verify_integrity(&self, attrs: &StunAttributes<'_>, key: &[u8]) -> bool {
        let Some(integrity) = attrs.message_integrity() else {
            trace!("no message integrity attribute");
            return false;
        };
        MessageIntegrity::verify(&self.integrity_view(integrity), key, integrity.hmac())
    }
}

/// Iterator over the attributes of a [`Message`]
#[derive(Debug, Clone)]
pub struct MessageAttributesIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for MessageAttributesIter<'a> {
    type Item = (usize, RawAttribute<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        let raw = match RawAttribute::from_bytes(&self.data[self.offset..]) {
            Ok(raw) => raw,
            Err(e) => {
                trace!("failed to parse attribute at offset {}: {e}", self.offset);
                self.offset = self.data.len();
                return None;
            }
        };
        let offset = self.offset;
        self.offset += raw.padded_len();
        Some((offset, raw))
    }
}

impl<'a> TryFrom<&'a [u8]> for Message<'a> {
    type Error = StunParseError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        Message::from_bytes(value)
    }
}
