// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Binding responses
//!
//! Responses are written into a fixed size buffer.  A success response carries
//! XOR-MAPPED-ADDRESS, MESSAGE-INTEGRITY and FINGERPRINT.  Error responses carry ERROR-CODE,
//! UNKNOWN-ATTRIBUTES for 420, and FINGERPRINT.

use std::net::SocketAddr;

use stun_wire::attribute::{ErrorCode, UnknownAttributes, XorMappedAddress};
use stun_wire::builder::MessageBuilder;
use stun_wire::message::{MessageClass, MessageType, StunWriteError, TransactionId, BINDING};

use tracing::trace;

/// The largest response that can be produced.
///
/// The largest is a 420 error with a full UNKNOWN-ATTRIBUTES list at 92 bytes.
pub const MAX_RESPONSE_SIZE: usize = 128;

/// The kind of response sent to a Binding request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// The request was authenticated.
    Success,
    /// 400 Bad request.  A required attribute was missing.
    BadRequest,
    /// 401 Unauthorized.  The request failed authentication.
    Unauthorized,
    /// 420 Unknown attribute.  The request contained comprehension-required attributes that are
    /// not understood.
    UnknownAttribute,
}

impl ResponseKind {
    /// The value of the ERROR-CODE attribute for this kind of response
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_responder::response::ResponseKind;
    /// assert_eq!(ResponseKind::Unauthorized.error_code(), Some(401));
    /// assert_eq!(ResponseKind::Success.error_code(), None);
    /// ```
    pub fn error_code(self) -> Option<u16> {
        match self {
            Self::Success => None,
            Self::BadRequest => Some(ErrorCode::BAD_REQUEST),
            Self::Unauthorized => Some(ErrorCode::UNAUTHORIZED),
            Self::UnknownAttribute => Some(ErrorCode::UNKNOWN_ATTRIBUTE),
        }
    }

    /// The reason phrase of the ERROR-CODE attribute for this kind of response
    pub fn reason(self) -> Option<&'static str> {
        match self {
            Self::Success => None,
            Self::BadRequest => Some("Bad request"),
            Self::Unauthorized => Some("Unauthorized"),
            Self::UnknownAttribute => Some("Unknown attribute"),
        }
    }

    fn class(self) -> MessageClass {
        match self {
            Self::Success => MessageClass::Success,
            _ => MessageClass::Error,
        }
    }
}

/// A response ready to be sent
#[derive(Clone)]
pub struct StunResponse {
    buf: [u8; MAX_RESPONSE_SIZE],
    len: usize,
    kind: ResponseKind,
    transaction: TransactionId,
}

impl std::fmt::Debug for StunResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StunResponse")
            .field("kind", &self.kind)
            .field("transaction", &format_args!("{}", self.transaction))
            .field("len", &self.len)
            .finish()
    }
}

impl std::fmt::Display for StunResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind.error_code() {
            Some(code) => write!(
                f,
                "StunResponse(error {code}, transaction: {}, len: {})",
                self.transaction, self.len
            ),
            None => write!(
                f,
                "StunResponse(success, transaction: {}, len: {})",
                self.transaction, self.len
            ),
        }
    }
}

impl AsRef<[u8]> for StunResponse {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl StunResponse {
    fn from_builder(builder: &MessageBuilder<'_>, kind: ResponseKind) -> Result<Self, StunWriteError> {
        let mut buf = [0; MAX_RESPONSE_SIZE];
        let len = builder.write_into(&mut buf)?;
        Ok(Self {
            buf,
            len,
            kind,
            transaction: builder.transaction_id(),
        })
    }

    /// The kind of this response
    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// The transaction of the request this response answers
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction
    }

    /// The encoded response
    pub fn as_bytes(&self) -> &[u8] {
        self.as_ref()
    }
}

/// Build a Binding success response reporting `from` as the mapped address.
///
/// MESSAGE-INTEGRITY is keyed with `pwd`, the local ICE password.
///
/// # Examples
///
/// ```
/// # use stun_responder::response::*;
/// # use stun_responder::wire::message::*;
/// let transaction = TransactionId::generate();
/// let from = "192.168.1.10:5000".parse().unwrap();
/// let response = binding_success(transaction, from, b"password").unwrap();
/// assert_eq!(response.kind(), ResponseKind::Success);
/// let msg = Message::from_bytes(response.as_bytes()).unwrap();
/// assert_eq!(msg.class(), MessageClass::Success);
/// assert_eq!(msg.transaction_id(), transaction);
/// ```
#[tracing::instrument(
    name = "binding_success",
    level = "trace",
    err,
    skip(pwd),
    fields(
        msg.transaction = %transaction,
    )
)]
pub fn binding_success(
    transaction: TransactionId,
    from: SocketAddr,
    pwd: &[u8],
) -> Result<StunResponse, StunWriteError> {
    let kind = ResponseKind::Success;
    let mtype = MessageType::from_class_method(kind.class(), BINDING);
    let mut builder = MessageBuilder::new(mtype, transaction);
    builder.add_attribute(&XorMappedAddress::new(from, transaction))?;
    builder.add_message_integrity(pwd)?;
    builder.add_fingerprint()?;
    let response = StunResponse::from_builder(&builder, kind)?;
    trace!("built {response}");
    Ok(response)
}

/// Build a Binding error response of `kind`.
///
/// `unknown` is only added to 420 responses.
///
/// # Errors
///
/// - When `kind` is [`ResponseKind::Success`].
///
/// # Examples
///
/// ```
/// # use stun_responder::response::*;
/// # use stun_responder::wire::message::*;
/// let transaction = TransactionId::generate();
/// let response = binding_error(transaction, ResponseKind::BadRequest, None).unwrap();
/// assert_eq!(response.kind(), ResponseKind::BadRequest);
/// let msg = Message::from_bytes(response.as_bytes()).unwrap();
/// assert_eq!(msg.class(), MessageClass::Error);
/// assert!(binding_error(transaction, ResponseKind::Success, None).is_err());
/// ```
#[tracing::instrument(
    name = "binding_error",
    level = "trace",
    err,
    skip(unknown),
    fields(
        msg.transaction = %transaction,
    )
)]
pub fn binding_error(
    transaction: TransactionId,
    kind: ResponseKind,
    unknown: Option<&UnknownAttributes>,
) -> Result<StunResponse, StunWriteError> {
    let (Some(code), Some(reason)) = (kind.error_code(), kind.reason()) else {
        return Err(StunWriteError::OutOfRange {
            value: 200,
            min: 300,
            max: 699,
        });
    };
    let mtype = MessageType::from_class_method(kind.class(), BINDING);
    let mut builder = MessageBuilder::new(mtype, transaction);
    builder.add_attribute(&ErrorCode::new(code, reason)?)?;
    if kind == ResponseKind::UnknownAttribute {
        if let Some(unknown) = unknown.filter(|unknown| !unknown.is_empty()) {
            builder.add_attribute(unknown)?;
        }
    }
    builder.add_fingerprint()?;
    let response = StunResponse::from_builder(&builder, kind)?;
    trace!("built {response}");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use stun_wire::attribute::{
        AttributeType, Fingerprint, MessageIntegrity, UNKNOWN_ATTRIBUTES_CAPACITY,
    };
    use stun_wire::message::Message;
    use stun_wire::prelude::*;

    #[test]
    fn success_ipv4() {
        let _log = crate::tests::test_init_log();
        let transaction = ICE_REQUEST_TRANSACTION.into();
        let from: SocketAddr = "192.168.0.1:3178".parse().unwrap();
        let response = binding_success(transaction, from, PASSWORD.as_bytes()).unwrap();
        let data = response.as_bytes();
        assert_eq!(data.len(), 20 + 12 + 24 + 8);

        let msg = Message::from_bytes(data).unwrap();
        assert_eq!(msg.class(), MessageClass::Success);
        assert!(msg.has_method(BINDING));
        assert_eq!(msg.transaction_id(), transaction);
        assert!(msg.header().has_magic_cookie());

        let types = response_attributes(data)
            .into_iter()
            .map(|(offset, raw)| (offset, raw.get_type()))
            .collect::<Vec<_>>();
        assert_eq!(
            types,
            vec![
                (20, XorMappedAddress::TYPE),
                (32, MessageIntegrity::TYPE),
                (56, Fingerprint::TYPE)
            ]
        );
        let raw = response_attribute(data, XorMappedAddress::TYPE).unwrap();
        assert_eq!(raw.value, &[0, 1, 0x2d, 0x78, 0xe1, 0xba, 0xa4, 0x43]);
        let xor_addr = XorMappedAddress::try_from(&raw).unwrap();
        assert_eq!(xor_addr.addr(transaction), from);

        assert!(verify_response_integrity(data, PASSWORD.as_bytes()));
        assert!(!verify_response_integrity(data, b"other"));
        assert!(verify_response_fingerprint(data));
    }

    #[test]
    fn success_ipv6() {
        let _log = crate::tests::test_init_log();
        let transaction = TransactionId::generate();
        let from: SocketAddr = "[fd12:3456:789a:1::1]:40000".parse().unwrap();
        let response = binding_success(transaction, from, b"pwd").unwrap();
        let data = response.as_bytes();
        assert_eq!(data.len(), 20 + 24 + 24 + 8);
        let raw = response_attribute(data, XorMappedAddress::TYPE).unwrap();
        assert_eq!(raw.value[1], 0x02);
        let xor_addr = XorMappedAddress::try_from(&raw).unwrap();
        assert_eq!(xor_addr.addr(transaction), from);
        assert!(verify_response_integrity(data, b"pwd"));
        assert!(verify_response_fingerprint(data));
    }

    #[test]
    fn success_v4_mapped() {
        let _log = crate::tests::test_init_log();
        let transaction = TransactionId::generate();
        let from: SocketAddr = "[::ffff:10.0.0.1]:5000".parse().unwrap();
        let response = binding_success(transaction, from, b"pwd").unwrap();
        let raw = response_attribute(response.as_bytes(), XorMappedAddress::TYPE).unwrap();
        assert_eq!(raw.length(), 8);
        let xor_addr = XorMappedAddress::try_from(&raw).unwrap();
        assert_eq!(
            xor_addr.addr(transaction),
            "10.0.0.1:5000".parse::<SocketAddr>().unwrap()
        );
    }

    fn check_error(response: &StunResponse, code: u16, reason: &str) {
        let data = response.as_bytes();
        let msg = Message::from_bytes(data).unwrap();
        assert_eq!(msg.class(), MessageClass::Error);
        assert!(msg.has_method(BINDING));
        assert_eq!(msg.transaction_id(), response.transaction_id());
        let raw = response_attribute(data, ErrorCode::TYPE).unwrap();
        let error = ErrorCode::try_from(&raw).unwrap();
        assert_eq!(error.code(), code);
        assert_eq!(error.reason(), reason);
        assert!(response_attribute(data, MessageIntegrity::TYPE).is_none());
        assert!(verify_response_fingerprint(data));
    }

    #[test]
    fn bad_request() {
        let _log = crate::tests::test_init_log();
        let response =
            binding_error(TransactionId::generate(), ResponseKind::BadRequest, None).unwrap();
        check_error(&response, 400, "Bad request");
        // 4 bytes of code + 11 bytes of reason padded to 16
        assert_eq!(response.as_bytes().len(), 20 + 4 + 16 + 8);
    }

    #[test]
    fn unauthorized() {
        let _log = crate::tests::test_init_log();
        let response =
            binding_error(TransactionId::generate(), ResponseKind::Unauthorized, None).unwrap();
        check_error(&response, 401, "Unauthorized");
        assert_eq!(response.kind(), ResponseKind::Unauthorized);
    }

    #[test]
    fn unknown_attribute() {
        let _log = crate::tests::test_init_log();
        let mut unknown = UnknownAttributes::default();
        for atype in [0x0003u16, 0x7f00, 0x0003] {
            unknown.try_push(atype.into()).unwrap();
        }
        let response = binding_error(
            TransactionId::generate(),
            ResponseKind::UnknownAttribute,
            Some(&unknown),
        )
        .unwrap();
        check_error(&response, 420, "Unknown attribute");
        let raw =
            response_attribute(response.as_bytes(), UnknownAttributes::TYPE).unwrap();
        assert_eq!(raw.value, &[0x00, 0x03, 0x7f, 0x00, 0x00, 0x03]);
        // padding
        let attrs = response_attributes(response.as_bytes());
        assert_eq!(attrs[2].0 - attrs[1].0, 4 + 8);
    }

    #[test]
    fn unknown_attribute_full() {
        let _log = crate::tests::test_init_log();
        let mut unknown = UnknownAttributes::default();
        for i in 0..UNKNOWN_ATTRIBUTES_CAPACITY as u16 {
            unknown.try_push(AttributeType::new(0x0100 + i)).unwrap();
        }
        let response = binding_error(
            TransactionId::generate(),
            ResponseKind::UnknownAttribute,
            Some(&unknown),
        )
        .unwrap();
        assert_eq!(response.as_bytes().len(), 92);
        let raw =
            response_attribute(response.as_bytes(), UnknownAttributes::TYPE).unwrap();
        let parsed = UnknownAttributes::try_from(&raw).unwrap();
        assert_eq!(parsed.as_slice(), unknown.as_slice());
    }

    #[test]
    fn unknown_only_for_420() {
        let _log = crate::tests::test_init_log();
        let mut unknown = UnknownAttributes::default();
        unknown.try_push(AttributeType::new(0x0003)).unwrap();
        let response = binding_error(
            TransactionId::generate(),
            ResponseKind::BadRequest,
            Some(&unknown),
        )
        .unwrap();
        assert!(response_attribute(response.as_bytes(), UnknownAttributes::TYPE).is_none());
    }

    #[test]
    fn success_is_not_an_error() {
        let _log = crate::tests::test_init_log();
        assert!(matches!(
            binding_error(TransactionId::generate(), ResponseKind::Success, None),
            Err(StunWriteError::OutOfRange { .. })
        ));
    }
}
