// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN responder
//!
//! Answers ICE connectivity checks following the short-term credential procedures of [RFC5389]
//! and [RFC8445].  The responder is implemented with the sans-IO pattern: it operates on a single
//! received datagram and returns what should be sent back, if anything.
//!
//! Every datagram goes through the same checks, in order:
//!
//! 1. The header must be complete and the declared length must fit in the datagram.
//! 2. Only Binding requests are handled.  Indications and responses are dropped.
//! 3. Optionally, the magic cookie must be present.
//! 4. Attributes are parsed.  Unknown comprehension-required attributes are answered with 420,
//!    malformed attributes are dropped.
//! 5. USERNAME, MESSAGE-INTEGRITY and FINGERPRINT must be present or 400 is returned.
//! 6. A FINGERPRINT mismatch is dropped.
//! 7. Authentication failures are answered with 401.
//! 8. Otherwise a success response is returned.
//!
//! [RFC5389]: https://tools.ietf.org/html/rfc5389
//! [RFC8445]: https://tools.ietf.org/html/rfc8445

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use stun_wire::attribute::{AttributesError, UnknownAttributes};
use stun_wire::message::{Message, MessageClass, StunParseError, TransactionId, BINDING};

use tracing::{debug, trace, warn};

use crate::auth::check_auth;
use crate::credentials::PeerCredentials;
use crate::response::{binding_error, binding_success, ResponseKind, StunResponse};
use crate::socket::DatagramSocket;

static STUN_RESPONDER_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Answers STUN Binding requests
///
/// A [`StunResponder`] holds no per-datagram state and can be shared between threads receiving
/// on different sockets.
///
/// # Examples
///
/// ```
/// # use stun_responder::credentials::IceCredentials;
/// # use stun_responder::responder::{HandleStunReply, DropReason, StunResponder};
/// let responder = StunResponder::builder().build();
/// let credentials = IceCredentials::new("ufrag", "password");
/// let from = "192.168.0.2:5000".parse().unwrap();
/// // RTP is not STUN
/// let rtp = [0x80, 0x60, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
/// assert!(matches!(
///     responder.handle_stun(&rtp, from, &credentials),
///     HandleStunReply::Drop(DropReason::NotStun)
/// ));
/// ```
#[derive(Debug)]
pub struct StunResponder {
    id: usize,
    validate_magic_cookie: bool,
}

/// Builder struct for a [`StunResponder`]
#[derive(Debug, Default)]
pub struct StunResponderBuilder {
    validate_magic_cookie: bool,
}

impl StunResponderBuilder {
    /// Drop requests that do not carry the magic cookie.
    ///
    /// Off by default, requests from RFC 3489 clients are answered.
    pub fn validate_magic_cookie(mut self, validate: bool) -> Self {
        self.validate_magic_cookie = validate;
        self
    }

    /// Build the [`StunResponder`]
    pub fn build(self) -> StunResponder {
        let id = STUN_RESPONDER_COUNT.fetch_add(1, Ordering::SeqCst);
        StunResponder {
            id,
            validate_magic_cookie: self.validate_magic_cookie,
        }
    }
}

/// Reasons a datagram is dropped without a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DropReason {
    /// The datagram is not a STUN message.
    NotStun,
    /// The datagram is shorter than the STUN header or the length in the header.
    Truncated,
    /// The magic cookie is missing and magic cookie validation is enabled.
    BadMagicCookie,
    /// The method is not Binding.
    UnsupportedMethod,
    /// Indications are never answered.
    Indication,
    /// A Binding success or error response was received.
    UnexpectedClass,
    /// The attributes could not be parsed.
    Malformed,
    /// The FINGERPRINT does not match the message.
    FingerprintMismatch,
    /// A response could not be constructed.
    ResponseFailed,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStun => "not a STUN message",
            Self::Truncated => "truncated message",
            Self::BadMagicCookie => "missing magic cookie",
            Self::UnsupportedMethod => "unsupported method",
            Self::Indication => "indication",
            Self::UnexpectedClass => "unexpected message class",
            Self::Malformed => "malformed attributes",
            Self::FingerprintMismatch => "fingerprint mismatch",
            Self::ResponseFailed => "failed to construct a response",
        };
        f.write_str(s)
    }
}

/// The final result of handling one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StunOutcome {
    /// Nothing was sent.
    Dropped,
    /// A 400 error response.
    BadRequest,
    /// A 401 error response.
    Unauthorized,
    /// A 420 error response.
    UnknownAttribute,
    /// A success response.
    Success,
}

impl From<ResponseKind> for StunOutcome {
    fn from(kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Success => Self::Success,
            ResponseKind::BadRequest => Self::BadRequest,
            ResponseKind::Unauthorized => Self::Unauthorized,
            ResponseKind::UnknownAttribute => Self::UnknownAttribute,
        }
    }
}

/// A piece of data that needs to be sent to a peer
#[derive(Debug, Clone)]
pub struct Transmit<T: AsRef<[u8]>> {
    /// The data blob
    pub data: T,
    /// The destination address of the transmission
    pub to: SocketAddr,
}

impl<T: AsRef<[u8]>> std::fmt::Display for Transmit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Transmit(-> {}) of {} bytes",
            self.to,
            self.data.as_ref().len()
        )
    }
}

impl<T: AsRef<[u8]>> Transmit<T> {
    /// Construct a new [`Transmit`] with the specifid data and destination.
    pub fn new(data: T, to: SocketAddr) -> Self {
        Self { data, to }
    }

    /// Reinterpret the data of a [`Transmit`] into a different type.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_responder::responder::Transmit;
    /// let remote_addr = "10.0.0.2:2000".parse().unwrap();
    /// let transmit = Transmit::new([42; 8], remote_addr);
    /// let transmit = transmit.reinterpret_data(|data| data.to_vec());
    /// assert_eq!(transmit.to, remote_addr);
    /// assert_eq!(transmit.data, vec![42; 8]);
    /// ```
    pub fn reinterpret_data<O: AsRef<[u8]>, F: FnOnce(T) -> O>(self, f: F) -> Transmit<O> {
        Transmit {
            data: f(self.data),
            to: self.to,
        }
    }
}

/// Return value when handling possible STUN data
#[derive(Debug)]
pub enum HandleStunReply {
    /// Drop the datagram.  Nothing is sent.
    Drop(DropReason),
    /// Send the response back to the peer.
    Respond(Transmit<StunResponse>),
}

impl HandleStunReply {
    /// The [`StunOutcome`] of this reply
    pub fn outcome(&self) -> StunOutcome {
        match self {
            Self::Drop(_) => StunOutcome::Dropped,
            Self::Respond(transmit) => transmit.data.kind().into(),
        }
    }
}

/// Errors returned by [`StunResponder::process`]
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StunError {
    /// Sending the response failed.
    #[error("Failed to send: {}", .0)]
    IoError(#[from] std::io::Error),
}

impl StunResponder {
    /// Create a new [`StunResponderBuilder`]
    pub fn builder() -> StunResponderBuilder {
        StunResponderBuilder::default()
    }

    /// A process-unique identifier of this [`StunResponder`]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether requests without the magic cookie are dropped
    pub fn validates_magic_cookie(&self) -> bool {
        self.validate_magic_cookie
    }

    /// Handle a datagram received from `from` that may contain a STUN message.
    ///
    /// `credentials` are the local ICE credentials of the session the datagram was received for.
    /// The returned value indicates what the caller must do.  At most one datagram is ever
    /// produced and always to `from`.
    #[tracing::instrument(
        name = "stun_responder_handle",
        level = "debug",
        skip(self, data, credentials),
        fields(
            stun.id = self.id,
            data.len = data.len(),
        )
    )]
    pub fn handle_stun(
        &self,
        data: &[u8],
        from: SocketAddr,
        credentials: &impl PeerCredentials,
    ) -> HandleStunReply {
        let msg = match Message::from_bytes(data) {
            Ok(msg) => msg,
            Err(StunParseError::NotStun) => {
                trace!("not a STUN message");
                return HandleStunReply::Drop(DropReason::NotStun);
            }
            Err(e) => {
                debug!("dropping truncated message: {e}");
                return HandleStunReply::Drop(DropReason::Truncated);
            }
        };
        trace!("received {msg}");

        if !msg.has_method(BINDING) {
            debug!("unsupported method {}", msg.method());
            return HandleStunReply::Drop(DropReason::UnsupportedMethod);
        }
        match msg.class() {
            MessageClass::Request => (),
            MessageClass::Indication => {
                trace!("ignoring indication");
                return HandleStunReply::Drop(DropReason::Indication);
            }
            class => {
                debug!("unexpected class {class:?}");
                return HandleStunReply::Drop(DropReason::UnexpectedClass);
            }
        }
        if self.validate_magic_cookie && !msg.header().has_magic_cookie() {
            debug!("missing magic cookie {:#x}", msg.header().cookie());
            return HandleStunReply::Drop(DropReason::BadMagicCookie);
        }

        let transaction = msg.transaction_id();
        let attrs = match msg.parse_attributes() {
            Ok(attrs) => attrs,
            Err(AttributesError::Unknown(unknown)) => {
                debug!("unknown comprehension-required attributes {unknown}");
                return self.error_reply(
                    transaction,
                    ResponseKind::UnknownAttribute,
                    Some(&unknown),
                    from,
                );
            }
            Err(AttributesError::Malformed(e)) => {
                debug!("dropping malformed message: {e}");
                return HandleStunReply::Drop(DropReason::Malformed);
            }
        };

        if attrs.username().is_none()
            || attrs.message_integrity().is_none()
            || attrs.fingerprint().is_none()
        {
            debug!(
                "missing required attributes, username: {}, message integrity: {}, fingerprint: {}",
                attrs.username().is_some(),
                attrs.message_integrity().is_some(),
                attrs.fingerprint().is_some()
            );
            return self.error_reply(transaction, ResponseKind::BadRequest, None, from);
        }

        if !msg.verify_fingerprint(&attrs) {
            debug!("dropping message with mismatched fingerprint");
            return HandleStunReply::Drop(DropReason::FingerprintMismatch);
        }

        if let Err(e) = check_auth(&msg, &attrs, credentials) {
            debug!("authentication failed: {e}");
            return self.error_reply(transaction, ResponseKind::Unauthorized, None, from);
        }

        match binding_success(transaction, from, credentials.ice_pwd()) {
            Ok(response) => {
                debug!("responding with {response} to {from}");
                HandleStunReply::Respond(Transmit::new(response, from))
            }
            Err(e) => {
                warn!("failed to build success response: {e}");
                HandleStunReply::Drop(DropReason::ResponseFailed)
            }
        }
    }

    fn error_reply(
        &self,
        transaction: TransactionId,
        kind: ResponseKind,
        unknown: Option<&UnknownAttributes>,
        from: SocketAddr,
    ) -> HandleStunReply {
        match binding_error(transaction, kind, unknown) {
            Ok(response) => {
                debug!("responding with {response} to {from}");
                HandleStunReply::Respond(Transmit::new(response, from))
            }
            Err(e) => {
                warn!("failed to build error response: {e}");
                HandleStunReply::Drop(DropReason::ResponseFailed)
            }
        }
    }

    /// Handle a datagram and send any response through `socket`.
    ///
    /// # Errors
    ///
    /// - When sending the response fails.
    pub fn process(
        &self,
        socket: &impl DatagramSocket,
        data: &[u8],
        from: SocketAddr,
        credentials: &impl PeerCredentials,
    ) -> Result<StunOutcome, StunError> {
        let reply = self.handle_stun(data, from, credentials);
        let outcome = reply.outcome();
        if let HandleStunReply::Respond(transmit) = reply {
            trace!("sending {transmit}");
            socket.send_to(transmit.data.as_ref(), transmit.to)?;
        }
        Ok(outcome)
    }
}
