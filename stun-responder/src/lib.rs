// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # stun-responder
//!
//! Answers ICE connectivity checks (STUN Binding requests) received on a media socket.
//!
//! A [`StunResponder`](responder::StunResponder) validates one datagram at a time against the
//! ICE credentials of the session it arrived for and either drops it or produces a single
//! response to send back.  Nothing is kept between datagrams.

pub mod auth;
pub mod credentials;
pub mod recording;
pub mod responder;
pub mod response;
pub mod socket;

// reexport stun_wire
pub use stun_wire as wire;

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    use stun_wire::attribute::{
        AttributeType, Fingerprint, MessageIntegrity, RawAttribute, Username,
    };
    use stun_wire::builder::MessageBuilder;
    use stun_wire::canonical::CanonicalView;
    use stun_wire::message::{
        Message, MessageClass, MessageType, Method, TransactionId, BINDING,
    };
    use stun_wire::prelude::*;

    use crate::credentials::IceCredentials;

    static TRACING: Once = Once::new();

    pub fn test_init_log() {
        TRACING.call_once(|| {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                tracing_subscriber::fmt().with_env_filter(filter).init();
            }
        });
    }

    pub const UFRAG: &str = "p9KA";
    pub const PASSWORD: &str = "xJcE9AQAR7kczUDVOXRUCl";

    /// A Binding request as sent by a browser ICE agent, USERNAME "p9KA:SQAt" and keyed with
    /// [`PASSWORD`].
    pub static ICE_REQUEST: [u8; 100] = [
        0x00, 0x01, 0x00, 0x50, 0x21, 0x12, 0xa4, 0x42, 0x6a, 0x75, 0x63, 0x31, 0x35, 0x75, 0x78,
        0x55, 0x6e, 0x67, 0x47, 0x63, 0x00, 0x06, 0x00, 0x09, 0x70, 0x39, 0x4b, 0x41, 0x3a, 0x53,
        0x51, 0x41, 0x74, 0x00, 0x00, 0x00, 0xc0, 0x57, 0x00, 0x04, 0x00, 0x01, 0x00, 0x0a, 0x80,
        0x2a, 0x00, 0x08, 0x6e, 0xee, 0xc6, 0xe9, 0x7d, 0x18, 0x39, 0x5c, 0x00, 0x25, 0x00, 0x00,
        0x00, 0x24, 0x00, 0x04, 0x6e, 0x7f, 0x1e, 0xff, 0x00, 0x08, 0x00, 0x14, 0x5d, 0x04, 0x25,
        0xa0, 0x20, 0x7a, 0xb1, 0xe0, 0x54, 0x10, 0x22, 0x99, 0xaa, 0xf9, 0x83, 0x9c, 0xa0, 0x76,
        0xc6, 0xd5, 0x80, 0x28, 0x00, 0x04, 0x36, 0x0e, 0x21, 0x9f,
    ];

    pub const ICE_REQUEST_TRANSACTION: u128 = 0x6a75_6331_3575_7855_6e67_4763;

    pub fn credentials() -> IceCredentials {
        IceCredentials::new(UFRAG, PASSWORD)
    }

    /// Builds requests with a valid USERNAME, MESSAGE-INTEGRITY and FINGERPRINT unless told
    /// otherwise.
    #[derive(Debug)]
    pub struct RequestBuilder {
        transaction: TransactionId,
        class: MessageClass,
        method: Method,
        username: Option<Vec<u8>>,
        extra: Vec<(u16, Vec<u8>)>,
        integrity: Option<Vec<u8>>,
        fingerprint: bool,
    }

    impl RequestBuilder {
        pub fn new() -> Self {
            Self {
                transaction: TransactionId::generate(),
                class: MessageClass::Request,
                method: BINDING,
                username: Some(b"p9KA:SQAt".to_vec()),
                extra: vec![],
                integrity: Some(PASSWORD.as_bytes().to_vec()),
                fingerprint: true,
            }
        }

        pub fn transaction(mut self, transaction: TransactionId) -> Self {
            self.transaction = transaction;
            self
        }

        pub fn class(mut self, class: MessageClass) -> Self {
            self.class = class;
            self
        }

        pub fn method(mut self, method: Method) -> Self {
            self.method = method;
            self
        }

        pub fn username(mut self, username: &[u8]) -> Self {
            self.username = Some(username.to_vec());
            self
        }

        pub fn no_username(mut self) -> Self {
            self.username = None;
            self
        }

        pub fn attribute(mut self, atype: u16, value: &[u8]) -> Self {
            self.extra.push((atype, value.to_vec()));
            self
        }

        pub fn integrity(mut self, key: Option<&[u8]>) -> Self {
            self.integrity = key.map(|key| key.to_vec());
            self
        }

        pub fn fingerprint(mut self, fingerprint: bool) -> Self {
            self.fingerprint = fingerprint;
            self
        }

        pub fn build(&self) -> Vec<u8> {
            let mtype = MessageType::from_class_method(self.class, self.method);
            let mut builder = MessageBuilder::new(mtype, self.transaction);
            if let Some(username) = &self.username {
                builder.add_attribute(&Username::new(username)).unwrap();
            }
            for (atype, value) in &self.extra {
                builder
                    .add_attribute(&RawAttribute::new(AttributeType::new(*atype), value))
                    .unwrap();
            }
            if let Some(key) = &self.integrity {
                builder.add_message_integrity(key).unwrap();
            }
            if self.fingerprint {
                builder.add_fingerprint().unwrap();
            }
            builder.build()
        }
    }

    /// Encode a Binding request by hand from a list of attributes, without any of the checks
    /// performed by [`MessageBuilder`].
    pub fn raw_request(transaction: TransactionId, attributes: &[(u16, &[u8])]) -> Vec<u8> {
        let mtype = MessageType::from_class_method(MessageClass::Request, BINDING);
        let mut data = vec![];
        data.extend_from_slice(&mtype.value().to_be_bytes());
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&0x2112_a442u32.to_be_bytes());
        data.extend_from_slice(&transaction.to_bytes());
        for (atype, value) in attributes {
            data.extend_from_slice(&atype.to_be_bytes());
            data.extend_from_slice(&(value.len() as u16).to_be_bytes());
            data.extend_from_slice(value);
            while data.len() % 4 != 0 {
                data.push(0);
            }
        }
        let length = (data.len() - 20) as u16;
        data[2..4].copy_from_slice(&length.to_be_bytes());
        data
    }

    /// The attributes of an outgoing message in order, together with their absolute offsets.
    pub fn response_attributes(data: &[u8]) -> Vec<(usize, RawAttribute<'_>)> {
        let msg = Message::from_bytes(data).unwrap();
        assert_eq!(msg.as_bytes().len(), data.len());
        msg.iter_attributes()
            .map(|(offset, raw)| (offset + 20, raw))
            .collect()
    }

    pub fn response_attribute(data: &[u8], atype: AttributeType) -> Option<RawAttribute<'_>> {
        response_attributes(data)
            .into_iter()
            .find(|(_offset, raw)| raw.get_type() == atype)
            .map(|(_offset, raw)| raw)
    }

    fn view_before(data: &[u8], offset: usize, padded_len: usize) -> CanonicalView<'_> {
        let mut header = [0; 20];
        header.copy_from_slice(&data[..20]);
        CanonicalView::new(&header, (offset - 20 + padded_len) as u16, [&data[20..offset]])
    }

    /// Independently recompute the FINGERPRINT of an outgoing message.  It must be the last
    /// attribute.
    pub fn verify_response_fingerprint(data: &[u8]) -> bool {
        let attrs = response_attributes(data);
        let Some((offset, raw)) = attrs.last() else {
            return false;
        };
        let Ok(fingerprint) = Fingerprint::try_from(raw) else {
            return false;
        };
        offset + Fingerprint::PADDED_LEN == data.len()
            && Fingerprint::verify(
                &view_before(data, *offset, Fingerprint::PADDED_LEN),
                fingerprint.fingerprint(),
            )
    }

    /// Independently recompute the MESSAGE-INTEGRITY of an outgoing message.
    pub fn verify_response_integrity(data: &[u8], key: &[u8]) -> bool {
        response_attributes(data)
            .into_iter()
            .find(|(_offset, raw)| raw.get_type() == MessageIntegrity::TYPE)
            .and_then(|(offset, raw)| {
                let integrity = MessageIntegrity::try_from(&raw).ok()?;
                Some(MessageIntegrity::verify(
                    &view_before(data, offset, MessageIntegrity::PADDED_LEN),
                    key,
                    integrity.hmac(),
                ))
            })
            .unwrap_or(false)
    }
}
