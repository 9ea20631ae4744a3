// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN wire format
//!
//! Parsing, validation and construction of STUN Binding messages as used for ICE connectivity
//! checks.  Nothing in this crate allocates on the heap while handling a message: parsed
//! attributes borrow from the received datagram and outgoing messages are assembled from a
//! fixed number of stack segments.
//!
//! - [`message`]: the 20 byte header, message classes and methods and inbound [`Message`](message::Message)s.
//! - [`attribute`]: TLV attributes and the [`StunAttributes`](attribute::StunAttributes) parser.
//! - [`canonical`]: the exact byte sequence that fingerprints and integrity values cover.
//! - [`builder`]: assembling outgoing messages.

pub mod attribute;
pub mod builder;
pub mod canonical;
pub mod message;

pub mod prelude {
    pub use crate::attribute::{Attribute, AttributeStaticType, AttributeWrite};
}
