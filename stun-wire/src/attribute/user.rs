// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;

use crate::message::StunParseError;

use super::{Attribute, AttributeStaticType, AttributeType, AttributeWrite, RawAttribute};

/// The username [`Attribute`]
///
/// ICE usernames are opaque bytes of the form `local:remote`, no character set is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Username<'a> {
    user: &'a [u8],
}

impl AttributeStaticType for Username<'_> {
    const TYPE: AttributeType = AttributeType(0x0006);
}

impl Attribute for Username<'_> {
    fn get_type(&self) -> AttributeType {
        Self::TYPE
    }

    fn length(&self) -> u16 {
        self.user.len() as u16
    }
}

impl<'a> AttributeWrite<'a> for Username<'a> {
    fn write_inline(&self, _dest: &mut [u8]) -> usize {
        0
    }

    fn payload(&self) -> &'a [u8] {
        self.user
    }
}

impl<'a> TryFrom<&RawAttribute<'a>> for Username<'a> {
    type Error = StunParseError;

    fn try_from(raw: &RawAttribute<'a>) -> Result<Self, Self::Error> {
        raw.check_type_and_len(Self::TYPE, ..)?;
        Ok(Self { user: raw.value })
    }
}

impl<'a> Username<'a> {
    /// Create a new [`Username`] [`Attribute`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// let user = Username::new(b"user:remote");
    /// assert_eq!(user.username(), b"user:remote");
    /// assert_eq!(user.split(), Some((&b"user"[..], &b"remote"[..])));
    /// ```
    pub fn new(user: &'a [u8]) -> Self {
        Self { user }
    }

    /// The username value
    pub fn username(&self) -> &'a [u8] {
        self.user
    }

    /// Split the username into its local and remote halves.  See [`split_username`].
    pub fn split(&self) -> Option<(&'a [u8], &'a [u8])> {
        split_username(self.user)
    }
}

impl std::fmt::Display for Username<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: '{}'", Self::TYPE, String::from_utf8_lossy(self.user))
    }
}

/// Split an ICE username of the form `local:remote` on the first ':'.
///
/// Returns `None` when there is no ':' or when either half is empty.
///
/// # Examples
///
/// ```
/// # use stun_wire::attribute::split_username;
/// assert_eq!(split_username(b"a:b:c"), Some((&b"a"[..], &b"b:c"[..])));
/// assert_eq!(split_username(b"ab"), None);
/// assert_eq!(split_username(b":b"), None);
/// assert_eq!(split_username(b"a:"), None);
/// ```
pub fn split_username(user: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = user.iter().position(|&b| b == b':')?;
    let (local, remote) = (&user[..colon], &user[colon + 1..]);
    if local.is_empty() || remote.is_empty() {
        return None;
    }
    Some((local, remote))
}
