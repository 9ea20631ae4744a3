// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! ICE short-term credentials of a session
//!
//! The session owning the credentials resolves them before a datagram is handed to the
//! [`StunResponder`](crate::responder::StunResponder).  They are only ever read while a request is
//! being processed.

/// Read access to the local ICE credentials of a peer or session.
pub trait PeerCredentials {
    /// The local ICE username fragment.  Compared against the first half of a USERNAME.
    fn ice_ufrag(&self) -> &[u8];
    /// The local ICE password.  Keys MESSAGE-INTEGRITY in both directions.
    fn ice_pwd(&self) -> &[u8];
}

impl<T: PeerCredentials + ?Sized> PeerCredentials for &T {
    fn ice_ufrag(&self) -> &[u8] {
        (**self).ice_ufrag()
    }

    fn ice_pwd(&self) -> &[u8] {
        (**self).ice_pwd()
    }
}

/// Owned ICE credentials
///
/// # Examples
///
/// ```
/// # use stun_responder::credentials::{IceCredentials, PeerCredentials};
/// let credentials = IceCredentials::new("ufrag", "password");
/// assert_eq!(credentials.ice_ufrag(), b"ufrag");
/// assert_eq!(credentials.ice_pwd(), b"password");
/// assert!(!credentials.is_empty());
/// ```
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct IceCredentials {
    ufrag: Vec<u8>,
    pwd: Vec<u8>,
}

impl std::fmt::Debug for IceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IceCredentials")
            .field("ufrag", &String::from_utf8_lossy(&self.ufrag))
            .field("pwd", &"<redacted>")
            .finish()
    }
}

impl IceCredentials {
    /// Create a new set of [`IceCredentials`]
    pub fn new(ufrag: impl Into<Vec<u8>>, pwd: impl Into<Vec<u8>>) -> Self {
        Self {
            ufrag: ufrag.into(),
            pwd: pwd.into(),
        }
    }

    /// Whether either the username fragment or the password is empty.  Requests can never
    /// authenticate against empty credentials.
    pub fn is_empty(&self) -> bool {
        self.ufrag.is_empty() || self.pwd.is_empty()
    }
}

impl PeerCredentials for IceCredentials {
    fn ice_ufrag(&self) -> &[u8] {
        &self.ufrag
    }

    fn ice_pwd(&self) -> &[u8] {
        &self.pwd
    }
}
