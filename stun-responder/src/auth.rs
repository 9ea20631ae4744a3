// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! ICE short-term credential checks

use stun_wire::attribute::{split_username, StunAttributes};
use stun_wire::message::Message;

use tracing::{debug, trace};

use crate::credentials::PeerCredentials;

/// Reasons a request fails authentication.  All of them are answered with 401 Unauthorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The session has no local username fragment or password.
    #[error("No local ICE credentials available")]
    MissingCredentials,
    /// The USERNAME is missing or not of the form `local:remote`.
    #[error("The username is not of the form 'local:remote'")]
    MalformedUsername,
    /// The local half of the USERNAME does not match the local username fragment.
    #[error("The username does not match the local username fragment")]
    UfragMismatch,
    /// MESSAGE-INTEGRITY is missing or was not produced with the local password.
    #[error("The message integrity does not match")]
    IntegrityMismatch,
}

/// Authenticate a Binding request against the local ICE credentials.
///
/// The USERNAME must be `local:remote` with `local` equal to the local username fragment and the
/// MESSAGE-INTEGRITY must be keyed with the local password.
#[tracing::instrument(
    name = "check_auth",
    level = "trace",
    skip(msg, attrs, credentials),
    fields(
        msg.transaction = %msg.transaction_id(),
    )
)]
pub fn check_auth(
    msg: &Message<'_>,
    attrs: &StunAttributes<'_>,
    credentials: &impl PeerCredentials,
) -> Result<(), AuthError> {
    let ufrag = credentials.ice_ufrag();
    let pwd = credentials.ice_pwd();
    if ufrag.is_empty() || pwd.is_empty() {
        debug!("no local credentials");
        return Err(AuthError::MissingCredentials);
    }

    let Some((local, _remote)) = attrs.username().and_then(split_username) else {
        debug!("malformed username");
        return Err(AuthError::MalformedUsername);
    };
    if local != ufrag {
        debug!(
            "username fragment mismatch, received '{}', expected '{}'",
            String::from_utf8_lossy(local),
            String::from_utf8_lossy(ufrag)
        );
        return Err(AuthError::UfragMismatch);
    }

    if !msg.verify_integrity(attrs, pwd) {
        return Err(AuthError::IntegrityMismatch);
    }
    trace!("authenticated");
    Ok(())
}
