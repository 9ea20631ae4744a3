#![no_main]

use std::net::SocketAddr;
use std::sync::Once;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use stun_responder::credentials::IceCredentials;
use stun_responder::responder::{HandleStunReply, StunResponder};

static TRACING: Once = Once::new();

fn init_logs() {
    TRACING.call_once(|| {
        if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    });
}

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    credentials: IceCredentials,
    validate_magic_cookie: bool,
    from: SocketAddr,
    data: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    init_logs();
    let responder = StunResponder::builder()
        .validate_magic_cookie(input.validate_magic_cookie)
        .build();
    if let HandleStunReply::Respond(transmit) =
        responder.handle_stun(input.data, input.from, &input.credentials)
    {
        assert_eq!(transmit.to, input.from);
        assert!(transmit.data.as_bytes().len() <= 128);
    }
});
