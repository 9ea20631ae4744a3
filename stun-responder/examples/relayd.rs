// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Answers ICE connectivity checks on a UDP socket.
//!
//! Usage: `relayd [ADDRESS] [UFRAG] [PASSWORD]`
//!
//! When `RELAYD_RECORD_DIR` is set, every datagram that is not STUN is recorded into that spool
//! directory using the method in `RELAYD_RECORD_METHOD` (`pcap` by default).
//!
//! With `RELAYD_IDLE_TIMEOUT` set to a number of seconds, the daemon exits once nothing was
//! received for that long.  Any recording is finished when the daemon exits.

#![cfg(not(tarpaulin))]

use std::fmt::Display;
use std::net::{SocketAddr, UdpSocket};
use std::str::FromStr;
use std::time::Duration;

use tracing::{error, info, trace, warn};

use stun_responder::credentials::IceCredentials;
use stun_responder::recording::{
    Recording, RecordingBackend, RecordingConfig, RecordingMethod, RecordingMethodKind,
    RecordingStream,
};
use stun_responder::responder::{DropReason, HandleStunReply, StunResponder};

fn warn_on_err<T, E>(res: Result<T, E>, default: T) -> T
where
    E: Display,
{
    match res {
        Ok(v) => v,
        Err(e) => {
            warn!("{}", e);
            default
        }
    }
}

fn init_logs() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Layer;
    let level_filter = std::env::var("STUN_LOG")
        .ok()
        .and_then(|var| var.parse::<tracing_subscriber::filter::Targets>().ok())
        .unwrap_or(tracing_subscriber::filter::Targets::new().with_default(tracing::Level::ERROR));
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_level(true)
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(level_filter),
    );
    tracing::subscriber::set_global_default(registry).unwrap()
}

fn init_recording() -> Option<(RecordingBackend, Recording, RecordingStream)> {
    let spool_dir = std::env::var("RELAYD_RECORD_DIR").ok()?;
    let method = std::env::var("RELAYD_RECORD_METHOD")
        .ok()
        .map(|method| RecordingMethodKind::from_str(&method).unwrap())
        .unwrap_or(RecordingMethodKind::Pcap);
    let backend = RecordingConfig::new(spool_dir, method).init().unwrap();
    let mut recording = backend.init_call("relayd", None).unwrap();
    let stream = backend.setup_stream(&mut recording).unwrap();
    Some((backend, recording, stream))
}

fn main() -> std::io::Result<()> {
    init_logs();

    let args: Vec<String> = std::env::args().collect();
    let local_addr = SocketAddr::from_str(args.get(1).map_or("127.0.0.1:3478", String::as_str))
        .unwrap();
    let credentials = IceCredentials::new(
        args.get(2).map_or("ufrag", String::as_str),
        args.get(3).map_or("password", String::as_str),
    );

    let udp_socket = UdpSocket::bind(local_addr)?;
    let idle_timeout = std::env::var("RELAYD_IDLE_TIMEOUT")
        .ok()
        .map(|secs| Duration::from_secs(secs.parse().unwrap()));
    udp_socket.set_read_timeout(idle_timeout)?;
    let responder = StunResponder::builder().build();
    let mut recording = init_recording();
    info!("answering connectivity checks on {local_addr} for {credentials:?}");

    loop {
        let mut data = [0; 1500];
        let (len, from) = match udp_socket.recv_from(&mut data) {
            Ok(ret) => ret,
            Err(e) => {
                if idle_timeout.is_some()
                    && matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    )
                {
                    info!("idle, exiting");
                } else {
                    error!("failed to receive: {e}");
                }
                break;
            }
        };
        let data = &data[..len];
        match responder.handle_stun(data, from, &credentials) {
            HandleStunReply::Drop(DropReason::NotStun) => {
                trace!("media from {from}");
                if let Some((backend, recording, stream)) = recording.as_mut() {
                    warn_on_err(backend.dump_packet(recording, stream, data), ());
                }
            }
            HandleStunReply::Drop(reason) => info!("dropped datagram from {from}: {reason}"),
            HandleStunReply::Respond(transmit) => {
                info!("sending {} to {}", transmit.data, transmit.to);
                warn_on_err(
                    udp_socket.send_to(transmit.data.as_bytes(), transmit.to),
                    0,
                );
            }
        }
    }

    if let Some((backend, recording, _stream)) = recording {
        match backend.finish(recording) {
            Ok(meta) => info!("recording metadata written to {}", meta.display()),
            Err(e) => error!("failed to finish recording: {e}"),
        }
    }
    Ok(())
}
