// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sending responses

use std::io;
use std::net::{SocketAddr, UdpSocket};

/// A socket that responses can be sent through.  The socket is owned by the caller.
pub trait DatagramSocket {
    /// Send `buf` as a single datagram to `to`
    fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize>;
}

impl DatagramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, to)
    }
}

impl<T: DatagramSocket + ?Sized> DatagramSocket for &T {
    fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize> {
        (**self).send_to(buf, to)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every datagram sent through it.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSocket {
        pub(crate) sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    }

    impl DatagramSocket for RecordingSocket {
        fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize> {
            self.sent.lock().unwrap().push((buf.to_vec(), to));
            Ok(buf.len())
        }
    }

    /// Fails every send.
    #[derive(Debug)]
    pub(crate) struct FailingSocket;

    impl DatagramSocket for FailingSocket {
        fn send_to(&self, _buf: &[u8], _to: SocketAddr) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        }
    }

    #[test]
    fn udp_loopback() {
        let _log = crate::tests::test_init_log();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let to = receiver.local_addr().unwrap();
        assert_eq!(DatagramSocket::send_to(&sender, &[1, 2, 3], to).unwrap(), 3);
        let mut buf = [0; 16];
        let (len, from) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[1, 2, 3]);
        assert_eq!(from, sender.local_addr().unwrap());
    }

    #[test]
    fn recording() {
        let _log = crate::tests::test_init_log();
        let socket = RecordingSocket::default();
        let to = "127.0.0.1:9".parse().unwrap();
        (&socket).send_to(&[4], to).unwrap();
        assert_eq!(socket.sent.lock().unwrap().as_slice(), &[(vec![4], to)]);
    }
}
