//! Best-effort UDP fan-out to the configured forward targets.
//!
//! `original_source/forwarder.py::Forwarder` lazily opens one "connected"
//! datagram socket per `(host, port)` target and reuses it. A single
//! outbound `UdpSocket` bound once and `send_to` per target reproduces the
//! same effect without keeping a distinct socket per destination, since
//! `send_to` on an unconnected socket needs no prior per-target endpoint;
//! the endpoint cache here instead remembers each target's resolved
//! `SocketAddr` so repeat sends skip DNS/parse work, mirroring the
//! teacher's `DashMap`-backed registries in `server.rs`.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use dashmap::DashMap;
use tracing::warn;

use crate::config::ForwardTarget;

pub struct Forwarder {
    targets: Vec<ForwardTarget>,
    socket: UdpSocket,
    resolved: DashMap<(String, u16), SocketAddr>,
}

impl Forwarder {
    pub fn new(targets: Vec<ForwardTarget>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            targets,
            socket,
            resolved: DashMap::new(),
        })
    }

    fn resolve(&self, target: &ForwardTarget) -> Option<SocketAddr> {
        let key = (target.host.clone(), target.port);
        if let Some(addr) = self.resolved.get(&key) {
            return Some(*addr);
        }
        let addr = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .ok()?
            .next()?;
        self.resolved.insert(key, addr);
        Some(addr)
    }

    /// Sends `message` to every configured target independently; a
    /// per-target resolve/send failure is logged and does not affect the
    /// others, matching the original's best-effort, per-target semantics.
    pub fn send(&self, message: &str) {
        for target in &self.targets {
            let Some(addr) = self.resolve(target) else {
                warn!(host = %target.host, port = target.port, "forward target did not resolve");
                continue;
            };
            if let Err(e) = self.socket.send_to(message.as_bytes(), addr) {
                warn!(host = %target.host, port = target.port, error = %e, "forward send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_to_loopback_target_does_not_panic() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let forwarder = Forwarder::new(vec![ForwardTarget {
            host: "127.0.0.1".to_string(),
            port,
        }])
        .unwrap();
        forwarder.send("!AIVDM,1,1,,A,abc,0*1A\r\n");

        let mut buf = [0u8; 256];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"!AIVDM,1,1,,A,abc,0*1A\r\n");
    }

    #[test]
    fn unresolvable_target_is_skipped_without_panicking() {
        let forwarder = Forwarder::new(vec![ForwardTarget {
            host: "this.host.does.not.resolve.invalid".to_string(),
            port: 12345,
        }])
        .unwrap();
        forwarder.send("line");
    }
}
