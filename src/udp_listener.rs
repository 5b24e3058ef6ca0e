//! Plain (unauthenticated) UDP listener.
//!
//! Ported from `original_source/aismixer.py::handle_socket`: one bound
//! socket per configured input, each received datagram becomes an
//! `IngressEvent` keyed by its source `(ip, port)` for reassembly, with
//! `alias_for_s` resolved from the input's fixed `id` or, failing that,
//! the global IP-alias map.

use std::{collections::HashMap, net::UdpSocket};

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::error::{MixerError, Result};
use crate::event::{IngressEvent, SourceKind};

pub struct UdpListener {
    socket: UdpSocket,
    fixed_alias: Option<String>,
    alias_map: HashMap<String, String>,
    debug_logging: bool,
}

impl UdpListener {
    pub fn bind(
        listen_ip: &str,
        listen_port: u16,
        fixed_alias: Option<String>,
        alias_map: HashMap<String, String>,
        debug_logging: bool,
    ) -> Result<Self> {
        let addr = format!("{listen_ip}:{listen_port}");
        let socket = UdpSocket::bind(&addr).map_err(|source| MixerError::BindFailed { addr, source })?;
        Ok(Self {
            socket,
            fixed_alias,
            alias_map,
            debug_logging,
        })
    }

    /// Blocking receive loop; sends one `IngressEvent` per datagram.
    pub fn run(&self, out: &Sender<IngressEvent>) {
        let mut buf = [0u8; 8192];
        loop {
            let (n, addr) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "udp listener recv failed");
                    continue;
                }
            };

            let raw_line = String::from_utf8_lossy(&buf[..n]).trim().to_string();
            if raw_line.is_empty() {
                continue;
            }

            if self.debug_logging {
                debug!(%addr, line = %raw_line, "udp input");
            }

            let source_ip = addr.ip().to_string();
            let alias_for_s = self
                .fixed_alias
                .clone()
                .or_else(|| self.alias_map.get(&source_ip).cloned());

            let event = IngressEvent {
                kind: SourceKind::Udp,
                alias_for_s,
                remote_ip: Some(source_ip),
                assembler_key: format!("{}:{}", addr.ip(), addr.port()),
                raw_line,
            };
            if out.send(event).is_err() {
                return;
            }
        }
    }
}
