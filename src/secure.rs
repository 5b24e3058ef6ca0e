//! Secure UDP listener: ECDSA handshake + AES-256-GCM data channel.
//!
//! Byte-exact port of `original_source/aismixer_secure.py`. Handshake
//! messages are text (`NMEA-H|station_id|ts|base64(sig)`); data messages
//! are binary (`NMEA-D` + 12-byte nonce + AES-GCM ciphertext). ECDSA
//! signing uses pre-hashed SHA-256 digests with RFC6979 deterministic
//! nonces, so no RNG dependency is needed on the signing side (the server
//! only ever signs, during the handshake reply).

use std::{
    net::{SocketAddr, UdpSocket},
    time::{SystemTime, UNIX_EPOCH},
};

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use dashmap::DashMap;
use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::event::{IngressEvent, SourceKind};

pub const HANDSHAKE_PREFIX: &[u8] = b"NMEA-H";
pub const DATA_PREFIX: &[u8] = b"NMEA-D";
const HANDSHAKE_WINDOW_SECS: i64 = 30;
const DATA_AAD: &[u8] = b"NMEA";
const NONCE_LEN: usize = 12;

#[derive(Debug, Deserialize)]
struct DataMessage {
    source_id: String,
    payload: String,
}

struct Session {
    station_id: String,
    cipher: Aes256Gcm,
}

pub struct SecureListener {
    socket: UdpSocket,
    authorized_keys: std::collections::HashMap<String, p256::PublicKey>,
    server_key: p256::SecretKey,
    sessions: DashMap<SocketAddr, Session>,
}

impl SecureListener {
    pub fn bind(
        listen_ip: &str,
        listen_port: u16,
        cfg: &Config,
    ) -> crate::error::Result<Self> {
        let addr = format!("{listen_ip}:{listen_port}");
        let socket = UdpSocket::bind(&addr).map_err(|source| crate::error::MixerError::BindFailed {
            addr,
            source,
        })?;

        let keys_path = crate::config::resolve_path(
            "/etc/aismixer/authorized_keys.yaml",
            cfg.authorized_keys_file
                .as_deref()
                .unwrap_or("authorized_keys.yaml"),
        );
        let authorized_keys = crate::config::load_authorized_keys(&keys_path)?;

        let server_key_path = crate::config::resolve_path(
            "/etc/aismixer/aismixer_private.key",
            cfg.server_key_file
                .as_deref()
                .unwrap_or("aismixer_private.key"),
        );
        let server_key = crate::config::load_server_key(&server_key_path)?;

        Ok(Self {
            socket,
            authorized_keys,
            server_key,
            sessions: DashMap::new(),
        })
    }

    /// Blocking receive-and-process loop. Never returns under normal
    /// operation; each datagram that yields a complete ingress event is
    /// sent on `out`.
    pub fn run(&self, out: &crossbeam_channel::Sender<IngressEvent>) {
        let mut buf = [0u8; 8192];
        loop {
            let (n, addr) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "secure listener recv failed");
                    continue;
                }
            };
            let data = &buf[..n];

            if let Some(event) = self.handle_datagram(addr, data) {
                if out.send(event).is_err() {
                    return;
                }
            }
        }
    }

    fn handle_datagram(&self, addr: SocketAddr, data: &[u8]) -> Option<IngressEvent> {
        if let Some(rest) = data.strip_prefix(HANDSHAKE_PREFIX) {
            self.handle_handshake(addr, rest);
            None
        } else if let Some(rest) = data.strip_prefix(DATA_PREFIX) {
            self.handle_data(addr, rest)
        } else {
            debug!(%addr, "secure listener: unrecognized packet prefix");
            None
        }
    }

    fn handle_handshake(&self, addr: SocketAddr, rest: &[u8]) {
        let rest = rest.strip_prefix(b"|").unwrap_or(rest);
        let fields: Vec<&[u8]> = rest.split(|&b| b == b'|').collect();
        if fields.len() != 3 {
            warn!(%addr, "rejected handshake: malformed field count");
            return;
        }

        let Ok(station_id) = std::str::from_utf8(fields[0]) else {
            warn!(%addr, "rejected handshake: non-utf8 station id");
            return;
        };
        let Ok(ts_str) = std::str::from_utf8(fields[1]) else {
            warn!(%addr, "rejected handshake: non-utf8 timestamp");
            return;
        };
        let Ok(timestamp) = ts_str.parse::<i64>() else {
            warn!(%addr, "rejected handshake: unparsable timestamp");
            return;
        };
        let Ok(client_sig_bytes) = base64::engine::general_purpose::STANDARD.decode(fields[2])
        else {
            warn!(%addr, "rejected handshake: bad base64 signature");
            return;
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        if (now - timestamp).abs() > HANDSHAKE_WINDOW_SECS {
            warn!(%addr, station_id, "rejected handshake: timestamp out of window");
            return;
        }

        let Some(client_pub) = self.authorized_keys.get(station_id) else {
            warn!(%addr, station_id, "rejected handshake: unknown client");
            return;
        };

        let digest = handshake_digest(station_id, timestamp);

        let client_verifier = VerifyingKey::from(client_pub);
        let Ok(client_sig) = Signature::from_der(&client_sig_bytes) else {
            warn!(%addr, station_id, "rejected handshake: unparsable signature");
            return;
        };
        if client_verifier.verify_prehash(&digest, &client_sig).is_err() {
            warn!(%addr, station_id, "rejected handshake: signature verification failed");
            return;
        }

        let signing_key = SigningKey::from(&self.server_key);
        let server_sig: Signature = match signing_key.sign_prehash(&digest) {
            Ok(s) => s,
            Err(e) => {
                warn!(%addr, station_id, error = %e, "handshake error: server signing failed");
                return;
            }
        };
        let server_sig_der = server_sig.to_der();

        let shared = p256::ecdh::diffie_hellman(
            &self.server_key.to_nonzero_scalar(),
            client_pub.as_affine(),
        );

        let mut hasher = Sha256::new();
        hasher.update(b"NMEA-SESSION");
        hasher.update(shared.raw_secret_bytes());
        hasher.update(&client_sig_bytes);
        hasher.update(server_sig_der.as_bytes());
        let session_key = hasher.finalize();

        let Ok(cipher) = Aes256Gcm::new_from_slice(&session_key) else {
            warn!(%addr, station_id, "handshake error: bad derived session key length");
            return;
        };

        self.sessions.insert(
            addr,
            Session {
                station_id: station_id.to_string(),
                cipher,
            },
        );

        let mut response = b"OK|".to_vec();
        response.extend_from_slice(
            base64::engine::general_purpose::STANDARD
                .encode(server_sig_der.as_bytes())
                .as_bytes(),
        );
        if let Err(e) = self.socket.send_to(&response, addr) {
            warn!(%addr, error = %e, "failed to send handshake response");
            return;
        }
        info!(%addr, station_id, "accepted secure handshake");
    }

    fn handle_data(&self, addr: SocketAddr, rest: &[u8]) -> Option<IngressEvent> {
        if rest.len() < NONCE_LEN {
            warn!(%addr, "rejected data packet: too short for nonce");
            return None;
        }
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

        let Some(session) = self.sessions.get(&addr) else {
            warn!(%addr, "no session for secure data packet");
            return None;
        };

        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = match session.cipher.decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: DATA_AAD,
            },
        ) {
            Ok(p) => p,
            Err(_) => {
                warn!(%addr, "secure data decrypt failed");
                return None;
            }
        };

        let msg: DataMessage = match serde_json::from_slice(&plaintext) {
            Ok(m) => m,
            Err(e) => {
                warn!(%addr, error = %e, "secure data payload not valid json");
                return None;
            }
        };

        if msg.source_id != session.station_id {
            warn!(%addr, expected = %session.station_id, got = %msg.source_id, "source_id mismatch");
            return None;
        }

        Some(IngressEvent {
            kind: SourceKind::Sec,
            alias_for_s: Some(session.station_id.clone()),
            remote_ip: Some(addr.ip().to_string()),
            assembler_key: session.station_id.clone(),
            raw_line: msg.payload,
        })
    }
}

fn handshake_digest(station_id: &str, timestamp: i64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(HANDSHAKE_PREFIX);
    hasher.update(station_id.as_bytes());
    hasher.update((timestamp as u64).to_be_bytes());
    hasher.finalize().into()
}
