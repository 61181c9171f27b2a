use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

/// Creator tag for rooms: sha256 of the connection's ip, lowercase hex.
///
/// Anyone behind the same address gets the same token. It is a display tag, nothing checks it.
pub fn creator_token(addr: &IpAddr) -> String {
    hex::encode(Sha256::digest(addr.to_string().as_bytes()))
}

/// The address a connection is known by. Proxies only count when we were told to trust them.
pub fn peer_ip(peer: SocketAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    peer.ip()
}
