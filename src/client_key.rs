//! Client key derivation from the request's source address.

use axum::extract::ConnectInfo;
use axum::http::Request;
use std::net::SocketAddr;

use crate::error::{AddrErrorKind, Result, ThrottleError};

/// Raw "host:port" source address attached to a request.
///
/// Takes precedence over axum's `ConnectInfo`, which lets other transports
/// (and tests) supply the peer address as a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

/// The request's source address, or an empty string when none is known
pub fn remote_addr<B>(request: &Request<B>) -> String {
    if let Some(RemoteAddr(addr)) = request.extensions().get::<RemoteAddr>() {
        return addr.clone();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default()
}

/// Key identifying the client that sent `request`: the host of its source address
pub fn client_key<B>(request: &Request<B>) -> Result<String> {
    let addr = remote_addr(request);
    let (host, _port) = split_host_port(&addr)?;
    Ok(host.to_string())
}

/// Split "host:port", "[v6-host]:port" or "[v6-host%zone]:port" into host and port.
///
/// The port may be empty; the host may not contain further colons unless
/// it is bracketed.
pub fn split_host_port(addr: &str) -> Result<(&str, &str)> {
    let err = |kind| ThrottleError::address(addr, kind);

    let colon = addr.rfind(':').ok_or_else(|| err(AddrErrorKind::MissingPort))?;

    let (host, open_from, close_from) = if addr.starts_with('[') {
        let end = addr
            .find(']')
            .ok_or_else(|| err(AddrErrorKind::MissingClosingBracket))?;
        match end + 1 {
            i if i == addr.len() => return Err(err(AddrErrorKind::MissingPort)),
            i if i == colon => {}
            // Either ']' isn't followed by a colon, or it is but it's not the last one
            i if addr.as_bytes()[i] == b':' => return Err(err(AddrErrorKind::TooManyColons)),
            _ => return Err(err(AddrErrorKind::MissingPort)),
        }
        (&addr[1..end], 1, end + 1)
    } else {
        let host = &addr[..colon];
        if host.contains(':') {
            return Err(err(AddrErrorKind::TooManyColons));
        }
        (host, 0, 0)
    };

    if addr[open_from..].contains('[') {
        return Err(err(AddrErrorKind::UnexpectedOpeningBracket));
    }
    if addr[close_from..].contains(']') {
        return Err(err(AddrErrorKind::UnexpectedClosingBracket));
    }

    Ok((host, &addr[colon + 1..]))
}
