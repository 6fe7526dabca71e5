//! Loopback detection for the configured remote.
//!
//! The proxy talks plain HTTP only to endpoints on the local machine; any
//! other remote is reached over HTTPS.

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Returns true if the host portion of a `host:port` address is a loopback name.
///
/// Addresses that cannot be split into host and port (for example a bare
/// hostname) are treated as non-loopback.
pub fn is_loopback(addr: &str) -> bool {
    match split_host_port(addr) {
        Some((host, _)) => LOOPBACK_HOSTS.contains(&host),
        None => false,
    }
}

/// Split `host:port` or `[v6]:port` into its two halves.
fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }

    let (host, port) = addr.rsplit_once(':')?;
    // An unbracketed host with colons is an IPv6 literal missing its port.
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}
