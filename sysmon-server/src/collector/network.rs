//! Best-effort discovery of the address used for outbound traffic.

use std::net::{IpAddr, SocketAddr, UdpSocket};

use super::SourceError;

/// Any routable address works; connecting a UDP socket sends nothing.
const PROBE_TARGET: &str = "8.8.8.8:80";

/// Local address the kernel picks for the default route.
pub fn outbound_ip() -> Result<IpAddr, SourceError> {
    let probe_error = |e: std::io::Error| SourceError::Command {
        program: "udp route probe".to_string(),
        reason: e.to_string(),
    };
    let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).map_err(probe_error)?;
    socket.connect(PROBE_TARGET).map_err(probe_error)?;
    let ip = socket.local_addr().map_err(probe_error)?.ip();
    if is_usable(ip) {
        Ok(ip)
    } else {
        Err(SourceError::parse("udp route probe", format!("unusable address {ip}")))
    }
}

pub fn is_usable(ip: IpAddr) -> bool {
    !ip.is_loopback() && !ip.is_unspecified()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_usable() {
        assert!(is_usable("192.168.1.10".parse().unwrap()));
        assert!(is_usable("2001:db8::1".parse().unwrap()));
        assert!(!is_usable("127.0.0.1".parse().unwrap()));
        assert!(!is_usable("0.0.0.0".parse().unwrap()));
        assert!(!is_usable("::1".parse().unwrap()));
    }

    #[test]
    fn test_outbound_ip_never_returns_loopback() {
        // offline builders legitimately fail the probe
        if let Ok(ip) = outbound_ip() {
            assert!(is_usable(ip));
        }
    }
}
