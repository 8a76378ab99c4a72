//! Local address discovery for the callback listener.

use std::net::{IpAddr, UdpSocket};

use crate::error::{Error, Result};

/// Best-effort discovery of the address the simulator can reach us on.
///
/// Connecting a UDP socket sends no packets; it only asks the kernel which
/// interface would route toward the given peer.
pub fn routable_ip(simulator_ip: &str) -> Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").map_err(|_| Error::NoLocalAddress)?;
    let target = format!("{simulator_ip}:80");
    if socket.connect(&target).is_err() {
        // Unresolvable simulator host; fall back to the default route.
        socket
            .connect("8.8.8.8:80")
            .map_err(|_| Error::NoLocalAddress)?;
    }
    socket
        .local_addr()
        .map(|addr| addr.ip())
        .map_err(|_| Error::NoLocalAddress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_some_local_address() {
        let ip = routable_ip("127.0.0.1").expect("loopback routing should resolve");
        assert!(ip.is_loopback() || !ip.is_unspecified());
    }
}
