use super::Connectivity;
use log::debug;
use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

/// A connectivity check that tries to open a TCP connection.
///
/// The network counts as reachable if any resolved address accepts
/// the connection within the timeout.
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    /// Creates a new probe for an address like "api.netlify.com:443".
    pub fn new(address: String, timeout: Duration) -> Self {
        TcpProbe { address, timeout }
    }
}

impl Connectivity for TcpProbe {
    fn is_online(&self) -> bool {
        let addresses = match self.address.to_socket_addrs() {
            Ok(addresses) => addresses,
            Err(err) => {
                debug!("Cannot resolve {}: {err}.", self.address);
                return false;
            }
        };

        for address in addresses {
            match TcpStream::connect_timeout(&address, self.timeout) {
                Ok(_) => return true,
                Err(err) => debug!("Cannot connect to {address}: {err}."),
            }
        }

        false
    }
}
