//! Bootstrap peers a freshly initialized node dials first.

use std::fmt;

use libp2p::multiaddr::Protocol;
use libp2p::{Multiaddr, PeerId};

use crate::error::{Error, Result};

/// Addresses written into a new node's configuration.
pub const DEFAULT_BOOTSTRAP_ADDRESSES: &[&str] = &[
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmQCU2EcMqAqQPR2i9bChDtGNJchTbq5TbXJJ16u19uLTa",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmbLHAnMoJPWSCR5Zhtx6BHJX9KiKNN6tpvbUcqanj75Nb",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmcZf59bWwK5XFi76CZX8cbJ4BhTzzA3gU1ZjYZcYW3dwt",
    "/ip4/104.131.131.82/tcp/4001/p2p/QmaCpDMGvV2BGHeYERUEnRQAwe3N8SzbUtfsmvsqQLuvuJ",
];

/// A bootstrap address together with the peer it must reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPeer {
    pub peer_id: PeerId,
    /// Full address, ending in `/p2p/<peer_id>`.
    pub address: Multiaddr,
}

impl fmt::Display for BootstrapPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Parses one bootstrap address. It must end in a `/p2p/<peer id>` component.
pub fn parse_bootstrap_peer(address: &str) -> Result<BootstrapPeer> {
    let address: Multiaddr = address
        .parse()
        .map_err(|e| Error::Bootstrap(format!("{address}: {e}")))?;

    let peer_id = match address.iter().last() {
        Some(Protocol::P2p(peer_id)) => peer_id,
        _ => {
            return Err(Error::Bootstrap(format!(
                "{address}: missing /p2p/<peer id> component"
            )))
        }
    };

    Ok(BootstrapPeer { peer_id, address })
}

/// Parses a list of bootstrap addresses, failing on the first invalid entry.
pub fn parse_bootstrap_peers<S: AsRef<str>>(addresses: &[S]) -> Result<Vec<BootstrapPeer>> {
    addresses
        .iter()
        .map(|address| parse_bootstrap_peer(address.as_ref()))
        .collect()
}

/// The built-in bootstrap list.
pub fn default_bootstrap_peers() -> Result<Vec<BootstrapPeer>> {
    parse_bootstrap_peers(DEFAULT_BOOTSTRAP_ADDRESSES)
}

/// Renders bootstrap peers in their persisted string form.
pub fn bootstrap_peer_strings(peers: &[BootstrapPeer]) -> Vec<String> {
    peers.iter().map(|peer| peer.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bootstrap_peers_parse() {
        let peers = default_bootstrap_peers().unwrap();
        assert_eq!(peers.len(), DEFAULT_BOOTSTRAP_ADDRESSES.len());
        assert_eq!(
            peers[4].peer_id.to_base58(),
            "QmaCpDMGvV2BGHeYERUEnRQAwe3N8SzbUtfsmvsqQLuvuJ"
        );
    }

    #[test]
    fn test_strings_round_trip() {
        let peers = default_bootstrap_peers().unwrap();
        let strings = bootstrap_peer_strings(&peers);
        assert_eq!(strings, DEFAULT_BOOTSTRAP_ADDRESSES);
    }

    #[test]
    fn test_rejects_address_without_peer() {
        let result = parse_bootstrap_peer("/ip4/127.0.0.1/tcp/4001");
        assert!(matches!(result, Err(Error::Bootstrap(_))));
    }

    #[test]
    fn test_rejects_malformed_address() {
        let result = parse_bootstrap_peers(&["/ip4/not-an-ip/tcp/4001"][..]);
        assert!(matches!(result, Err(Error::Bootstrap(_))));
    }
}
