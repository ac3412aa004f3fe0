//! Text message parsing and encoding.
//!
//! The wire format is one single-line, newline-free ASCII message per UDP
//! datagram:
//!
//! ```text
//! client -> server   DHCPDISCOVER CLIENT_ID: <id>
//! client -> server   DHCPDISCOVER
//! client -> server   DHCPREQUEST IP: <addr> CLIENT_ID: <id>
//! server -> client   DHCPOFFER IP: <a> NETMASK: <m> GATEWAY: <g> DNS: <d> LEASE: <s>
//! server -> client   DHCPACK IP: <a> NETMASK: <m> GATEWAY: <g> DNS: <d> LEASE: <s>
//! server -> client   DHCPNAK
//! ```
//!
//! Classification is by substring, with `DHCPREQUEST` taking priority over
//! `DHCPDISCOVER`; anything else is malformed. Field extraction scans for
//! the literal markers `IP:` and `CLIENT_ID:` and takes a bounded number
//! of characters, so an oversized token can never smuggle arbitrary
//! amounts of data into the lease table.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};

/// Token that classifies a message as an address request.
const REQUEST_KEYWORD: &str = "DHCPREQUEST";

/// Token that classifies a message as a discover probe.
const DISCOVER_KEYWORD: &str = "DHCPDISCOVER";

/// Marker preceding the requested address in a `DHCPREQUEST`.
const IP_MARKER: &str = "IP:";

/// Marker preceding the client identifier.
const CLIENT_ID_MARKER: &str = "CLIENT_ID:";

/// Maximum width of an address token (`255.255.255.255` is 15 chars).
const MAX_ADDR_WIDTH: usize = 15;

/// Maximum width of a client identifier token.
const MAX_CLIENT_ID_WIDTH: usize = 49;

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `DHCPDISCOVER`: the client asks for an address to be offered.
    Discover { client_id: String },

    /// `DHCPREQUEST`: the client asks the server to confirm an address.
    RequestAddr {
        client_id: String,
        requested: Ipv4Addr,
    },

    /// Anything the classifier cannot place, including a `DHCPREQUEST`
    /// with a missing or unparsable field. Always answered with `DHCPNAK`.
    Malformed { raw: String },
}

impl Request {
    /// Parses one inbound datagram.
    ///
    /// `source` is the peer the datagram arrived from. Its IP serves as
    /// the client identifier when a DISCOVER carries no `CLIENT_ID:`
    /// field, which means distinct hosts whose traffic reaches the
    /// server from one address share an identity; see
    /// [`LeaseRecord`](crate::lease::LeaseRecord).
    pub fn parse(data: &[u8], source: SocketAddr) -> Self {
        let text = String::from_utf8_lossy(data);

        if text.contains(REQUEST_KEYWORD) {
            let requested = token_after(&text, IP_MARKER, MAX_ADDR_WIDTH)
                .and_then(|token| token.parse::<Ipv4Addr>().ok());
            let client_id = token_after(&text, CLIENT_ID_MARKER, MAX_CLIENT_ID_WIDTH);

            return match (requested, client_id) {
                (Some(requested), Some(client_id)) => Request::RequestAddr {
                    client_id: client_id.to_string(),
                    requested,
                },
                _ => Request::Malformed {
                    raw: text.into_owned(),
                },
            };
        }

        if text.contains(DISCOVER_KEYWORD) {
            let client_id = match token_after(&text, CLIENT_ID_MARKER, MAX_CLIENT_ID_WIDTH) {
                Some(id) => id.to_string(),
                None => source.ip().to_string(),
            };
            return Request::Discover { client_id };
        }

        Request::Malformed {
            raw: text.into_owned(),
        }
    }
}

/// Returns the whitespace-delimited token following `marker`, truncated to
/// at most `max_width` characters. `None` when the marker is absent or
/// followed by nothing but whitespace.
fn token_after<'a>(text: &'a str, marker: &str, max_width: usize) -> Option<&'a str> {
    let after = &text[text.find(marker)? + marker.len()..];
    let token = after.trim_start();

    let mut end = 0;
    for (taken, (index, ch)) in token.char_indices().enumerate() {
        if taken == max_width || ch.is_whitespace() {
            break;
        }
        end = index + ch.len_utf8();
    }

    if end == 0 { None } else { Some(&token[..end]) }
}

/// The static parameters echoed in every `DHCPOFFER`/`DHCPACK`.
///
/// Netmask, gateway, DNS and lease duration are fixed at server start; only
/// the address varies per client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseParams {
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub lease_seconds: u32,
}

impl fmt::Display for LeaseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IP: {} NETMASK: {} GATEWAY: {} DNS: {} LEASE: {}",
            self.address, self.netmask, self.gateway, self.dns, self.lease_seconds
        )
    }
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `DHCPOFFER`: the address the client may go on to request.
    Offer(LeaseParams),

    /// `DHCPACK`: the requested address is confirmed as the client's lease.
    Ack(LeaseParams),

    /// `DHCPNAK`: rejection, sent for malformed input, pool exhaustion,
    /// address mismatches and requests from unknown clients alike.
    Nak,
}

impl Reply {
    /// Encodes the reply as a single-line ASCII datagram payload.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Offer(params) => write!(f, "DHCPOFFER {}", params),
            Reply::Ack(params) => write!(f, "DHCPACK {}", params),
            Reply::Nak => write!(f, "DHCPNAK"),
        }
    }
}
