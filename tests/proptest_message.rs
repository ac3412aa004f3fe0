use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use proptest::prelude::*;

use leaseline::{LeaseParams, Reply, Request};

fn source() -> SocketAddr {
    "203.0.113.9:68".parse().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10000))]

    #[test]
    fn parse_never_panics_on_arbitrary_bytes(data: Vec<u8>) {
        let _ = Request::parse(&data, source());
    }

    #[test]
    fn request_keyword_never_classifies_as_discover(
        prefix in "[ -~]{0,64}",
        suffix in "[ -~]{0,64}"
    ) {
        let message = format!("{}DHCPREQUEST{}", prefix, suffix);
        let parsed = Request::parse(message.as_bytes(), source());
        let is_discover = matches!(parsed, Request::Discover { .. });
        prop_assert!(!is_discover);
    }

    #[test]
    fn extracted_fields_are_always_bounded(message in "[ -~]{0,300}") {
        match Request::parse(message.as_bytes(), source()) {
            Request::Discover { client_id } => {
                prop_assert!(client_id.chars().count() <= 49);
            }
            Request::RequestAddr { client_id, .. } => {
                prop_assert!(client_id.chars().count() <= 49);
            }
            Request::Malformed { .. } => {}
        }
    }

    #[test]
    fn discover_client_id_is_a_bounded_prefix(id in "[!-~]{1,200}") {
        prop_assume!(!id.contains("DHCPREQUEST"));

        let message = format!("DHCPDISCOVER CLIENT_ID: {}", id);
        match Request::parse(message.as_bytes(), source()) {
            Request::Discover { client_id } => {
                prop_assert!(client_id.chars().count() <= 49);
                prop_assert!(id.starts_with(&client_id));
            }
            other => prop_assert!(false, "expected discover, got {:?}", other),
        }
    }

    #[test]
    fn discover_without_client_id_uses_source_ip(
        octets in any::<[u8; 4]>(),
        port in any::<u16>()
    ) {
        let address = Ipv4Addr::from(octets);
        let from = SocketAddr::new(IpAddr::V4(address), port);
        let parsed = Request::parse(b"DHCPDISCOVER", from);
        prop_assert_eq!(
            parsed,
            Request::Discover {
                client_id: address.to_string()
            }
        );
    }

    #[test]
    fn well_formed_requests_parse_exactly(
        octets in any::<[u8; 4]>(),
        id in "[A-Za-z0-9_-]{1,49}"
    ) {
        let address = Ipv4Addr::from(octets);
        let message = format!("DHCPREQUEST IP: {} CLIENT_ID: {}", address, id);
        let parsed = Request::parse(message.as_bytes(), source());
        prop_assert_eq!(
            parsed,
            Request::RequestAddr {
                client_id: id,
                requested: address,
            }
        );
    }

    #[test]
    fn replies_encode_to_single_line_ascii(
        address in any::<[u8; 4]>(),
        netmask in any::<[u8; 4]>(),
        gateway in any::<[u8; 4]>(),
        dns in any::<[u8; 4]>(),
        lease_seconds in any::<u32>(),
        ack in any::<bool>()
    ) {
        let params = LeaseParams {
            address: address.into(),
            netmask: netmask.into(),
            gateway: gateway.into(),
            dns: dns.into(),
            lease_seconds,
        };
        let reply = if ack {
            Reply::Ack(params)
        } else {
            Reply::Offer(params)
        };

        let text = String::from_utf8(reply.encode()).unwrap();
        prop_assert!(text.is_ascii());
        prop_assert!(!text.contains('\n'));
        prop_assert!(!text.contains('\r'));
        if ack {
            prop_assert!(text.starts_with("DHCPACK IP: "));
        } else {
            prop_assert!(text.starts_with("DHCPOFFER IP: "));
        }
    }
}
