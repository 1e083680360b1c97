//! Dissection scenarios and the layer tiling property.

use etherparse::PacketBuilder;
use framescope::{decode, DecodedPacket, LayerKind, RawFrame};
use proptest::{collection::vec, prelude::*};

const SRC_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
const DST_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x02];
const SRC_IP: [u8; 4] = [192, 168, 1, 10];
const DST_IP: [u8; 4] = [10, 0, 0, 1];

fn ethernet_header(ether_type: u16) -> Vec<u8> {
    let mut bytes = DST_MAC.to_vec();
    bytes.extend_from_slice(&SRC_MAC);
    bytes.extend_from_slice(&ether_type.to_be_bytes());
    bytes
}

fn tcp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4(SRC_IP, DST_IP, 64)
        .tcp(src_port, dst_port, 1000, 65535);
    let mut bytes = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut bytes, payload).unwrap();
    bytes
}

fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4(SRC_IP, DST_IP, 64)
        .udp(src_port, dst_port);
    let mut bytes = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut bytes, payload).unwrap();
    bytes
}

fn icmp_echo_frame(payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4(SRC_IP, DST_IP, 64)
        .icmpv4_echo_request(7, 1);
    let mut bytes = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut bytes, payload).unwrap();
    bytes
}

fn arp_reply_frame() -> Vec<u8> {
    let mut bytes = ethernet_header(0x0806);
    bytes.extend(hex::decode("0001080006040002020000000001c0a8010a020000000002c0a80114").unwrap());
    bytes
}

fn decode_bytes(bytes: Vec<u8>) -> DecodedPacket {
    decode(RawFrame::new(bytes, 1_700_000_000_000_000, 1))
}

fn assert_tiles(packet: &DecodedPacket) {
    let mut expected_start = 0;
    for (i, layer) in packet.layers().iter().enumerate() {
        assert_eq!(layer.span.start, expected_start, "gap or overlap at layer {i}");
        assert!(layer.span.end <= packet.len());
        if matches!(layer.kind, LayerKind::Opaque) {
            assert_eq!(i, packet.layers().len() - 1, "opaque layer must be last");
            assert!(!layer.is_empty());
        }
        expected_start = layer.span.end;
    }
    assert_eq!(expected_start, packet.len());
}

#[test]
fn ethernet_ipv4_tcp() {
    let bytes = tcp_frame(443, 51000, &[]);
    assert_eq!(bytes.len(), 54);

    let packet = decode_bytes(bytes);
    assert_eq!(packet.layer_names(), vec!["Ether", "IPv4", "TCP"]);
    assert_eq!(packet.protocol(), "TCP");
    assert_eq!(packet.summary(), "443 -> 51000");
    assert_eq!(packet.source(), "192.168.1.10");
    assert_eq!(packet.destination(), "10.0.0.1");
    assert_tiles(&packet);
}

#[test]
fn tcp_payload_becomes_opaque() {
    let packet = decode_bytes(tcp_frame(22, 40000, b"SSH-2.0-OpenSSH"));
    assert_eq!(packet.layer_names(), vec!["Ether", "IPv4", "TCP", "Binary"]);
    let opaque = packet.layers().last().unwrap();
    assert_eq!(packet.layer_bytes(opaque), b"SSH-2.0-OpenSSH");
    assert_eq!(packet.protocol(), "TCP");
}

#[test]
fn udp_summary() {
    let packet = decode_bytes(udp_frame(5353, 53, &[0u8; 12]));
    assert_eq!(packet.protocol(), "UDP");
    assert_eq!(packet.summary(), "5353 -> 53");
    assert_eq!(packet.layers()[2].span, 34..42);
    assert_tiles(&packet);
}

#[test]
fn icmp_summary() {
    let packet = decode_bytes(icmp_echo_frame(b"ping"));
    assert_eq!(packet.protocol(), "ICMP");
    assert_eq!(packet.summary(), "type=8 code=0");
    assert_eq!(packet.layer_names(), vec!["Ether", "IPv4", "ICMP", "Binary"]);
    assert_tiles(&packet);
}

#[test]
fn arp_reply() {
    let packet = decode_bytes(arp_reply_frame());
    assert_eq!(packet.layer_names(), vec!["Ether", "ARP"]);
    assert_eq!(packet.protocol(), "ARP");
    assert_eq!(packet.summary(), "192.168.1.10 is-at 02:00:00:00:00:01");
    assert_eq!(packet.source(), "02:00:00:00:00:01");
    assert_tiles(&packet);
}

#[test]
fn unknown_ether_type() {
    let mut bytes = ethernet_header(0x1234);
    bytes.extend_from_slice(&[0x5a; 20]);

    let packet = decode_bytes(bytes);
    assert_eq!(packet.layer_names(), vec!["Ether", "Binary"]);
    assert_eq!(packet.layers()[1].len(), 20);
    assert_eq!(packet.protocol(), "Ether");
    assert_tiles(&packet);
}

#[test]
fn truncated_ip_header() {
    let mut bytes = ethernet_header(0x0800);
    bytes.extend_from_slice(&[0x45, 0, 0, 40, 0]);

    let packet = decode_bytes(bytes);
    assert_eq!(packet.layer_names(), vec!["Ether", "Binary"]);
    assert_eq!(packet.layers()[1].span, 14..19);
    assert_eq!(packet.protocol(), "Ether");
    assert_eq!(packet.summary(), "Ethernet packet.type=0x0800");
}

#[test]
fn unknown_ip_protocol() {
    let mut bytes = tcp_frame(1, 2, &[]);
    // Rewrite the protocol number to GRE; the checksum is not verified.
    bytes[23] = 47;
    let packet = decode_bytes(bytes);
    assert_eq!(packet.layer_names(), vec!["Ether", "IPv4", "Binary"]);
    assert_eq!(packet.protocol(), "IPv4");
    assert_eq!(packet.summary(), "protocol=47");
}

#[test]
fn list_row_columns() {
    let packet = decode(RawFrame::new(tcp_frame(443, 51000, &[]), 12, 3));
    assert_eq!(
        packet.to_string(),
        "    3 12            192.168.1.10         10.0.0.1             TCP       54 443 -> 51000"
    );
}

#[test]
fn hexdump_covers_whole_frame() {
    let packet = decode_bytes(tcp_frame(443, 51000, &[0xee; 30]));
    assert_eq!(packet.len(), 84);
    assert_eq!(packet.hexdump().len(), 6);
    assert_eq!(packet.hexdump()[5].offset, 80);
}

fn truncated_frames() -> impl Strategy<Value = Vec<u8>> {
    let frames = prop_oneof![
        vec(any::<u8>(), 0..64).prop_map(|p| tcp_frame(443, 51000, &p)),
        vec(any::<u8>(), 0..64).prop_map(|p| udp_frame(53, 5353, &p)),
        vec(any::<u8>(), 0..64).prop_map(|p| icmp_echo_frame(&p)),
        Just(arp_reply_frame()),
    ];
    (frames, any::<prop::sample::Index>()).prop_map(|(frame, cut)| {
        let len = cut.index(frame.len() + 1);
        frame[..len].to_vec()
    })
}

proptest! {
    #[test]
    fn arbitrary_bytes_tile(bytes in vec(any::<u8>(), 0..200)) {
        let packet = decode_bytes(bytes);
        assert_tiles(&packet);
    }

    #[test]
    fn truncated_frames_tile(bytes in truncated_frames()) {
        let len = bytes.len();
        let packet = decode_bytes(bytes);
        assert_tiles(&packet);
        prop_assert_eq!(packet.len(), len);
        prop_assert_eq!(packet.hexdump().len(), len.div_ceil(16));
    }
}
