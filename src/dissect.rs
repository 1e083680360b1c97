//! Layer-by-layer dissection of a captured frame.
//!
//! Dissection walks a cursor through the frame. Each recognised header becomes
//! a [`Layer`] whose span starts at the cursor, and the cursor moves past it.
//! Whatever is left when recognition stops, for any reason, becomes a single
//! trailing `Opaque` layer, so the layer spans always tile the frame exactly.

use tracing::debug;

use crate::headers::{
    format_mac, ArpHeader, EthernetHeader, HeaderView, IcmpHeader, Ipv4Header, Sll2Header,
    SllHeader, TcpHeader, UdpHeader,
};
use crate::hexdump::dump;
use crate::model::{DecodedPacket, Layer, LayerKind, RawFrame};

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_IPV6: u16 = 0x86dd;

pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

/// Label used when not even the link layer could be parsed.
pub const RAW_LABEL: &str = "Raw";

/// Link-layer header type of a capture, from the pcap file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    LinuxSll,
    LinuxSll2,
    /// Not dissected; frames become a single `Opaque` layer.
    Other(i32),
}

impl LinkType {
    pub const ETHERNET: i32 = 1;
    pub const LINUX_SLL: i32 = 113;
    pub const LINUX_SLL2: i32 = 276;

    /// Maps a pcap `LINKTYPE_*` value.
    pub fn from_pcap(linktype: i32) -> Self {
        match linktype {
            Self::ETHERNET => LinkType::Ethernet,
            Self::LINUX_SLL => LinkType::LinuxSll,
            Self::LINUX_SLL2 => LinkType::LinuxSll2,
            other => LinkType::Other(other),
        }
    }
}

/// Dissects an Ethernet `frame`. Never fails: anything that cannot be parsed
/// ends up in the trailing `Opaque` layer.
pub fn decode(frame: RawFrame) -> DecodedPacket {
    decode_link(frame, LinkType::Ethernet)
}

/// Like [`decode`], starting from the given link-layer header type.
pub fn decode_link(frame: RawFrame, link: LinkType) -> DecodedPacket {
    let RawFrame { data, timestamp, number } = frame;

    let mut dissection = Dissection::new(&data, number);
    match link {
        LinkType::Ethernet => dissection.ethernet(),
        LinkType::LinuxSll => dissection.linux_sll(),
        LinkType::LinuxSll2 => dissection.linux_sll2(),
        LinkType::Other(_) => {}
    }
    dissection.finish();

    let Dissection { layers, source, destination, protocol, summary, .. } = dissection;
    let hexdump = dump(&data).collect();

    DecodedPacket {
        data,
        layers,
        hexdump,
        source,
        destination,
        protocol,
        summary,
        timestamp,
        number,
    }
}

struct Dissection<'a> {
    bytes: &'a [u8],
    number: u64,
    cursor: usize,
    layers: Vec<Layer>,
    source: String,
    destination: String,
    protocol: &'static str,
    summary: String,
}

impl<'a> Dissection<'a> {
    fn new(bytes: &'a [u8], number: u64) -> Self {
        Dissection {
            bytes,
            number,
            cursor: 0,
            layers: Vec::new(),
            source: String::new(),
            destination: String::new(),
            protocol: RAW_LABEL,
            summary: format!("{} bytes", bytes.len()),
        }
    }

    /// Parses a header of kind `H` at the cursor. On failure the cursor stays put.
    fn parse<H: HeaderView>(&self) -> Option<H> {
        match H::parse(&self.bytes[self.cursor..]) {
            Ok(header) => Some(header),
            Err(err) => {
                debug!(frame = self.number, offset = self.cursor, %err, "dissection stopped");
                None
            }
        }
    }

    fn push(&mut self, len: usize, kind: LayerKind) {
        debug_assert!(self.cursor + len <= self.bytes.len());
        let layer = Layer {
            span: self.cursor..self.cursor + len,
            kind,
        };
        if !matches!(layer.kind, LayerKind::Opaque) {
            self.protocol = layer.name();
        }
        self.cursor += len;
        self.layers.push(layer);
    }

    fn ethernet(&mut self) {
        let Some(eth) = self.parse::<EthernetHeader>() else {
            return;
        };
        self.source = format_mac(&eth.source);
        self.destination = format_mac(&eth.destination);
        self.summary = format!("Ethernet packet.type=0x{:04x}", eth.ether_type);
        self.push(eth.header_len(), LayerKind::Ethernet(eth));
        self.network_layer(eth.ether_type);
    }

    /// Cooked headers carry only the sender's link address.
    fn linux_sll(&mut self) {
        let Some(sll) = self.parse::<SllHeader>() else {
            return;
        };
        let protocol = sll.protocol;
        self.source = format_mac(&sll.address);
        self.summary = format!("Linux cooked packet.type=0x{protocol:04x}");
        self.push(sll.header_len(), LayerKind::LinuxSll(sll));
        self.network_layer(protocol);
    }

    fn linux_sll2(&mut self) {
        let Some(sll) = self.parse::<Sll2Header>() else {
            return;
        };
        let protocol = sll.protocol;
        self.source = format_mac(&sll.address);
        self.summary = format!("Linux cooked packet.type=0x{protocol:04x}");
        self.push(sll.header_len(), LayerKind::LinuxSll2(sll));
        self.network_layer(protocol);
    }

    fn network_layer(&mut self, ether_type: u16) {
        match ether_type {
            ETHERTYPE_IPV4 => self.ipv4(),
            // Recognised only: nothing is consumed and the addresses stay as
            // the link layer left them.
            ETHERTYPE_IPV6 => self.push(0, LayerKind::Ipv6),
            ETHERTYPE_ARP => self.arp(),
            _ => {}
        }
    }

    fn ipv4(&mut self) {
        let Some(ip) = self.parse::<Ipv4Header>() else {
            return;
        };
        self.source = ip.source.to_string();
        self.destination = ip.destination.to_string();
        self.summary = format!("protocol={}", ip.protocol);
        self.push(ip.header_len(), LayerKind::Ipv4(ip));

        match ip.protocol {
            IPPROTO_ICMP => self.icmp(),
            IPPROTO_UDP => self.udp(),
            IPPROTO_TCP => self.tcp(),
            _ => {}
        }
    }

    fn arp(&mut self) {
        let Some(arp) = self.parse::<ArpHeader>() else {
            return;
        };
        self.summary = arp.summary();
        self.push(arp.header_len(), LayerKind::Arp(arp));
    }

    fn icmp(&mut self) {
        let Some(icmp) = self.parse::<IcmpHeader>() else {
            return;
        };
        self.summary = format!("type={} code={}", icmp.icmp_type, icmp.code);
        self.push(icmp.header_len(), LayerKind::Icmp(icmp));
    }

    fn udp(&mut self) {
        let Some(udp) = self.parse::<UdpHeader>() else {
            return;
        };
        self.summary = format!("{} -> {}", udp.source_port, udp.destination_port);
        self.push(udp.header_len(), LayerKind::Udp(udp));
    }

    fn tcp(&mut self) {
        let Some(tcp) = self.parse::<TcpHeader>() else {
            return;
        };
        self.summary = format!("{} -> {}", tcp.source_port, tcp.destination_port);
        self.push(tcp.header_len(), LayerKind::Tcp(tcp));
    }

    fn finish(&mut self) {
        let remaining = self.bytes.len() - self.cursor;
        if remaining > 0 {
            self.push(remaining, LayerKind::Opaque);
        }
    }
}
