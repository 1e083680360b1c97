use std::fmt;
use std::ops::Range;

use crate::headers::{
    ArpHeader, EthernetHeader, HeaderView, IcmpHeader, Ipv4Header, Sll2Header, SllHeader,
    TcpHeader, UdpHeader,
};
use crate::hexdump::HexDumpLine;

/// One captured frame as handed over by the capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub data: Vec<u8>,
    /// Capture time in microseconds.
    pub timestamp: u64,
    /// Arrival order, assigned at ingest.
    pub number: u64,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, timestamp: u64, number: u64) -> Self {
        RawFrame { data, timestamp, number }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    Ethernet(EthernetHeader),
    LinuxSll(SllHeader),
    LinuxSll2(Sll2Header),
    Ipv4(Ipv4Header),
    /// Recognised by ethertype only; the header itself is not dissected.
    Ipv6,
    Arp(ArpHeader),
    Icmp(IcmpHeader),
    Udp(UdpHeader),
    Tcp(TcpHeader),
    /// Bytes left over once no further protocol is recognised.
    Opaque,
}

/// A recognised header, or the opaque remainder, and the bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub span: Range<usize>,
    pub kind: LayerKind,
}

impl Layer {
    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    pub fn name(&self) -> &'static str {
        match &self.kind {
            LayerKind::Ethernet(_) => EthernetHeader::NAME,
            LayerKind::LinuxSll(_) => SllHeader::NAME,
            LayerKind::LinuxSll2(_) => Sll2Header::NAME,
            LayerKind::Ipv4(_) => Ipv4Header::NAME,
            LayerKind::Ipv6 => "IPv6",
            LayerKind::Arp(_) => ArpHeader::NAME,
            LayerKind::Icmp(_) => IcmpHeader::NAME,
            LayerKind::Udp(_) => UdpHeader::NAME,
            LayerKind::Tcp(_) => TcpHeader::NAME,
            LayerKind::Opaque => "Binary",
        }
    }

    /// Heading for the detail pane.
    pub fn title(&self) -> String {
        format!(
            "{} [{}..{}] ({} bytes)",
            self.name(),
            self.span.start,
            self.span.end,
            self.len()
        )
    }

    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match &self.kind {
            LayerKind::Ethernet(h) => h.fields(),
            LayerKind::LinuxSll(h) => h.fields(),
            LayerKind::LinuxSll2(h) => h.fields(),
            LayerKind::Ipv4(h) => h.fields(),
            LayerKind::Ipv6 => vec![("note", "header not dissected".to_string())],
            LayerKind::Arp(h) => h.fields(),
            LayerKind::Icmp(h) => h.fields(),
            LayerKind::Udp(h) => h.fields(),
            LayerKind::Tcp(h) => h.fields(),
            LayerKind::Opaque => Vec::new(),
        }
    }
}

/// A frame after dissection. Built once by [`crate::dissect::decode`] and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct DecodedPacket {
    pub(crate) data: Vec<u8>,
    pub(crate) layers: Vec<Layer>,
    pub(crate) hexdump: Vec<HexDumpLine>,
    pub(crate) source: String,
    pub(crate) destination: String,
    pub(crate) protocol: &'static str,
    pub(crate) summary: String,
    pub(crate) timestamp: u64,
    pub(crate) number: u64,
}

impl DecodedPacket {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Outermost first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_bytes(&self, layer: &Layer) -> &[u8] {
        &self.data[layer.span.clone()]
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(Layer::name).collect()
    }

    pub fn hexdump(&self) -> &[HexDumpLine] {
        &self.hexdump
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Name of the deepest recognised protocol.
    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn number(&self) -> u64 {
        self.number
    }
}

impl fmt::Display for DecodedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:5} {:<13} {:<20} {:<20} {:<6} {:5} {}",
            self.number,
            self.timestamp,
            self.source,
            self.destination,
            self.protocol,
            self.len(),
            self.summary
        )
    }
}
