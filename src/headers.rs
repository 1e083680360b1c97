//! Protocol header views.
//!
//! Every view checks that enough bytes are available before reading anything,
//! so a short buffer turns into a `HeaderError` instead of an out-of-bounds read.
//! The views copy the fields they need out of the buffer; they never borrow it.

use std::fmt;
use std::net::Ipv4Addr;

use etherparse::{
    Ethernet2HeaderSlice, Icmpv4Header, Icmpv4Slice, Ipv4HeaderSlice, TcpHeaderSlice,
    UdpHeaderSlice,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("{protocol} header truncated: {required} bytes required, {available} available")]
    Truncated {
        protocol: &'static str,
        required: usize,
        available: usize,
    },
    #[error("malformed {protocol} header: {reason}")]
    Malformed {
        protocol: &'static str,
        reason: String,
    },
}

/// A parsed protocol header at the start of a byte slice.
pub trait HeaderView: Sized {
    /// Short protocol name, also used as the packet's protocol label.
    const NAME: &'static str;
    /// Fewest bytes a header of this kind can occupy.
    const MIN_LEN: usize;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError>;

    /// Bytes consumed by this header. Never more than were handed to `parse`.
    fn header_len(&self) -> usize;

    /// Name/value pairs shown in the detail pane.
    fn fields(&self) -> Vec<(&'static str, String)>;
}

fn ensure_len<H: HeaderView>(bytes: &[u8], required: usize) -> Result<(), HeaderError> {
    if bytes.len() < required {
        return Err(HeaderError::Truncated {
            protocol: H::NAME,
            required,
            available: bytes.len(),
        });
    }
    Ok(())
}

fn malformed<H: HeaderView>(err: impl fmt::Display) -> HeaderError {
    HeaderError::Malformed {
        protocol: H::NAME,
        reason: err.to_string(),
    }
}

/// Colon separated lowercase hardware address.
pub fn format_mac(mac: &[u8]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: [u8; 6],
    pub source: [u8; 6],
    pub ether_type: u16,
}

impl HeaderView for EthernetHeader {
    const NAME: &'static str = "Ether";
    const MIN_LEN: usize = 14;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        ensure_len::<Self>(bytes, Self::MIN_LEN)?;
        let slice = Ethernet2HeaderSlice::from_slice(bytes).map_err(malformed::<Self>)?;
        Ok(EthernetHeader {
            destination: slice.destination(),
            source: slice.source(),
            ether_type: slice.ether_type().0,
        })
    }

    fn header_len(&self) -> usize {
        Self::MIN_LEN
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dst", format_mac(&self.destination)),
            ("src", format_mac(&self.source)),
            ("type", format!("0x{:04x}", self.ether_type)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub header_len: usize,
    pub total_len: u16,
    pub identification: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl HeaderView for Ipv4Header {
    const NAME: &'static str = "IPv4";
    const MIN_LEN: usize = 20;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        ensure_len::<Self>(bytes, Self::MIN_LEN)?;
        // IHL counts 32-bit words; options make the header longer than the minimum.
        let ihl_len = usize::from(bytes[0] & 0x0f) * 4;
        if ihl_len >= Self::MIN_LEN {
            ensure_len::<Self>(bytes, ihl_len)?;
        }
        let slice = Ipv4HeaderSlice::from_slice(bytes).map_err(malformed::<Self>)?;
        Ok(Ipv4Header {
            header_len: slice.slice().len(),
            total_len: slice.total_len(),
            identification: slice.identification(),
            ttl: slice.ttl(),
            protocol: slice.protocol().0,
            source: slice.source_addr(),
            destination: slice.destination_addr(),
        })
    }

    fn header_len(&self) -> usize {
        self.header_len
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("src", self.source.to_string()),
            ("dst", self.destination.to_string()),
            ("protocol", self.protocol.to_string()),
            ("ttl", self.ttl.to_string()),
            ("total_len", self.total_len.to_string()),
            ("id", format!("0x{:04x}", self.identification)),
            ("header_len", self.header_len.to_string()),
        ]
    }
}

/// Linux cooked capture header (`LINKTYPE_LINUX_SLL`), what `dumpcap -i any` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SllHeader {
    pub packet_type: u16,
    pub arphrd_type: u16,
    /// Link-layer source address, at most eight bytes.
    pub address: Vec<u8>,
    pub protocol: u16,
}

impl HeaderView for SllHeader {
    const NAME: &'static str = "SLL";
    const MIN_LEN: usize = 16;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        ensure_len::<Self>(bytes, Self::MIN_LEN)?;
        let addr_len = usize::from(u16::from_be_bytes([bytes[4], bytes[5]])).min(8);
        Ok(SllHeader {
            packet_type: u16::from_be_bytes([bytes[0], bytes[1]]),
            arphrd_type: u16::from_be_bytes([bytes[2], bytes[3]]),
            address: bytes[6..6 + addr_len].to_vec(),
            protocol: u16::from_be_bytes([bytes[14], bytes[15]]),
        })
    }

    fn header_len(&self) -> usize {
        Self::MIN_LEN
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("packet_type", self.packet_type.to_string()),
            ("arphrd", self.arphrd_type.to_string()),
            ("src", format_mac(&self.address)),
            ("protocol", format!("0x{:04x}", self.protocol)),
        ]
    }
}

/// Second version of the Linux cooked header (`LINKTYPE_LINUX_SLL2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sll2Header {
    pub protocol: u16,
    pub interface_index: u32,
    pub arphrd_type: u16,
    pub packet_type: u8,
    pub address: Vec<u8>,
}

impl HeaderView for Sll2Header {
    const NAME: &'static str = "SLL2";
    const MIN_LEN: usize = 20;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        ensure_len::<Self>(bytes, Self::MIN_LEN)?;
        let addr_len = usize::from(bytes[11]).min(8);
        Ok(Sll2Header {
            protocol: u16::from_be_bytes([bytes[0], bytes[1]]),
            interface_index: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            arphrd_type: u16::from_be_bytes([bytes[8], bytes[9]]),
            packet_type: bytes[10],
            address: bytes[12..12 + addr_len].to_vec(),
        })
    }

    fn header_len(&self) -> usize {
        Self::MIN_LEN
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("protocol", format!("0x{:04x}", self.protocol)),
            ("ifindex", self.interface_index.to_string()),
            ("arphrd", self.arphrd_type.to_string()),
            ("packet_type", self.packet_type.to_string()),
            ("src", format_mac(&self.address)),
        ]
    }
}

pub const ARP_REQUEST: u16 = 1;
pub const ARP_REPLY: u16 = 2;

/// ARP header. Hardware and protocol addresses are kept raw because their
/// sizes come from the header itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpHeader {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub operation: u16,
    pub sender_hw: Vec<u8>,
    pub sender_proto: Vec<u8>,
    pub target_hw: Vec<u8>,
    pub target_proto: Vec<u8>,
}

impl ArpHeader {
    fn format_proto(addr: &[u8]) -> String {
        match <[u8; 4]>::try_from(addr) {
            Ok(ip) => Ipv4Addr::from(ip).to_string(),
            Err(_) => addr.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(""),
        }
    }

    pub fn sender_hw_string(&self) -> String {
        format_mac(&self.sender_hw)
    }

    pub fn sender_proto_string(&self) -> String {
        Self::format_proto(&self.sender_proto)
    }

    pub fn target_proto_string(&self) -> String {
        Self::format_proto(&self.target_proto)
    }

    /// One line in the style of tcpdump.
    pub fn summary(&self) -> String {
        match self.operation {
            ARP_REQUEST => format!(
                "who-has {} tell {}",
                self.target_proto_string(),
                self.sender_proto_string()
            ),
            ARP_REPLY => format!(
                "{} is-at {}",
                self.sender_proto_string(),
                self.sender_hw_string()
            ),
            op => format!("opcode={op}"),
        }
    }
}

impl HeaderView for ArpHeader {
    const NAME: &'static str = "ARP";
    const MIN_LEN: usize = 8;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        ensure_len::<Self>(bytes, Self::MIN_LEN)?;
        let hlen = usize::from(bytes[4]);
        let plen = usize::from(bytes[5]);
        let required = Self::MIN_LEN + 2 * hlen + 2 * plen;
        ensure_len::<Self>(bytes, required)?;

        let mut at = Self::MIN_LEN;
        let mut take = |n: usize| {
            let field = bytes[at..at + n].to_vec();
            at += n;
            field
        };
        let sender_hw = take(hlen);
        let sender_proto = take(plen);
        let target_hw = take(hlen);
        let target_proto = take(plen);

        Ok(ArpHeader {
            hardware_type: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_type: u16::from_be_bytes([bytes[2], bytes[3]]),
            operation: u16::from_be_bytes([bytes[6], bytes[7]]),
            sender_hw,
            sender_proto,
            target_hw,
            target_proto,
        })
    }

    fn header_len(&self) -> usize {
        Self::MIN_LEN + 2 * self.sender_hw.len() + 2 * self.sender_proto.len()
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("htype", self.hardware_type.to_string()),
            ("ptype", format!("0x{:04x}", self.protocol_type)),
            ("op", self.operation.to_string()),
            ("sender_hw", self.sender_hw_string()),
            ("sender_ip", self.sender_proto_string()),
            ("target_hw", format_mac(&self.target_hw)),
            ("target_ip", self.target_proto_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub header_len: usize,
}

impl HeaderView for IcmpHeader {
    const NAME: &'static str = "ICMP";
    const MIN_LEN: usize = 8;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        ensure_len::<Self>(bytes, Self::MIN_LEN)?;
        let slice = Icmpv4Slice::from_slice(bytes).map_err(malformed::<Self>)?;
        let (header, _rest) = Icmpv4Header::from_slice(bytes).map_err(malformed::<Self>)?;
        Ok(IcmpHeader {
            icmp_type: slice.type_u8(),
            code: slice.code_u8(),
            checksum: slice.checksum(),
            header_len: header.header_len(),
        })
    }

    fn header_len(&self) -> usize {
        self.header_len
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("type", self.icmp_type.to_string()),
            ("code", self.code.to_string()),
            ("checksum", format!("0x{:04x}", self.checksum)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl HeaderView for UdpHeader {
    const NAME: &'static str = "UDP";
    const MIN_LEN: usize = 8;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        ensure_len::<Self>(bytes, Self::MIN_LEN)?;
        let slice = UdpHeaderSlice::from_slice(bytes).map_err(malformed::<Self>)?;
        Ok(UdpHeader {
            source_port: slice.source_port(),
            destination_port: slice.destination_port(),
            length: slice.length(),
            checksum: slice.checksum(),
        })
    }

    fn header_len(&self) -> usize {
        Self::MIN_LEN
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("src_port", self.source_port.to_string()),
            ("dst_port", self.destination_port.to_string()),
            ("length", self.length.to_string()),
            ("checksum", format!("0x{:04x}", self.checksum)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence_number: u32,
    pub acknowledgment_number: u32,
    pub flags: u8,
    pub window_size: u16,
    pub header_len: usize,
}

impl TcpHeader {
    /// Flag letters in tcpdump order, e.g. `S.` for SYN+ACK.
    pub fn flag_string(&self) -> String {
        const NAMES: [(u8, char); 6] = [
            (0x02, 'S'),
            (0x01, 'F'),
            (0x04, 'R'),
            (0x08, 'P'),
            (0x20, 'U'),
            (0x10, '.'),
        ];
        NAMES
            .iter()
            .filter(|(bit, _)| self.flags & bit != 0)
            .map(|(_, c)| *c)
            .collect()
    }
}

impl HeaderView for TcpHeader {
    const NAME: &'static str = "TCP";
    const MIN_LEN: usize = 20;

    fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        ensure_len::<Self>(bytes, Self::MIN_LEN)?;
        let offset_len = usize::from(bytes[12] >> 4) * 4;
        if offset_len >= Self::MIN_LEN {
            ensure_len::<Self>(bytes, offset_len)?;
        }
        let slice = TcpHeaderSlice::from_slice(bytes).map_err(malformed::<Self>)?;
        Ok(TcpHeader {
            source_port: slice.source_port(),
            destination_port: slice.destination_port(),
            sequence_number: slice.sequence_number(),
            acknowledgment_number: slice.acknowledgment_number(),
            flags: bytes[13],
            window_size: slice.window_size(),
            header_len: slice.slice().len(),
        })
    }

    fn header_len(&self) -> usize {
        self.header_len
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("src_port", self.source_port.to_string()),
            ("dst_port", self.destination_port.to_string()),
            ("seq", self.sequence_number.to_string()),
            ("ack", self.acknowledgment_number.to_string()),
            ("flags", format!("[{}]", self.flag_string())),
            ("window", self.window_size.to_string()),
            ("header_len", self.header_len.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARP_REQUEST_BODY: &str = "0001080006040001\
        020000000001c0a80001\
        000000000000c0a80002";

    #[test]
    fn short_buffers_are_truncated_not_read() {
        assert_eq!(
            EthernetHeader::parse(&[0u8; 13]),
            Err(HeaderError::Truncated { protocol: "Ether", required: 14, available: 13 })
        );
        assert!(matches!(
            Ipv4Header::parse(&[0x45, 0, 0]),
            Err(HeaderError::Truncated { required: 20, available: 3, .. })
        ));
        assert!(matches!(UdpHeader::parse(&[]), Err(HeaderError::Truncated { .. })));
        assert!(matches!(IcmpHeader::parse(&[8, 0, 0]), Err(HeaderError::Truncated { .. })));
        assert!(matches!(TcpHeader::parse(&[0u8; 19]), Err(HeaderError::Truncated { .. })));
    }

    #[test]
    fn ipv4_options_must_fit() {
        // IHL of 6 words claims 24 bytes but only 20 are present.
        let mut bytes = [0u8; 20];
        bytes[0] = 0x46;
        assert!(matches!(
            Ipv4Header::parse(&bytes),
            Err(HeaderError::Truncated { required: 24, available: 20, .. })
        ));
    }

    #[test]
    fn ipv4_wrong_version_is_malformed() {
        let mut bytes = [0u8; 20];
        bytes[0] = 0x65;
        assert!(matches!(Ipv4Header::parse(&bytes), Err(HeaderError::Malformed { protocol: "IPv4", .. })));
    }

    #[test]
    fn ethernet_fields() {
        let mut bytes = vec![0xff; 6];
        bytes.extend_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        bytes.extend_from_slice(&[0x08, 0x06]);
        let eth = EthernetHeader::parse(&bytes).unwrap();
        assert_eq!(eth.ether_type, 0x0806);
        assert_eq!(format_mac(&eth.source), "02:00:00:00:00:01");
        assert_eq!(eth.header_len(), 14);
    }

    #[test]
    fn arp_request_summary() {
        let bytes: Vec<u8> = (0..ARP_REQUEST_BODY.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&ARP_REQUEST_BODY[i..i + 2], 16).unwrap())
            .collect();
        let arp = ArpHeader::parse(&bytes).unwrap();
        assert_eq!(arp.header_len(), 28);
        assert_eq!(arp.operation, ARP_REQUEST);
        assert_eq!(arp.summary(), "who-has 192.168.0.2 tell 192.168.0.1");
        assert_eq!(arp.sender_hw_string(), "02:00:00:00:00:01");
    }

    #[test]
    fn arp_address_lengths_bound_the_parse() {
        // hlen=6, plen=4 needs 28 bytes.
        let bytes: [u8; 10] = [0, 1, 8, 0, 6, 4, 0, 2, 0, 0];
        assert!(matches!(
            ArpHeader::parse(&bytes),
            Err(HeaderError::Truncated { required: 28, available: 10, .. })
        ));
    }

    #[test]
    fn icmp_echo_reply_fields() {
        let bytes = [0, 0, 0xff, 0xff, 0, 7, 0, 1, b'h', b'i'];
        let icmp = IcmpHeader::parse(&bytes).unwrap();
        assert_eq!((icmp.icmp_type, icmp.code), (0, 0));
        assert_eq!(icmp.checksum, 0xffff);
        assert_eq!(icmp.header_len(), 8);
    }

    #[test]
    fn icmp_unreachable_keeps_code() {
        let bytes = [3, 1, 0, 0, 0, 0, 0, 0];
        let icmp = IcmpHeader::parse(&bytes).unwrap();
        assert_eq!((icmp.icmp_type, icmp.code), (3, 1));
    }

    #[test]
    fn sll_header_fields() {
        let mut bytes = vec![0, 4, 0, 1, 0, 6, 0x02, 0, 0, 0, 0, 0x01, 0, 0];
        bytes.extend_from_slice(&[0x08, 0x00]);
        let sll = SllHeader::parse(&bytes).unwrap();
        assert_eq!(sll.protocol, 0x0800);
        assert_eq!(format_mac(&sll.address), "02:00:00:00:00:01");
        assert!(matches!(
            SllHeader::parse(&bytes[..15]),
            Err(HeaderError::Truncated { protocol: "SLL", required: 16, available: 15 })
        ));
    }

    #[test]
    fn sll2_header_fields() {
        let mut bytes = vec![0x86, 0xdd, 0, 0, 0, 0, 0, 3, 0, 1, 0, 6];
        bytes.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x09, 0, 0]);
        let sll2 = Sll2Header::parse(&bytes).unwrap();
        assert_eq!(sll2.protocol, 0x86dd);
        assert_eq!(sll2.interface_index, 3);
        assert_eq!(format_mac(&sll2.address), "02:00:00:00:00:09");
    }

    #[test]
    fn tcp_flag_letters() {
        let tcp = TcpHeader {
            source_port: 1,
            destination_port: 2,
            sequence_number: 0,
            acknowledgment_number: 0,
            flags: 0x12,
            window_size: 0,
            header_len: 20,
        };
        assert_eq!(tcp.flag_string(), "S.");
    }
}
