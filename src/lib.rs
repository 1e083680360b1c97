//! Packet dissection and list navigation for a terminal packet viewer.
//!
//! [`dissect::decode`] turns a [`model::RawFrame`] into a [`model::DecodedPacket`]
//! holding the frame bytes, the recognised layers, addressing and summary text,
//! and a hex dump. [`list::PacketListModel`] keeps the decoded packets in
//! arrival order together with a cursor and a scroll window.

pub mod dissect;
pub mod headers;
pub mod hexdump;
pub mod list;
pub mod model;
pub mod network;
pub mod ui;

pub use dissect::{decode, decode_link, LinkType};
pub use list::PacketListModel;
pub use model::{DecodedPacket, Layer, LayerKind, RawFrame};
