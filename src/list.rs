//! Scrollable packet list: a cursor plus the first visible row.

use crate::model::DecodedPacket;

#[derive(Debug)]
pub struct PacketListModel {
    packets: Vec<DecodedPacket>,
    cursor: usize,
    window_start: usize,
    visible_height: usize,
}

impl PacketListModel {
    /// `visible_height` is clamped to at least one row.
    pub fn new(visible_height: usize) -> Self {
        PacketListModel {
            packets: Vec::new(),
            cursor: 0,
            window_start: 0,
            visible_height: visible_height.max(1),
        }
    }

    /// Appends a fully decoded packet. Existing entries never move.
    pub fn push(&mut self, packet: DecodedPacket) {
        self.packets.push(packet);
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn window_start(&self) -> usize {
        self.window_start
    }

    pub fn visible_height(&self) -> usize {
        self.visible_height
    }

    pub fn packets(&self) -> &[DecodedPacket] {
        &self.packets
    }

    pub fn selected(&self) -> Option<&DecodedPacket> {
        self.packets.get(self.cursor)
    }

    /// Packets inside the visible window, first visible row first.
    pub fn visible(&self) -> &[DecodedPacket] {
        let start = self.window_start.min(self.packets.len());
        let end = (self.window_start + self.visible_height).min(self.packets.len());
        &self.packets[start..end]
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 >= self.packets.len() {
            return;
        }
        if self.cursor - self.window_start + 2 > self.visible_height {
            self.window_start += 1;
        }
        self.cursor += 1;
    }

    pub fn move_up(&mut self) {
        if self.cursor == 0 {
            return;
        }
        if self.cursor - 1 < self.window_start {
            self.window_start -= 1;
        }
        self.cursor -= 1;
    }

    /// Changes the number of visible rows, scrolling forward if the cursor
    /// would otherwise fall below the window.
    pub fn set_visible_height(&mut self, visible_height: usize) {
        self.visible_height = visible_height.max(1);
        if self.cursor - self.window_start >= self.visible_height {
            self.window_start = self.cursor + 1 - self.visible_height;
        }
    }
}
