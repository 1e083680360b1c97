//! Three stacked panes: packet list, layer details, raw bytes.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::list::PacketListModel;
use crate::model::DecodedPacket;

const LIST_HEADER: &str =
    "  No. Time          Source               Destination          Proto    Len Info";

fn protocol_color(protocol: &str) -> Color {
    match protocol {
        "TCP" => Color::Magenta,
        "UDP" => Color::Blue,
        "ICMP" => Color::Green,
        "ARP" => Color::Yellow,
        "IPv4" | "IPv6" => Color::Cyan,
        _ => Color::Gray,
    }
}

/// Rows available for packets in a list pane of `area`: borders and the
/// column header take three.
pub fn list_rows(area: Rect) -> usize {
    usize::from(area.height.saturating_sub(3))
}

pub fn draw(f: &mut Frame, model: &mut PacketListModel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(25),
            Constraint::Percentage(30),
        ])
        .split(f.size());

    model.set_visible_height(list_rows(chunks[0]));
    draw_list(f, chunks[0], model);

    let selected = model.selected();
    f.render_widget(detail_pane(selected), chunks[1]);
    f.render_widget(binary_pane(selected), chunks[2]);
}

fn draw_list(f: &mut Frame, area: Rect, model: &PacketListModel) {
    let mut lines = vec![Line::from(Span::styled(
        LIST_HEADER,
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    for (row, packet) in model.visible().iter().enumerate() {
        let mut style = Style::default().fg(protocol_color(packet.protocol()));
        if model.window_start() + row == model.cursor() {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(Span::styled(packet.to_string(), style)));
    }

    let title = format!(" Packets ({}) ", model.len());
    let list = Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(list, area);
}

fn detail_pane(packet: Option<&DecodedPacket>) -> Paragraph<'static> {
    let mut lines = Vec::new();
    if let Some(packet) = packet {
        for layer in packet.layers() {
            lines.push(Line::from(Span::styled(
                layer.title(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for (name, value) in layer.fields() {
                lines.push(Line::from(format!("    {name}: {value}")));
            }
        }
    }
    Paragraph::new(lines).block(Block::default().title(" Details ").borders(Borders::ALL))
}

fn binary_pane(packet: Option<&DecodedPacket>) -> Paragraph<'static> {
    let lines: Vec<Line> = packet
        .map(|p| p.hexdump().iter().map(|l| Line::from(l.to_string())).collect())
        .unwrap_or_default();
    Paragraph::new(lines).block(Block::default().title(" Binary ").borders(Borders::ALL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::decode;
    use crate::model::RawFrame;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn draw_sizes_the_list_window() {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let mut model = PacketListModel::new(100);
        for n in 1..=30 {
            model.push(decode(RawFrame::new(vec![0xab; 20], n, n)));
        }

        terminal.draw(|f| draw(f, &mut model)).unwrap();

        // 45% of 40 rows is 18, minus borders and header.
        assert_eq!(model.visible_height(), 15);
        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Packets (30)"));
        assert!(rendered.contains(" 0000    ab ab"));
    }
}
