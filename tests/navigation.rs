use framescope::{decode, PacketListModel, RawFrame};
use proptest::{collection::vec, prelude::*};

fn filled(visible_height: usize, count: usize) -> PacketListModel {
    let mut model = PacketListModel::new(visible_height);
    for n in 0..count {
        let n = n as u64;
        model.push(decode(RawFrame::new(vec![0x11; 60], n * 1000, n + 1)));
    }
    model
}

#[test]
fn scroll_after_window_fills() {
    let mut model = filled(5, 10);
    for _ in 0..6 {
        model.move_down();
    }
    assert_eq!(model.cursor(), 6);
    assert_eq!(model.window_start(), 2);
}

#[test]
fn packets_arriving_later_become_reachable() {
    let mut model = filled(5, 2);
    model.move_down();
    model.move_down();
    assert_eq!(model.cursor(), 1);

    model.push(decode(RawFrame::new(vec![0x22; 60], 5000, 3)));
    model.move_down();
    assert_eq!(model.cursor(), 2);
    assert_eq!(model.selected().unwrap().number(), 3);
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Up,
    Down,
    Resize(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Up),
        4 => Just(Op::Down),
        1 => (0usize..12).prop_map(Op::Resize),
    ]
}

proptest! {
    #[test]
    fn window_always_contains_cursor(
        height in 1usize..12,
        count in 1usize..40,
        ops in vec(op(), 0..200),
    ) {
        let mut model = filled(height, count);
        for op in ops {
            match op {
                Op::Up => model.move_up(),
                Op::Down => model.move_down(),
                Op::Resize(h) => model.set_visible_height(h),
            }
            prop_assert!(model.window_start() <= model.cursor());
            prop_assert!(model.cursor() < model.len());
            prop_assert!(model.cursor() - model.window_start() < model.visible_height());
            prop_assert!(model.visible().len() <= model.visible_height());
        }
    }
}
