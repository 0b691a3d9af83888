//! Clock scenario: one render per tick while mounted, none after unmount

mod common;

use trellis_core::{LifecycleState, PropValue};
use trellis_widgets::prelude::*;

#[test]
fn three_ticks_three_renders_then_silence() {
    let h = common::harness();
    let page = h.runtime.mount_root(column().child(clock(1))).unwrap();
    let clock_id = h.runtime.inspect(|tree| tree.find_by_kind("clock")[0]);
    h.renderer.clear();

    h.runtime.advance(3);

    let patches = h.renderer.take();
    assert_eq!(patches.len(), 3);
    for (i, patch) in patches.iter().enumerate() {
        assert_eq!(patch.changes.keys().copied().collect::<Vec<_>>(), vec![clock_id]);
        assert_eq!(patch.changes[&clock_id].len(), 1);
        assert_eq!(
            patch.changes[&clock_id]["text"],
            PropValue::from(format!("tick {}", i + 1))
        );
        assert!(patch.added.is_empty());
    }
    assert_eq!(
        h.runtime.inspect(|tree| tree.coordinator().last_chain().to_vec()),
        vec![clock_id]
    );

    h.runtime
        .with_tree(|tree| tree.remove_child(page, clock_id))
        .unwrap();
    assert_eq!(
        h.runtime.inspect(|tree| tree.state(clock_id)),
        Some(LifecycleState::Disposed)
    );
    h.renderer.clear();

    h.runtime.advance(3);
    assert!(h.renderer.is_empty());
    assert_eq!(h.runtime.stats().tasks.live, 0);
}

#[test]
fn slower_clock_renders_on_its_interval() {
    let h = common::harness();
    h.runtime.mount_root(clock(2)).unwrap();
    h.renderer.clear();

    h.runtime.advance(6);
    assert_eq!(h.renderer.len(), 3);
}
