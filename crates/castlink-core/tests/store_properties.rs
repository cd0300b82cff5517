//! Property-based tests for the observable store.

use std::{cell::RefCell, rc::Rc};

use castlink_core::{CastDevice, CastState, CastStatePatch, Selector, Store};
use proptest::prelude::*;

fn arbitrary_patch() -> impl Strategy<Value = CastStatePatch> {
    (
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
        proptest::option::of(proptest::option::of("[a-c]")),
        proptest::option::of(prop::collection::vec("[a-c]", 0..3)),
    )
        .prop_map(|(available, scanning, device_id, device_ids)| CastStatePatch {
            is_available: available,
            is_scanning: scanning,
            device_id,
            devices: device_ids.map(|ids| {
                ids.into_iter().map(|id| CastDevice::new(id.clone(), id, "chromecast")).collect()
            }),
            ..CastStatePatch::default()
        })
}

proptest! {
    #[test]
    fn prop_selector_fires_exactly_on_projection_change(
        patches in prop::collection::vec(arbitrary_patch(), 0..40),
    ) {
        let store = Store::new(CastState::default());
        let selector = Selector::new(|s: &CastState| (s.device_id.clone(), s.devices.len()));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = store.select(&selector, move |v| sink.borrow_mut().push(v.clone()));

        let mut expected = Vec::new();
        let mut last = store.select_now(&selector);
        for patch in patches {
            store.set_state(patch);
            let now = store.select_now(&selector);
            if now != last {
                expected.push(now.clone());
                last = now;
            }
        }

        // PROPERTY: one notification per distinct consecutive projection
        prop_assert_eq!(&*seen.borrow(), &expected);
    }

    #[test]
    fn prop_whole_state_listener_sees_every_update(
        patches in prop::collection::vec(arbitrary_patch(), 0..40),
    ) {
        let store = Store::new(CastState::default());
        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&snapshots);
        let _sub = store.subscribe(move |s| sink.borrow_mut().push(s.clone()));

        let count = patches.len();
        for patch in patches {
            store.set_state(patch);
        }

        prop_assert_eq!(snapshots.borrow().len(), count);
        if let Some(last) = snapshots.borrow().last() {
            prop_assert_eq!(last, &store.get_state());
        }
    }
}
