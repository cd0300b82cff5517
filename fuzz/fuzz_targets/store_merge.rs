//! Fuzz target for store patch merging and notification
//!
//! # Strategy
//!
//! - Random partial patches over every `CastState` field
//! - Selector over `is_casting` and a whole-state listener observing each
//!   update
//!
//! # Invariants
//!
//! - Fields absent from a patch are untouched
//! - Fields present in a patch take the patched value
//! - Whole-state listeners fire once per update
//! - The selector fires exactly when its projection changes

#![no_main]

use std::{cell::Cell, rc::Rc};

use arbitrary::Arbitrary;
use castlink_core::{CastDevice, CastError, CastState, CastStatePatch, Mergeable, Selector, Store};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct PatchInput {
    available: Option<bool>,
    casting: Option<bool>,
    connecting: Option<bool>,
    scanning: Option<bool>,
    device_name: Option<Option<u8>>,
    device_id: Option<Option<u8>>,
    session_id: Option<Option<u8>>,
    devices: Option<Vec<(u8, bool)>>,
    error: Option<Option<u8>>,
}

fn label(prefix: &str, n: u8) -> String {
    format!("{prefix}-{}", n % 4)
}

impl PatchInput {
    fn to_patch(&self) -> CastStatePatch {
        let mut patch = CastStatePatch::new();
        if let Some(v) = self.available {
            patch = patch.available(v);
        }
        if let Some(v) = self.casting {
            patch = patch.casting(v);
        }
        if let Some(v) = self.connecting {
            patch = patch.connecting(v);
        }
        if let Some(v) = self.scanning {
            patch = patch.scanning(v);
        }
        if let Some(v) = self.device_name {
            patch = patch.device_name(v.map(|n| label("name", n)));
        }
        if let Some(v) = self.device_id {
            patch = patch.device_id(v.map(|n| label("device", n)));
        }
        if let Some(v) = self.session_id {
            patch = patch.session_id(v.map(|n| label("session", n)));
        }
        if let Some(devices) = &self.devices {
            let devices = devices
                .iter()
                .map(|(n, connected)| CastDevice {
                    is_connected: *connected,
                    ..CastDevice::new(label("device", *n), label("name", *n), "chromecast")
                })
                .collect();
            patch = patch.devices(devices);
        }
        if let Some(v) = self.error {
            patch = patch.error(v.map(|n| CastError::new(label("CODE", n), "fuzz")));
        }
        patch
    }
}

/// Apply `input` by hand, field by field.
fn expected(before: &CastState, input: &PatchInput) -> CastState {
    let patched = {
        let mut state = CastState::default();
        state.merge(input.to_patch());
        state
    };
    CastState {
        is_available: input.available.map_or(before.is_available, |_| patched.is_available),
        is_casting: input.casting.map_or(before.is_casting, |_| patched.is_casting),
        is_connecting: input.connecting.map_or(before.is_connecting, |_| patched.is_connecting),
        is_scanning: input.scanning.map_or(before.is_scanning, |_| patched.is_scanning),
        device_name: input.device_name.map_or(before.device_name.clone(), |_| patched.device_name.clone()),
        device_id: input.device_id.map_or(before.device_id.clone(), |_| patched.device_id.clone()),
        session_id: input.session_id.map_or(before.session_id.clone(), |_| patched.session_id.clone()),
        devices: if input.devices.is_some() { patched.devices.clone() } else { before.devices.clone() },
        error: if input.error.is_some() { patched.error.clone() } else { before.error.clone() },
    }
}

fuzz_target!(|patches: Vec<PatchInput>| {
    let store = Store::new(CastState::default());
    let updates = Rc::new(Cell::new(0usize));
    let changes = Rc::new(Cell::new(0usize));

    let counter = Rc::clone(&updates);
    let _all = store.subscribe(move |_| counter.set(counter.get() + 1));
    let counter = Rc::clone(&changes);
    let casting = Selector::new(|s: &CastState| s.is_casting);
    let _casting = store.select(&casting, move |_| counter.set(counter.get() + 1));

    let mut expected_changes = 0;
    for (i, input) in patches.iter().enumerate() {
        let before = store.get_state();
        store.set_state(input.to_patch());
        let after = store.get_state();

        assert_eq!(after, expected(&before, input));
        assert_eq!(updates.get(), i + 1);

        if before.is_casting != after.is_casting {
            expected_changes += 1;
        }
        assert_eq!(changes.get(), expected_changes);
    }
});
