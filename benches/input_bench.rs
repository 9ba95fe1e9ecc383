// Input Benchmarks
// Mapping reads, hotkey edge detection and binding string codec

use criterion::{criterion_group, criterion_main, Criterion};
use emu_front::input::binding::{format_assignments, parse_assignments};
use emu_front::input::hid::keyboard;
use emu_front::input::keyboard::KEYBOARD_ID;
use emu_front::input::virtual_port::KEYBOARD_KEYS;
use emu_front::input::{
    Assignment, BindTarget, HidDevice, InputConfig, InputManager, MappingId, PadControl,
    Qualifier, ScriptHandle, ScriptedDriver,
};
use std::hint::black_box;
use std::sync::Arc;

fn key(name: &str) -> u32 {
    KEYBOARD_KEYS.iter().position(|k| *k == name).unwrap() as u32
}

/// Manager with a keyboard plugged in and the default bindings applied
fn manager() -> (InputManager, ScriptHandle) {
    let (driver, handle) = ScriptedDriver::new();
    handle.connect(Arc::new(HidDevice::keyboard(KEYBOARD_ID, "Keyboard", KEYBOARD_KEYS)));
    let manager = InputManager::new(Box::new(driver));
    manager.poll(true);
    InputConfig::new().apply(&manager);
    (manager, handle)
}

fn bench_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping");
    let (manager, handle) = manager();
    let up = BindTarget::Port(MappingId::pad(0, PadControl::Up));

    group.bench_function("value_released", |b| {
        b.iter(|| black_box(manager.value(black_box(up))));
    });

    handle.set(KEYBOARD_ID, keyboard::BUTTON, key("Up"), 1);
    manager.poll(true);
    group.bench_function("value_pressed", |b| {
        b.iter(|| black_box(manager.value(black_box(up))));
    });

    group.bench_function("all_pad_controls", |b| {
        b.iter(|| {
            PadControl::ALL
                .iter()
                .map(|&control| manager.value(BindTarget::Port(MappingId::pad(0, control))) as i32)
                .sum::<i32>()
        });
    });

    group.finish();
}

fn bench_hotkeys(c: &mut Criterion) {
    let (manager, handle) = manager();
    let mut pressed = false;

    c.bench_function("poll_hotkeys_toggle", |b| {
        b.iter(|| {
            pressed = !pressed;
            handle.set(KEYBOARD_ID, keyboard::BUTTON, key("P"), pressed as i16);
            black_box(manager.poll_hotkeys())
        });
    });
}

fn bench_binding_codec(c: &mut Criterion) {
    let encoded = format_assignments(&[
        Some(Assignment::new(KEYBOARD_ID, keyboard::BUTTON, key("Z"), Qualifier::None)),
        Some(Assignment::new(0x2a, 0, 1, Qualifier::Hi)),
        Some(Assignment::new(0x2a, 3, 0, Qualifier::Rumble)),
    ]);

    c.bench_function("parse_assignments", |b| {
        b.iter(|| black_box(parse_assignments(black_box(&encoded))));
    });
}

criterion_group!(benches, bench_mapping, bench_hotkeys, bench_binding_codec);
criterion_main!(benches);
