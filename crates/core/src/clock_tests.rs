// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;

#[test]
fn new_clock_starts_at_zero() {
    let clock = LamportClock::new(PeerId(3));
    assert_eq!(clock.now(), 0);
    assert_eq!(clock.owner(), PeerId(3));
}

#[test]
fn increment_advances_by_one() {
    let clock = LamportClock::new(PeerId(0));
    assert_eq!(clock.increment(), 1);
    assert_eq!(clock.increment(), 2);
    assert_eq!(clock.now(), 2);
}

#[test]
fn merge_takes_max_without_advancing() {
    let clock = LamportClock::starting_at(PeerId(0), 4);
    assert_eq!(clock.merge(9), 9);
    assert_eq!(clock.merge(2), 9);
}

#[test]
fn observe_applies_receive_rule() {
    let clock = LamportClock::starting_at(PeerId(0), 4);

    // Foreign ahead: jump past it
    assert_eq!(clock.observe(10), 11);
    // Foreign behind: still advance locally
    assert_eq!(clock.observe(3), 12);
}

#[test]
fn clock_is_non_decreasing_under_concurrent_use() {
    let clock = Arc::new(LamportClock::new(PeerId(1)));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let clock = Arc::clone(&clock);
            std::thread::spawn(move || {
                let mut last = 0;
                for n in 0..500 {
                    let value = if n % 2 == 0 {
                        clock.increment()
                    } else {
                        clock.observe(n * i)
                    };
                    assert!(value > last);
                    last = value;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Every call advanced the clock at least once
    assert!(clock.now() >= 2000);
}
