//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use crossbeam_channel::Receiver;
use std::time::{Duration, Instant};

/// Upper bound for anything a dispatch thread should finish
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Poll `condition` until it holds or the timeout expires
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + test_timeout();
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Receive exactly `count` items, failing the test on timeout
pub fn recv_n<T>(rx: &Receiver<T>, count: usize) -> Vec<T> {
    (0..count)
        .map(|i| {
            rx.recv_timeout(test_timeout())
                .unwrap_or_else(|_| panic!("timed out waiting for item {} of {}", i + 1, count))
        })
        .collect()
}

/// Assert nothing else arrives within a short grace period
pub fn assert_quiet<T: std::fmt::Debug>(rx: &Receiver<T>) {
    if let Ok(item) = rx.recv_timeout(Duration::from_millis(50)) {
        panic!("unexpected item {:?}", item);
    }
}
