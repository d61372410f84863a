//! Absolute time and fine-grained sleep (spec §6.1).

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, as a high-resolution float.
pub fn absolute_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Sleep for `ms` milliseconds. For `ms <= 2` this spin-yields until the
/// deadline (OS sleep granularity is too coarse to be useful at that scale);
/// for larger values it sleeps via the OS up to `ms - 2` and spin-yields the
/// remaining tail for precision.
pub fn sleep(ms: f64) {
    if ms <= 0.0 {
        return;
    }
    let start = Instant::now();
    let total = Duration::from_secs_f64(ms / 1000.0);

    if ms > 2.0 {
        let coarse = Duration::from_secs_f64((ms - 2.0) / 1000.0);
        std::thread::sleep(coarse);
    }

    while start.elapsed() < total {
        std::thread::yield_now();
    }
}
