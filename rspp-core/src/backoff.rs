//! Jittered wait helper shared by retry backoff and async-poll intervals (§4.8, §9).

use rand::Rng;

/// Add up to `jitter_percent` percent of random jitter on top of `base_ms`.
///
/// `jitter_percent == 0` still adds a single millisecond of jitter so the
/// returned value is never exactly `base_ms` across repeated calls, matching
/// the teacher's shim of the same name.
#[must_use]
pub fn jitter_wait(base_ms: u64, jitter_percent: u32) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, (base_ms.saturating_mul(u64::from(jitter_percent))) / 100)
    };
    let mut rng = rand::rng();
    base_ms + rng.random_range(0..jitter_range)
}

/// Clamp a poll interval into `[min_ms, max_ms]`.
#[must_use]
pub const fn clamp_poll_interval_ms(requested_ms: u64, min_ms: u64, max_ms: u64) -> u64 {
    if requested_ms < min_ms {
        min_ms
    } else if requested_ms > max_ms {
        max_ms
    } else {
        requested_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_wait_never_returns_less_than_base() {
        for _ in 0..20 {
            assert!(jitter_wait(100, 10) >= 100);
        }
    }

    #[test]
    fn clamp_respects_bounds() {
        assert_eq!(clamp_poll_interval_ms(50, 200, 5000), 200);
        assert_eq!(clamp_poll_interval_ms(10_000, 200, 5000), 5000);
        assert_eq!(clamp_poll_interval_ms(1200, 200, 5000), 1200);
    }
}
