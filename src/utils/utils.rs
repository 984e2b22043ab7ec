use std::time::Duration;

/// Longest wait between two acquisition retries.
pub const MAX_BACKOFF: Duration = Duration::from_millis(1000);

/// backoff_delay doubles `base_ms` per consecutive failure, capped at
/// [`MAX_BACKOFF`].
///
/// # Arguments
/// * `base_ms` - delay after the first failure
/// * `failures` - consecutive failures so far, starting at 1
///
/// # Returns
/// * `Duration`
pub fn backoff_delay(base_ms: u64, failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(31);
    let ms = base_ms.saturating_mul(1u64 << shift);
    Duration::from_millis(ms).min(MAX_BACKOFF)
}

/// Seconds between two instants, zero when `later` is not after `earlier`.
pub fn elapsed_secs(earlier: std::time::Instant, later: std::time::Instant) -> f32 {
    later.saturating_duration_since(earlier).as_secs_f32()
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(10, 1), Duration::from_millis(10));
        assert_eq!(backoff_delay(10, 2), Duration::from_millis(20));
        assert_eq!(backoff_delay(10, 4), Duration::from_millis(80));
        assert_eq!(backoff_delay(10, 20), MAX_BACKOFF);
        assert_eq!(backoff_delay(10, u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_elapsed_secs_never_negative() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(250);
        assert_eq!(elapsed_secs(t0, t1), 0.25);
        assert_eq!(elapsed_secs(t1, t0), 0.0);
    }
}
