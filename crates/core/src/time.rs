use chrono::{DateTime, Duration, Utc};

/// Source of "now" for session timestamps.
///
/// Everything that records a start or finish instant takes one of these, so
/// tests can pin time instead of sampling the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    /// Real wall-clock time.
    #[default]
    Default,
    /// Frozen at a single instant. Only moves when a test advances it.
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// A clock frozen at `at`.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }

    /// Moves a fixed clock forward; a real clock is left alone.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(at) = self {
            *at += delta;
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Instant the pinned test clock reads: 2026-01-15T09:30:00Z.
pub const FIXED_TEST_TIMESTAMP: i64 = 1_768_469_400;

/// The pinned timestamp as a `DateTime<Utc>`.
///
/// # Panics
///
/// Panics if the constant ever leaves chrono's representable range.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("pinned timestamp is representable")
}

/// A `Clock` frozen at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

/// Formats a countdown second count as `mm:ss`.
///
/// Minutes are not capped at 59, so a full-length section renders as `15:00`.
#[must_use]
pub fn format_mm_ss(total_seconds: u32) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// Formats an elapsed second count as a compact duration like `1h 2m 3s`.
///
/// Leading zero components are omitted (`125` renders as `2m 5s`).
#[must_use]
pub fn format_duration_human(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reads_the_pinned_instant() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), fixed_now());
        assert!(clock.is_fixed());
    }

    #[test]
    fn advance_moves_fixed_clocks_only() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(90));

        let mut real = Clock::default();
        real.advance(Duration::seconds(90));
        assert!(!real.is_fixed());
    }

    #[test]
    fn mm_ss_formats_countdowns() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(59), "00:59");
        assert_eq!(format_mm_ss(60), "01:00");
        assert_eq!(format_mm_ss(15 * 60), "15:00");
        assert_eq!(format_mm_ss(61 * 60 + 5), "61:05");
    }

    #[test]
    fn human_duration_drops_leading_zero_parts() {
        assert_eq!(format_duration_human(0), "0s");
        assert_eq!(format_duration_human(59), "59s");
        assert_eq!(format_duration_human(125), "2m 5s");
        assert_eq!(format_duration_human(3600 + 125), "1h 2m 5s");
    }
}
