//! Mapping of wheel, swipe and key input onto paging.

use std::time::{Duration, Instant};

/// Wheel events closer together than this are treated as one burst.
pub const WHEEL_SPAM_WINDOW: Duration = Duration::from_millis(30);

/// Shortest vertical swipe that pages, in pixels.
pub const SWIPE_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    Forward,
    Backward,
}

/// Scrolling down pages back, anything else pages forward.
pub fn wheel(dy: f64) -> Paging {
    if dy > 0.0 {
        Paging::Backward
    } else {
        Paging::Forward
    }
}

/// Vertical swipe distance to paging; short swipes are taps.
pub fn swipe(dy: f64) -> Option<Paging> {
    if dy.abs() < SWIPE_THRESHOLD {
        None
    } else if dy > 0.0 {
        Some(Paging::Backward)
    } else {
        Some(Paging::Forward)
    }
}

/// Drops calls that follow the previous one, accepted or not, within the
/// window.
#[derive(Debug, Clone)]
pub struct SpamGuard {
    window: Duration,
    last: Option<Instant>,
}

impl SpamGuard {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn allow(&mut self, now: Instant) -> bool {
        let allowed = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) > self.window);
        self.last = Some(now);
        allowed
    }
}

impl Default for SpamGuard {
    fn default() -> Self {
        Self::new(WHEEL_SPAM_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_direction() {
        assert_eq!(wheel(1.0), Paging::Backward);
        assert_eq!(wheel(-3.0), Paging::Forward);
        assert_eq!(wheel(0.0), Paging::Forward);
    }

    #[test]
    fn test_swipe() {
        assert_eq!(swipe(4.0), None);
        assert_eq!(swipe(-9.9), None);
        assert_eq!(swipe(25.0), Some(Paging::Backward));
        assert_eq!(swipe(-10.0), Some(Paging::Forward));
    }

    #[test]
    fn test_spam_guard_needs_a_pause() {
        let start = Instant::now();
        let mut guard = SpamGuard::default();
        assert!(guard.allow(start));
        assert!(!guard.allow(start + Duration::from_millis(20)));
        // still inside the window of the rejected call
        assert!(!guard.allow(start + Duration::from_millis(45)));
        assert!(guard.allow(start + Duration::from_millis(100)));
    }
}
