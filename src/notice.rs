//! Timed "claim received" confirmation
//!
//! The notice is a pure timeline: every query takes the current time, so the
//! shell can poll it from the frame loop without owning any timers.

/// Milestones of the notice, measured from when it opens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoticeTimings {
    /// Delay before the enter transition starts
    pub enter_ms: f64,
    pub ripple_ms: f64,
    /// Auto-dismiss starts after this long
    pub visible_ms: f64,
    pub auto_exit_ms: f64,
    pub manual_exit_ms: f64,
}

impl Default for NoticeTimings {
    fn default() -> Self {
        Self {
            enter_ms: 50.0,
            ripple_ms: 400.0,
            visible_ms: 6000.0,
            auto_exit_ms: 500.0,
            manual_exit_ms: 400.0,
        }
    }
}

/// Stages in the order they happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeStage {
    /// Mounted but not yet shown
    Entering,
    Shown,
    /// Exit transition running
    Leaving,
    Closed,
}

/// Confirmation shown after a successful claim
#[derive(Debug, Clone)]
pub struct ConfirmationNotice {
    amount: u32,
    opened_at: f64,
    timings: NoticeTimings,
    dismissed_at: Option<f64>,
}

impl ConfirmationNotice {
    pub fn new(amount: u32, now_ms: f64, visible_ms: f64) -> Self {
        Self::with_timings(
            amount,
            now_ms,
            NoticeTimings {
                visible_ms,
                ..NoticeTimings::default()
            },
        )
    }

    pub fn with_timings(amount: u32, now_ms: f64, timings: NoticeTimings) -> Self {
        Self {
            amount,
            opened_at: now_ms,
            timings,
            dismissed_at: None,
        }
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn message(&self) -> String {
        format!("Your ₹{} reward is on its way!", self.amount)
    }

    /// Start and end of the exit transition
    fn exit_window(&self) -> (f64, f64) {
        let auto_start = self.opened_at + self.timings.visible_ms;
        match self.dismissed_at {
            Some(start) if start < auto_start => (start, start + self.timings.manual_exit_ms),
            _ => (auto_start, auto_start + self.timings.auto_exit_ms),
        }
    }

    pub fn stage(&self, now_ms: f64) -> NoticeStage {
        let (exit_start, exit_end) = self.exit_window();
        if now_ms >= exit_end {
            NoticeStage::Closed
        } else if now_ms >= exit_start {
            NoticeStage::Leaving
        } else if now_ms - self.opened_at >= self.timings.enter_ms {
            NoticeStage::Shown
        } else {
            NoticeStage::Entering
        }
    }

    pub fn is_visible(&self, now_ms: f64) -> bool {
        self.stage(now_ms) == NoticeStage::Shown
    }

    pub fn has_ripple(&self, now_ms: f64) -> bool {
        now_ms - self.opened_at >= self.timings.ripple_ms
            && self.stage(now_ms) != NoticeStage::Closed
    }

    pub fn is_closed(&self, now_ms: f64) -> bool {
        self.stage(now_ms) == NoticeStage::Closed
    }

    /// Close button; ignored once an exit is already under way
    pub fn dismiss(&mut self, now_ms: f64) {
        if self.dismissed_at.is_none() && self.stage(now_ms) < NoticeStage::Leaving {
            self.dismissed_at = Some(now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_dismiss_timeline() {
        let n = ConfirmationNotice::new(20, 1000.0, 6000.0);
        assert_eq!(n.stage(1000.0), NoticeStage::Entering);
        assert_eq!(n.stage(1050.0), NoticeStage::Shown);
        assert!(!n.has_ripple(1399.0));
        assert!(n.has_ripple(1400.0));
        assert!(n.is_visible(6999.0));
        assert_eq!(n.stage(7000.0), NoticeStage::Leaving);
        assert_eq!(n.stage(7499.0), NoticeStage::Leaving);
        assert!(n.is_closed(7500.0));
    }

    #[test]
    fn test_manual_dismiss_is_quicker() {
        let mut n = ConfirmationNotice::new(10, 0.0, 6000.0);
        n.dismiss(2000.0);
        assert_eq!(n.stage(2000.0), NoticeStage::Leaving);
        assert_eq!(n.stage(2399.0), NoticeStage::Leaving);
        assert!(n.is_closed(2400.0));
    }

    #[test]
    fn test_dismiss_during_auto_exit_is_ignored() {
        let mut n = ConfirmationNotice::new(10, 0.0, 6000.0);
        n.dismiss(6100.0);
        assert_eq!(n.stage(6450.0), NoticeStage::Leaving);
        assert!(n.is_closed(6500.0));
    }

    #[test]
    fn test_message_mentions_amount() {
        assert!(ConfirmationNotice::new(100, 0.0, 6000.0).message().contains("₹100"));
    }
}
