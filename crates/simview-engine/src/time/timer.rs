use std::time::{Duration, Instant};

/// Fixed-period repeating timer driven by the event loop.
///
/// The runtime asks for [`deadline`](Self::deadline) to choose how long to
/// sleep and calls [`poll`](Self::poll) when it wakes. Periods missed while
/// the loop was busy are coalesced into one fire instead of a catch-up burst.
#[derive(Debug, Clone)]
pub struct RepeatingTimer {
    period: Duration,
    next: Instant,
}

impl RepeatingTimer {
    /// Starts a timer whose first fire is one period after `now`.
    ///
    /// A zero period is raised to one millisecond.
    pub fn start(period: Duration, now: Instant) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Instant of the next fire.
    pub fn deadline(&self) -> Instant {
        self.next
    }

    /// Returns true if the timer is due at `now`, and schedules the next fire.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }

        self.next += self.period;

        // Coalesce: if we fell behind by more than a period, realign to `now`.
        if self.next <= now {
            self.next = now + self.period;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: Duration = Duration::from_millis(16);

    #[test]
    fn fires_once_per_period() {
        let t0 = Instant::now();
        let mut timer = RepeatingTimer::start(P, t0);

        assert!(!timer.poll(t0));
        assert!(!timer.poll(t0 + Duration::from_millis(15)));
        assert!(timer.poll(t0 + P));
        assert!(!timer.poll(t0 + P));
        assert_eq!(timer.deadline(), t0 + P * 2);
        assert!(timer.poll(t0 + P * 2));
    }

    #[test]
    fn missed_periods_coalesce() {
        let t0 = Instant::now();
        let mut timer = RepeatingTimer::start(P, t0);

        let late = t0 + P * 10;
        assert!(timer.poll(late));
        assert!(!timer.poll(late));
        assert_eq!(timer.deadline(), late + P);
    }

    #[test]
    fn keeps_phase_when_slightly_late() {
        let t0 = Instant::now();
        let mut timer = RepeatingTimer::start(P, t0);
        assert!(timer.poll(t0 + P + Duration::from_millis(3)));
        assert_eq!(timer.deadline(), t0 + P * 2);
    }

    #[test]
    fn zero_period_is_clamped() {
        let timer = RepeatingTimer::start(Duration::ZERO, Instant::now());
        assert_eq!(timer.period(), Duration::from_millis(1));
    }
}
