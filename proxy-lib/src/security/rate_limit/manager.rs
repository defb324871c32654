use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::clock::Clock;
use crate::config::RateLimitConfig;

struct State {
    open_count: i64,
    timestamps: VecDeque<i64>,
}

/// Enforces a concurrency cap and a sliding-window admission rate for one
/// `(appId, clientId)` scope (spec §3, §4.1).
///
/// `add`/`release` never fail; a denial is a normal `false` return, not an
/// error. The lock guarding `state` is a plain synchronous mutex: neither
/// operation performs I/O, so there is nothing to suspend on (spec §5).
pub struct RateLimitManager {
    tag: String,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl RateLimitManager {
    pub fn new(tag: String, config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            tag,
            config,
            clock,
            state: Mutex::new(State { open_count: 0, timestamps: VecDeque::new() }),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn open_count(&self) -> i64 {
        self.state.lock().expect("rate limit manager poisoned").open_count
    }

    /// Attempt to admit one new connection. Returns `true` if both the
    /// concurrency cap and the sliding-window rate allow it, in which case
    /// the manager's internal counters have already been mutated to reflect
    /// the admission.
    pub fn add(&self) -> bool {
        let mut state = self.state.lock().expect("rate limit manager poisoned");

        if self.config.open_connections_enabled()
            && state.open_count >= self.config.max_open_connections
        {
            return false;
        }

        let now = self.clock.now_secs();

        if self.config.rate_enabled() {
            if state.timestamps.len() as i64 >= self.config.max_rate_amount {
                let window_start = now - self.config.max_rate_period_seconds as i64 + 1;
                trim_timestamps(&mut state.timestamps, window_start);
                if state.timestamps.len() as i64 >= self.config.max_rate_amount {
                    return false;
                }
            }
            state.timestamps.push_back(now);
        }

        state.open_count += 1;
        true
    }

    /// Release one previously-admitted connection. Tolerates stray releases
    /// (spec §4.1: "invariant I4 implies they shouldn't happen, but
    /// toleration prevents cascading failures").
    pub fn release(&self) {
        let mut state = self.state.lock().expect("rate limit manager poisoned");
        if state.open_count > 0 {
            state.open_count -= 1;
        }
    }
}

/// Drop the prefix of `ts` (sorted ascending) that is `< window_start`, using
/// binary search so the trim runs in `O(log n)` (spec §4.1).
fn trim_timestamps(ts: &mut VecDeque<i64>, window_start: i64) {
    let cut = ts.partition_point(|&t| t < window_start);
    ts.drain(..cut);
}

/// RAII handle for one admitted connection's rate-limit budget.
///
/// Exactly one `release()` must happen per `add() == true` (spec I4); rather
/// than relying on every call site remembering to release, admission returns
/// a guard whose `Drop` releases once. This mirrors the teacher's
/// `ConnectionGuard` pattern for connection-count bookkeeping.
pub struct RateLimitGuard {
    manager: Arc<RateLimitManager>,
}

impl RateLimitManager {
    /// Like `add`, but returns a guard that releases on drop instead of a
    /// bare bool, so callers cannot forget to release.
    pub fn try_admit(self: &Arc<Self>) -> Option<RateLimitGuard> {
        if self.add() {
            Some(RateLimitGuard { manager: Arc::clone(self) })
        } else {
            None
        }
    }
}

impl Drop for RateLimitGuard {
    fn drop(&mut self) {
        self.manager.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::rate_limit::clock::MockClock;

    fn manager(cfg: RateLimitConfig, clock: Arc<MockClock>) -> Arc<RateLimitManager> {
        Arc::new(RateLimitManager::new("test@app".to_string(), cfg, clock))
    }

    #[test]
    fn sliding_window_admits_one_per_distinct_second() {
        let clock = Arc::new(MockClock::new(1));
        let cfg = RateLimitConfig { max_open_connections: -1, max_rate_amount: 1, max_rate_period_seconds: 1 };
        let m = manager(cfg, Arc::clone(&clock));

        let sequence = [1, 1, 1, 2, 2, 3];
        let expected = [true, false, false, true, false, true];
        for (t, want) in sequence.iter().zip(expected.iter()) {
            clock.set(*t);
            assert_eq!(m.add(), *want, "at t={t}");
        }
    }

    #[test]
    fn max_open_respected_under_sequential_contention() {
        let clock = Arc::new(MockClock::new(100));
        let cfg = RateLimitConfig { max_open_connections: 3, max_rate_amount: -1, max_rate_period_seconds: 1 };
        let m = manager(cfg, clock);

        let outcomes: Vec<bool> = (0..9).map(|_| m.add()).collect();
        assert_eq!(outcomes.iter().filter(|&&b| b).count(), 3);
        assert_eq!(m.open_count(), 3);

        for _ in 0..3 {
            m.release();
        }
        assert_eq!(m.open_count(), 0);

        let outcomes: Vec<bool> = (0..6).map(|_| m.add()).collect();
        assert_eq!(outcomes.iter().filter(|&&b| b).count(), 3);
    }

    #[test]
    fn release_is_never_negative() {
        let clock = Arc::new(MockClock::new(0));
        let cfg = RateLimitConfig { max_open_connections: -1, max_rate_amount: -1, max_rate_period_seconds: 1 };
        let m = manager(cfg, clock);
        m.release();
        m.release();
        assert_eq!(m.open_count(), 0);
    }

    #[test]
    fn zero_open_connections_denies_everything() {
        let clock = Arc::new(MockClock::new(0));
        let cfg = RateLimitConfig { max_open_connections: 0, max_rate_amount: -1, max_rate_period_seconds: 1 };
        let m = manager(cfg, clock);
        assert!(!m.add());
    }

    #[test]
    fn try_admit_releases_exactly_once_on_drop() {
        let clock = Arc::new(MockClock::new(0));
        let cfg = RateLimitConfig { max_open_connections: 1, max_rate_amount: -1, max_rate_period_seconds: 1 };
        let m = manager(cfg, clock);

        {
            let guard = m.try_admit();
            assert!(guard.is_some());
            assert_eq!(m.open_count(), 1);
            assert!(m.try_admit().is_none(), "cap of 1 should deny a second admission");
        }
        assert_eq!(m.open_count(), 0);
    }

    #[test]
    fn trim_timestamps_is_idempotent_and_bounded() {
        let mut ts: VecDeque<i64> = [1, 2, 3, 5, 8, 13].into_iter().collect();
        let original = ts.clone();
        trim_timestamps(&mut ts, 5);
        assert_eq!(ts, VecDeque::from(vec![5, 8, 13]));
        assert!(ts.iter().all(|t| *t >= 5));
        assert!(original.iter().filter(|t| **t < 5).all(|t| !ts.contains(t)));

        let mut twice = ts.clone();
        trim_timestamps(&mut twice, 5);
        assert_eq!(twice, ts);
    }

    #[test]
    fn trim_timestamps_empties_when_all_stale() {
        let mut ts: VecDeque<i64> = [1, 2, 3].into_iter().collect();
        trim_timestamps(&mut ts, 100);
        assert!(ts.is_empty());
    }
}
