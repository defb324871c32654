use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::clock::Clock;
use super::manager::RateLimitManager;
use crate::config::RateLimitConfig;

/// Per-application registry of rate-limit managers, one per client id,
/// created lazily on first authorized connection and never evicted (spec §3,
/// §9 Open Questions: eviction policy is explicitly left undecided).
///
/// Guarded by a single mutex; contention is low because the critical section
/// is only a hash-map lookup-or-insert (spec §5).
pub struct RateLimitRegistry {
    app_id: String,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    managers: Mutex<HashMap<String, Arc<RateLimitManager>>>,
}

impl RateLimitRegistry {
    pub fn new(app_id: String, config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self { app_id, config, clock, managers: Mutex::new(HashMap::new()) }
    }

    pub fn get_or_create(&self, client_id: &str) -> Arc<RateLimitManager> {
        let mut managers = self.managers.lock().expect("rate limit registry poisoned");
        if let Some(existing) = managers.get(client_id) {
            return Arc::clone(existing);
        }
        let tag = format!("{client_id}@{}", self.app_id);
        let manager = Arc::new(RateLimitManager::new(tag, self.config, Arc::clone(&self.clock)));
        managers.insert(client_id.to_string(), Arc::clone(&manager));
        manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::rate_limit::clock::SystemClock;

    #[test]
    fn reuses_manager_per_client() {
        let registry = RateLimitRegistry::new(
            "echo".to_string(),
            RateLimitConfig { max_open_connections: 1, max_rate_amount: -1, max_rate_period_seconds: 1 },
            Arc::new(SystemClock),
        );
        let a = registry.get_or_create("one.com");
        let b = registry.get_or_create("one.com");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.tag(), "one.com@echo");

        let c = registry.get_or_create("two.com");
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
