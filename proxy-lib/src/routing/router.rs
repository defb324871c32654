use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::config::UpstreamRef;
use crate::error::{ProxyError, Result};

/// Picks the least-loaded upstream address for a single application and
/// tracks active-connection counts per upstream (spec §4.2).
///
/// Ties are broken by declaration order: the first upstream in the
/// application's `upstreams` list that holds the current minimum wins. A
/// single mutex guards the whole count map; `acquire`/`release` never touch
/// I/O, so contention is brief.
pub struct UpstreamRouter {
    order: Vec<String>,
    active: Mutex<HashMap<String, u32>>,
}

impl UpstreamRouter {
    pub fn new(upstreams: &[UpstreamRef]) -> Self {
        let order: Vec<String> = upstreams.iter().map(|u| u.address.clone()).collect();
        let active = order.iter().cloned().map(|addr| (addr, 0u32)).collect();
        Self { order, active: Mutex::new(active) }
    }

    /// Select the least-loaded upstream and increment its active count.
    /// Returns [`ProxyError::NoUpstreams`] only if the application was
    /// configured with an empty upstream list (should be rejected earlier by
    /// config validation).
    pub fn acquire(&self) -> Result<UpstreamGuard> {
        if self.order.is_empty() {
            return Err(ProxyError::NoUpstreams);
        }
        let mut active = self.active.lock().expect("upstream router poisoned");
        let chosen = self
            .order
            .iter()
            .min_by_key(|addr| active.get(*addr).copied().unwrap_or(0))
            .expect("order is non-empty")
            .clone();
        *active.entry(chosen.clone()).or_insert(0) += 1;
        drop(active);
        Ok(UpstreamGuard { router: self, address: chosen })
    }

    fn release(&self, address: &str) {
        let mut active = self.active.lock().expect("upstream router poisoned");
        match active.get_mut(address) {
            Some(count) if *count > 0 => *count -= 1,
            Some(_) => warn!(%address, "released upstream with zero active connections"),
            None => warn!(%address, "released unknown upstream"),
        }
    }

    #[cfg(test)]
    pub fn active_counts(&self) -> HashMap<String, u32> {
        self.active.lock().expect("upstream router poisoned").clone()
    }
}

/// RAII handle for one routed connection's claim on an upstream; dropping it
/// returns the slot so the next `acquire()` sees an accurate load picture.
pub struct UpstreamGuard<'a> {
    router: &'a UpstreamRouter,
    address: String,
}

impl UpstreamGuard<'_> {
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Drop for UpstreamGuard<'_> {
    fn drop(&mut self) {
        self.router.release(&self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstreams(addrs: &[&str]) -> Vec<UpstreamRef> {
        addrs.iter().map(|a| UpstreamRef { address: a.to_string() }).collect()
    }

    #[test]
    fn distributes_across_two_upstreams_under_sequential_load() {
        let router = UpstreamRouter::new(&upstreams(&["a:1", "b:1"]));
        let guards: Vec<_> = (0..6).map(|_| router.acquire().unwrap()).collect();
        let counts = router.active_counts();
        assert_eq!(counts.get("a:1"), Some(&3));
        assert_eq!(counts.get("b:1"), Some(&3));

        drop(guards.into_iter().take(3).collect::<Vec<_>>());
        let counts = router.active_counts();
        let total: u32 = counts.values().sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn prefers_least_loaded_after_partial_release() {
        let router = UpstreamRouter::new(&upstreams(&["a:1", "b:1"]));
        let g: Vec<_> = (0..6).map(|_| router.acquire().unwrap()).collect();
        assert_eq!(router.active_counts().get("a:1"), Some(&3));
        assert_eq!(router.active_counts().get("b:1"), Some(&3));

        let (a_guards, _b_guards): (Vec<_>, Vec<_>) =
            g.into_iter().partition(|guard| guard.address() == "a:1");
        drop(a_guards);
        assert_eq!(router.active_counts().get("a:1"), Some(&0));

        let more: Vec<_> = (0..3).map(|_| router.acquire().unwrap()).collect();
        assert!(more.iter().all(|guard| guard.address() == "a:1"));
        assert_eq!(router.active_counts().get("a:1"), Some(&3));
        assert_eq!(router.active_counts().get("b:1"), Some(&3));
    }

    #[test]
    fn empty_upstream_list_errors() {
        let router = UpstreamRouter::new(&[]);
        assert!(matches!(router.acquire(), Err(ProxyError::NoUpstreams)));
    }
}
