//! Rate limiting for the reverse proxy.
//!
//! Each `(appId, clientId)` pair gets its own [`RateLimitManager`], tracking
//! both a concurrent-connection cap and a sliding-window admission rate with
//! a sorted timestamp log trimmed by binary search. [`RateLimitRegistry`]
//! owns the per-application map of these managers.

mod clock;
mod manager;
mod registry;

pub use clock::{Clock, MockClock, SystemClock};
pub use manager::{RateLimitGuard, RateLimitManager};
pub use registry::RateLimitRegistry;
