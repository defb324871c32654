//! Least-connections routing across an application's upstream pool.

mod router;

pub use router::{UpstreamGuard, UpstreamRouter};
