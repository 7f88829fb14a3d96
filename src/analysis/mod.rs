//! Analysis modules.
//!
//! The aggregation core plus the textual conditions the CLI filters with.

pub mod aggregator;
pub mod condition;

pub use aggregator::*;
pub use condition::Condition;
