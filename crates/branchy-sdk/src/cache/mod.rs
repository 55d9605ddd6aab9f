//! Caching primitives
//!
//! - [`UnitCache`]: the entity cache, units indexed by hash and by path
//! - [`AttachmentCache`]: lazily loaded, single-flight attachment lists

mod attachments;
mod units;

pub use attachments::{AsyncStatus, AttachmentCache, AttachmentCell, Attachments};
pub use units::UnitCache;
