//! # Repositories
//!
//! Repository implementations over the queue schema.
//!
//! - [`allocator`] - persisted monotonic local ID sequence
//! - [`queue`] - the durable sale queue (enqueue, snapshot, remove, ...)

pub mod allocator;
pub mod queue;
