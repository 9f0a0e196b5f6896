pub mod coalescing_queue;
pub mod slot;
pub(crate) mod transfer;

pub use coalescing_queue::*;
pub use slot::*;
