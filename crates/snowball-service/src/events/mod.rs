//! Real-time event fan-out.

pub mod memory;

pub use memory::MemoryPubSub;
