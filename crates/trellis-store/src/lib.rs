//! Trellis Store - In-memory reference backend
//!
//! Implements the `trellis-core` storage SPI against process memory:
//! HashMap element storage with path and relationship indexes, snapshot
//! transactions, and optimistic conflict detection at commit time.
//!
//! This backend exists to make the SPI contract concrete and the engine
//! testable. Durable adapters live outside this workspace.

pub mod memory;

pub use memory::MemoryBackend;
