// # Row Id Store Implementations
//
// This module provides implementations of the RowIdStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileRowIdStore;
pub use memory::MemoryRowIdStore;
