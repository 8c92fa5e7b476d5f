//! # Types
//!
//! Platform-agnostic value types shared by the engine and its backends.
//!
//! ## Module Organization
//!
//! - [`address`]: address newtype and number parsing
//! - [`process`]: PID and kernel handle newtypes
//! - [`registers`]: thread and debug register state
//! - [`memory`]: protection flags and region info

pub mod address;
pub mod memory;
pub mod process;
pub mod registers;

pub use address::{parse_u64, Address};
pub use memory::{Protection, RegionInfo};
pub use process::{ExceptionPort, ProcessId, TaskHandle, ThreadHandle};
pub use registers::{DebugState, RegisterName, RegisterSnapshot};
