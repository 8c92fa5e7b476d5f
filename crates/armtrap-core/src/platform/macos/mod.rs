//! # macOS (Apple Silicon) Backend
//!
//! Uses Mach APIs to control the target:
//!
//! 1. `task_for_pid()` for the task port
//! 2. `task_threads()` to find the thread to operate on
//! 3. `thread_get_state()` / `thread_set_state()` for registers and debug registers
//! 4. `mach_vm_*` calls for memory
//!
//! ## Requirements
//!
//! - Root (`sudo`)
//! - The `com.apple.security.cs.debugger` entitlement on the binary
//! - SIP relaxed for platform binaries
//!
//! ## References
//!
//! - [Apple Mach Kernel Programming](https://developer.apple.com/library/archive/documentation/Darwin/Conceptual/KernelProgramming/Mach/Mach.html)

pub mod backend;
pub mod constants;
pub mod ffi;

pub use backend::MachBackend;
