//! # macOS Platform Constants
//!
//! Flavors, counts and masks passed to Mach APIs that neither `libc` nor
//! `mach2` export with the types we need.

use libc::{c_int, mach_msg_type_number_t};

// ============================================================================
// Thread State Flavors
// ============================================================================

/// ARM64 thread state flavor (flavor 6)
///
/// Used with `thread_get_state()` / `thread_set_state()` for x0-x28, fp, lr,
/// sp, pc and cpsr, and as the flavor delivered with breakpoint exceptions.
pub const ARM_THREAD_STATE64: c_int = 6;

/// ARM64 thread state count (68 u32 values)
pub const ARM_THREAD_STATE64_COUNT: mach_msg_type_number_t = 68;

// ============================================================================
// Debug State Flavors
// ============================================================================

/// ARM64 debug state flavor (flavor 15)
///
/// Breakpoint (DBGBVR/DBGBCR) and watchpoint (DBGWVR/DBGWCR) register pairs.
/// The structure holds 16 pairs of each but the hardware backs only 6.
pub const ARM_DEBUG_STATE64: c_int = 15;

/// ARM64 debug state count (520 bytes / 4 = 130 u32 values)
pub const ARM_DEBUG_STATE64_COUNT: mach_msg_type_number_t = 130;

// ============================================================================
// Virtual Memory
// ============================================================================

/// `VM_REGION_BASIC_INFO_64` flavor for `mach_vm_region()`
pub const VM_REGION_BASIC_INFO_64: c_int = 9;

/// `VM_REGION_BASIC_INFO_COUNT_64` (36 bytes / 4)
pub const VM_REGION_BASIC_INFO_COUNT_64: mach_msg_type_number_t = 9;

/// Largest single `mach_vm_read_overwrite()` request.
pub const MAX_VM_READ_CHUNK: usize = 64 * 1024;

// ============================================================================
// Exception Ports
// ============================================================================

/// `EXC_MASK_BREAKPOINT` (1 << `EXC_BREAKPOINT`)
pub const EXC_MASK_BREAKPOINT: u32 = 1 << 6;

/// `EXCEPTION_STATE`: deliver thread state with the exception message
pub const EXCEPTION_STATE: c_int = 2;

/// `MACH_PORT_RIGHT_RECEIVE`
pub const MACH_PORT_RIGHT_RECEIVE: u32 = 1;

/// `MACH_MSG_TYPE_MAKE_SEND`
pub const MACH_MSG_TYPE_MAKE_SEND: u32 = 20;
