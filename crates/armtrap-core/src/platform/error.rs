//! # Mach API Errors
//!
//! Mach APIs return `kern_return_t` values, which are integer error codes.
//! This module converts those codes into a Rust error type with descriptive
//! messages. The type is platform-agnostic so in-memory backends can report
//! the same failures the kernel would.

use thiserror::Error;

/// Raw `kern_return_t`
pub type KernReturn = i32;

/// `KERN_SUCCESS`
pub const KERN_SUCCESS: KernReturn = 0;
/// `KERN_INVALID_ADDRESS`
pub const KERN_INVALID_ADDRESS: KernReturn = 1;
/// `KERN_PROTECTION_FAILURE`
pub const KERN_PROTECTION_FAILURE: KernReturn = 2;
/// `KERN_NO_SPACE`
pub const KERN_NO_SPACE: KernReturn = 3;
/// `KERN_INVALID_ARGUMENT`
pub const KERN_INVALID_ARGUMENT: KernReturn = 4;
/// `KERN_FAILURE`
pub const KERN_FAILURE: KernReturn = 5;

/// Mach kernel API error
///
/// ## References
///
/// - [kern_return_t documentation](https://developer.apple.com/documentation/kernel/kern_return_t)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachError
{
    /// `KERN_INVALID_ADDRESS` (1)
    ///
    /// The address is not mapped in the target, or lies beyond its address space.
    #[error("KERN_INVALID_ADDRESS: address is not mapped")]
    InvalidAddress,

    /// `KERN_PROTECTION_FAILURE` (2)
    ///
    /// Blocked by page protection or by macOS's security policy
    /// (`task_for_pid()` without root or the debugger entitlement).
    #[error("KERN_PROTECTION_FAILURE: permission denied")]
    ProtectionFailure,

    /// `KERN_NO_SPACE` (3)
    ///
    /// `mach_vm_region()` found no region at or above the address.
    #[error("KERN_NO_SPACE: no region at or above address")]
    NoSpace,

    /// `KERN_INVALID_ARGUMENT` (4)
    #[error("KERN_INVALID_ARGUMENT: invalid PID or argument")]
    InvalidArgument,

    /// `KERN_FAILURE` (5)
    ///
    /// Often the process doesn't exist; `task_for_pid()` also returns this when
    /// permissions are denied.
    #[error("KERN_FAILURE: operation failed")]
    Failure,

    /// Unknown Mach error code, preserved so it can be looked up
    #[error("Unknown Mach error: {0}")]
    Unknown(KernReturn),
}

impl MachError
{
    /// Convert a return code into `Ok(())` or the matching error.
    pub fn check(code: KernReturn) -> Result<(), MachError>
    {
        if code == KERN_SUCCESS {
            Ok(())
        } else {
            Err(MachError::from(code))
        }
    }

    /// The raw `kern_return_t`.
    pub const fn code(self) -> KernReturn
    {
        match self {
            MachError::InvalidAddress => KERN_INVALID_ADDRESS,
            MachError::ProtectionFailure => KERN_PROTECTION_FAILURE,
            MachError::NoSpace => KERN_NO_SPACE,
            MachError::InvalidArgument => KERN_INVALID_ARGUMENT,
            MachError::Failure => KERN_FAILURE,
            MachError::Unknown(code) => code,
        }
    }
}

impl From<KernReturn> for MachError
{
    fn from(code: KernReturn) -> Self
    {
        match code {
            KERN_INVALID_ADDRESS => MachError::InvalidAddress,
            KERN_PROTECTION_FAILURE => MachError::ProtectionFailure,
            KERN_NO_SPACE => MachError::NoSpace,
            KERN_INVALID_ARGUMENT => MachError::InvalidArgument,
            KERN_FAILURE => MachError::Failure,
            _ => MachError::Unknown(code),
        }
    }
}
