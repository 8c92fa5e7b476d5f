//! # macOS Mach API FFI Declarations
//!
//! `unsafe extern "C"` declarations for the Mach calls that `mach2` doesn't
//! expose, or exposes with types that don't fit here. Most of them need root
//! or the debugger entitlement, which is why they are missing from the
//! standard bindings.
//!
//! ## Safety Notes
//!
//! Every function here talks to the kernel about another process. Callers in
//! [`backend`](super::backend) check the returned `kern_return_t` and never
//! hand out raw pointers.
//!
//! ## References
//!
//! - [Apple Mach Kernel Programming](https://developer.apple.com/library/archive/documentation/Darwin/Conceptual/KernelProgramming/Mach/Mach.html)
//! - [XNU source](https://github.com/apple-oss-distributions/xnu) (`osfmk/mach/arm/thread_status.h`, `osfmk/mach/vm_region.h`)

// Allow doc comments in extern blocks - they're useful for developers even if rustdoc doesn't generate docs
#![allow(unused_doc_comments)]

use libc::{c_int, kern_return_t, mach_msg_type_number_t, mach_port_t, natural_t, thread_act_t, vm_address_t, vm_map_t, vm_offset_t, vm_size_t};

/// `vm_region_basic_info_data_64_t`
///
/// The kernel header wraps this in `#pragma pack(4)`, so `offset` sits at
/// byte 20 and the whole structure is 36 bytes (9 words).
#[repr(C, packed(4))]
#[derive(Debug, Default, Clone, Copy)]
pub struct VmRegionBasicInfo64
{
    /// Current protection (`VM_PROT_*`)
    pub protection: c_int,
    /// Maximum protection the current protection may be raised to
    pub max_protection: c_int,
    pub inheritance: u32,
    pub shared: u32,
    pub reserved: u32,
    pub offset: u64,
    pub behavior: c_int,
    pub user_wired_count: u16,
}

// Task and Port Management
#[link(name = "c", kind = "dylib")]
extern "C" {
    /// Get a Mach port to a process by PID
    ///
    /// Requires root and `com.apple.security.cs.debugger`; otherwise returns
    /// `KERN_FAILURE` or `KERN_PROTECTION_FAILURE`. Not publicly documented.
    pub fn task_for_pid(target_task: mach_port_t, pid: c_int, task: *mut mach_port_t) -> kern_return_t;

    /// Release a send right held by `target_task`
    ///
    /// See: [mach_port_deallocate](https://developer.apple.com/documentation/kernel/1578777-mach_port_deallocate/)
    pub fn mach_port_deallocate(target_task: mach_port_t, name: mach_port_t) -> kern_return_t;

    /// Create a new port right in `task`'s IPC space
    pub fn mach_port_allocate(task: mach_port_t, right: u32, name: *mut mach_port_t) -> kern_return_t;

    /// Insert a right for `poly` under `name`; with `MACH_MSG_TYPE_MAKE_SEND` this adds a send right to a receive right
    pub fn mach_port_insert_right(task: mach_port_t, name: mach_port_t, poly: mach_port_t, poly_poly: u32)
        -> kern_return_t;

    /// Register `new_port` as the handler for the exceptions in `exception_mask`
    ///
    /// See: [task_set_exception_ports](https://developer.apple.com/documentation/kernel/1538225-task_set_exception_ports/)
    pub fn task_set_exception_ports(
        task: mach_port_t,
        exception_mask: u32,
        new_port: mach_port_t,
        behavior: c_int,
        new_flavor: c_int,
    ) -> kern_return_t;
}

// Thread State
#[link(name = "c", kind = "dylib")]
extern "C" {
    /// Read thread state for `flavor` into `old_state`
    ///
    /// `old_state_count` is the buffer size in words on input and the number
    /// of words written on output.
    ///
    /// See: [thread_get_state](https://developer.apple.com/documentation/kernel/1418576-thread_get_state/)
    pub fn thread_get_state(
        target_act: thread_act_t,
        flavor: c_int,
        old_state: *mut natural_t,
        old_state_count: *mut mach_msg_type_number_t,
    ) -> kern_return_t;

    /// Write thread state for `flavor`
    ///
    /// See: [thread_set_state](https://developer.apple.com/documentation/kernel/1418827-thread_set_state/)
    pub fn thread_set_state(
        target_act: thread_act_t,
        flavor: c_int,
        new_state: *const natural_t,
        new_state_count: mach_msg_type_number_t,
    ) -> kern_return_t;

    /// Increment a thread's suspend count
    ///
    /// See: [thread_suspend](https://developer.apple.com/documentation/kernel/1402804-thread_suspend/)
    pub fn thread_suspend(target_act: thread_act_t) -> kern_return_t;

    /// Decrement a thread's suspend count
    ///
    /// See: [thread_resume](https://developer.apple.com/documentation/kernel/1402805-thread_resume/)
    pub fn thread_resume(target_act: thread_act_t) -> kern_return_t;
}

// Virtual Memory
#[link(name = "c", kind = "dylib")]
extern "C" {
    /// Copy `data_count` bytes from our address space into the target at `address`
    ///
    /// See: [vm_write](https://developer.apple.com/documentation/kernel/1585462-vm_write/)
    pub fn vm_write(
        target_task: vm_map_t,
        address: vm_address_t,
        data: vm_offset_t,
        data_count: mach_msg_type_number_t,
    ) -> kern_return_t;

    /// Free memory the kernel allocated in our address space (e.g. the `task_threads()` array)
    ///
    /// See: [vm_deallocate](https://developer.apple.com/documentation/kernel/1585284-vm_deallocate/)
    pub fn vm_deallocate(target_task: vm_map_t, address: vm_address_t, size: vm_size_t) -> kern_return_t;

    /// Describe the region containing `*address`, or the next region above it
    ///
    /// `address` and `size` are updated to the region actually found.
    ///
    /// See: [mach_vm_region](https://developer.apple.com/documentation/kernel/1402149-mach_vm_region/)
    pub fn mach_vm_region(
        target_task: vm_map_t,
        address: *mut u64, // mach_vm_address_t
        size: *mut u64,    // mach_vm_size_t
        flavor: c_int,
        info: *mut VmRegionBasicInfo64,
        info_count: *mut mach_msg_type_number_t,
        object_name: *mut mach_port_t,
    ) -> kern_return_t;
}
