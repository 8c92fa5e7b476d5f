//! # Mach Backend
//!
//! [`TargetBackend`] implementation for macOS on Apple Silicon.
//!
//! Each method is one Mach call (or a short fixed sequence of them) with the
//! `kern_return_t` mapped through [`MachError::check`]. The backend holds no
//! state: task and thread ports travel in the handle newtypes.
//!
//! ## Mach APIs Used
//!
//! - **task_for_pid()**: attach
//! - **task_threads()** / **mach_port_deallocate()** / **vm_deallocate()**: thread enumeration
//! - **thread_suspend()** / **thread_resume()**: per-thread suspension
//! - **thread_get_state()** / **thread_set_state()**: `ARM_THREAD_STATE64` and `ARM_DEBUG_STATE64`
//! - **mach_vm_read_overwrite()** / **vm_write()**: memory access
//! - **mach_vm_region()** / **mach_vm_protect()**: protection query and change
//! - **task_suspend()** / **task_resume()**: pause and continue
//! - **mach_port_allocate()** / **mach_port_insert_right()** / **task_set_exception_ports()**: exception channel

use std::mem;

use libc::{c_int, mach_msg_type_number_t, mach_port_t, natural_t, thread_act_t, vm_address_t, vm_map_t, vm_offset_t, vm_size_t};
use mach2::task::{task_resume, task_suspend, task_threads};
use mach2::traps::mach_task_self;
use mach2::vm::{mach_vm_protect, mach_vm_read_overwrite};
use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};
use once_cell::sync::Lazy;
use tracing::{debug, trace, warn};

use crate::platform::error::KERN_FAILURE;
use crate::platform::macos::{constants, ffi};
use crate::platform::{MachError, MachResult, TargetBackend};
use crate::types::registers::{DEBUG_STATE_WORDS, THREAD_STATE_WORDS};
use crate::types::{
    Address, DebugState, ExceptionPort, ProcessId, Protection, RegionInfo, RegisterSnapshot, TaskHandle, ThreadHandle,
};

static SYSTEM_PAGE_SIZE: Lazy<u64> = Lazy::new(|| {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    u64::try_from(size).ok().filter(|size| *size > 0).unwrap_or(16 * 1024)
});

/// Debugging backend that talks to the XNU kernel through Mach ports
#[derive(Debug, Default, Clone, Copy)]
pub struct MachBackend;

impl MachBackend
{
    pub fn new() -> Self
    {
        MachBackend
    }

    /// Free the array `task_threads()` allocated in our address space.
    fn deallocate_threads_array(threads: *mut thread_act_t, count: mach_msg_type_number_t)
    {
        if threads.is_null() || count == 0 {
            return;
        }

        let size = (count as usize).saturating_mul(mem::size_of::<thread_act_t>()) as vm_size_t;
        // SAFETY: pointer and size describe the out-of-line array returned by task_threads
        unsafe {
            let _ = ffi::vm_deallocate(mach_task_self(), threads as vm_address_t, size);
        }
    }
}

impl TargetBackend for MachBackend
{
    fn task_for_pid(&self, pid: ProcessId) -> MachResult<TaskHandle>
    {
        let mut task: mach_port_t = 0;
        // SAFETY: out-pointer is a valid local
        let result = unsafe { ffi::task_for_pid(mach_task_self(), pid.0 as c_int, &mut task) };

        if result == KERN_FAILURE {
            // task_for_pid reports KERN_FAILURE both for missing processes and missing privileges
            // SAFETY: signal 0 only checks for existence
            let exists = unsafe { libc::kill(pid.0 as libc::pid_t, 0) == 0 };
            if exists {
                warn!("task_for_pid({pid}) failed but the process exists; check root and debugger entitlement");
            }
        }

        MachError::check(result)?;
        debug!("task_for_pid({pid}) -> task port {task}");
        Ok(TaskHandle(task))
    }

    fn task_threads(&self, task: TaskHandle) -> MachResult<Vec<ThreadHandle>>
    {
        let mut threads: *mut thread_act_t = std::ptr::null_mut();
        let mut thread_count: mach_msg_type_number_t = 0;

        // SAFETY: out-pointers are valid locals; the array is copied before it is freed
        unsafe {
            let result = task_threads(task.0, &mut threads, &mut thread_count);
            if let Err(err) = MachError::check(result) {
                Self::deallocate_threads_array(threads, thread_count);
                return Err(err);
            }

            let handles = std::slice::from_raw_parts(threads, thread_count as usize)
                .iter()
                .map(|port| ThreadHandle(*port))
                .collect();
            Self::deallocate_threads_array(threads, thread_count);
            Ok(handles)
        }
    }

    fn release_thread(&self, thread: ThreadHandle)
    {
        // SAFETY: releasing a send right we own; failure only leaks a port name
        unsafe {
            let _ = ffi::mach_port_deallocate(mach_task_self(), thread.0);
        }
    }

    fn thread_suspend(&self, thread: ThreadHandle) -> MachResult<()>
    {
        trace!("thread_suspend({})", thread.0);
        // SAFETY: plain port argument
        MachError::check(unsafe { ffi::thread_suspend(thread.0) })
    }

    fn thread_resume(&self, thread: ThreadHandle) -> MachResult<()>
    {
        trace!("thread_resume({})", thread.0);
        // SAFETY: plain port argument
        MachError::check(unsafe { ffi::thread_resume(thread.0) })
    }

    fn get_thread_state(&self, thread: ThreadHandle) -> MachResult<RegisterSnapshot>
    {
        let mut words = [0 as natural_t; THREAD_STATE_WORDS];
        let mut count = constants::ARM_THREAD_STATE64_COUNT;
        // SAFETY: buffer holds exactly ARM_THREAD_STATE64_COUNT words
        let result = unsafe {
            ffi::thread_get_state(thread.0, constants::ARM_THREAD_STATE64, words.as_mut_ptr(), &mut count)
        };
        MachError::check(result)?;
        Ok(RegisterSnapshot::from_words(&words))
    }

    fn set_thread_state(&self, thread: ThreadHandle, state: &RegisterSnapshot) -> MachResult<()>
    {
        let words = state.to_words();
        // SAFETY: buffer holds exactly ARM_THREAD_STATE64_COUNT words
        let result = unsafe {
            ffi::thread_set_state(
                thread.0,
                constants::ARM_THREAD_STATE64,
                words.as_ptr(),
                constants::ARM_THREAD_STATE64_COUNT,
            )
        };
        MachError::check(result)
    }

    fn get_debug_state(&self, thread: ThreadHandle) -> MachResult<DebugState>
    {
        let mut words = [0 as natural_t; DEBUG_STATE_WORDS];
        let mut count = constants::ARM_DEBUG_STATE64_COUNT;
        // SAFETY: buffer holds exactly ARM_DEBUG_STATE64_COUNT words
        let result =
            unsafe { ffi::thread_get_state(thread.0, constants::ARM_DEBUG_STATE64, words.as_mut_ptr(), &mut count) };
        MachError::check(result)?;
        Ok(DebugState::from_words(&words))
    }

    fn set_debug_state(&self, thread: ThreadHandle, state: &DebugState) -> MachResult<()>
    {
        let words = state.to_words();
        // SAFETY: buffer holds exactly ARM_DEBUG_STATE64_COUNT words
        let result = unsafe {
            ffi::thread_set_state(
                thread.0,
                constants::ARM_DEBUG_STATE64,
                words.as_ptr(),
                constants::ARM_DEBUG_STATE64_COUNT,
            )
        };
        MachError::check(result)
    }

    fn read_memory(&self, task: TaskHandle, address: Address, buf: &mut [u8]) -> MachResult<usize>
    {
        let mut total = 0usize;
        let mut cursor = address.value();

        while total < buf.len() {
            let chunk_len = (buf.len() - total).min(constants::MAX_VM_READ_CHUNK);
            let mut actual: mach_vm_size_t = 0;

            // SAFETY: destination is the unfilled tail of `buf`, at least chunk_len bytes long
            let result = unsafe {
                mach_vm_read_overwrite(
                    task.0 as vm_map_t,
                    cursor,
                    chunk_len as mach_vm_size_t,
                    buf[total..].as_mut_ptr() as mach_vm_address_t,
                    &mut actual,
                )
            };
            MachError::check(result)?;

            if actual == 0 {
                break;
            }
            total += actual as usize;
            cursor += actual;
        }

        Ok(total)
    }

    fn write_memory(&self, task: TaskHandle, address: Address, data: &[u8]) -> MachResult<()>
    {
        let len = mach_msg_type_number_t::try_from(data.len()).map_err(|_| MachError::InvalidArgument)?;
        // SAFETY: vm_write copies `len` bytes out of `data`
        let result =
            unsafe { ffi::vm_write(task.0 as vm_map_t, address.value() as vm_address_t, data.as_ptr() as vm_offset_t, len) };
        MachError::check(result)
    }

    fn region_info(&self, task: TaskHandle, address: Address) -> MachResult<RegionInfo>
    {
        let mut start = address.value();
        let mut size: u64 = 0;
        let mut info = ffi::VmRegionBasicInfo64::default();
        let mut count = constants::VM_REGION_BASIC_INFO_COUNT_64;
        let mut object_name: mach_port_t = 0;

        // SAFETY: info buffer is VM_REGION_BASIC_INFO_COUNT_64 words
        let result = unsafe {
            ffi::mach_vm_region(
                task.0 as vm_map_t,
                &mut start,
                &mut size,
                constants::VM_REGION_BASIC_INFO_64,
                &mut info,
                &mut count,
                &mut object_name,
            )
        };
        MachError::check(result)?;

        Ok(RegionInfo {
            start: Address::new(start),
            size,
            protection: Protection::from_bits(info.protection),
            max_protection: Protection::from_bits(info.max_protection),
        })
    }

    fn protect(&self, task: TaskHandle, address: Address, size: u64, protection: Protection) -> MachResult<()>
    {
        debug!("mach_vm_protect({address}, 0x{size:x}, {protection})");
        // SAFETY: changes current (not maximum) protection of a range in the target
        let result = unsafe { mach_vm_protect(task.0 as vm_map_t, address.value(), size, 0, protection.bits()) };
        MachError::check(result)
    }

    fn task_suspend(&self, task: TaskHandle) -> MachResult<()>
    {
        // SAFETY: plain port argument
        MachError::check(unsafe { task_suspend(task.0) })
    }

    fn task_resume(&self, task: TaskHandle) -> MachResult<()>
    {
        // SAFETY: plain port argument
        MachError::check(unsafe { task_resume(task.0) })
    }

    fn bind_exception_port(&self, task: TaskHandle) -> MachResult<ExceptionPort>
    {
        let mut port: mach_port_t = 0;

        // SAFETY: out-pointer is a valid local; rights are created in our own IPC space
        unsafe {
            MachError::check(ffi::mach_port_allocate(
                mach_task_self(),
                constants::MACH_PORT_RIGHT_RECEIVE,
                &mut port,
            ))?;
            MachError::check(ffi::mach_port_insert_right(
                mach_task_self(),
                port,
                port,
                constants::MACH_MSG_TYPE_MAKE_SEND,
            ))?;
            MachError::check(ffi::task_set_exception_ports(
                task.0,
                constants::EXC_MASK_BREAKPOINT,
                port,
                constants::EXCEPTION_STATE,
                constants::ARM_THREAD_STATE64,
            ))?;
        }

        debug!("exception port {port} bound to task {}", task.0);
        Ok(ExceptionPort(port))
    }

    fn page_size(&self) -> u64
    {
        *SYSTEM_PAGE_SIZE
    }
}
