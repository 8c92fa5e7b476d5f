//! # Memory Accessor
//!
//! Reads of arbitrary byte ranges and fixed-width writes into the target.
//!
//! ## Writes
//!
//! A write never changes the target's page permissions for longer than the
//! write itself:
//!
//! 1. `mach_vm_region()` to capture the current protection
//! 2. `mach_vm_protect()` to `READ | WRITE | COPY` on the pages covering the write
//! 3. `vm_write()` of one 8-byte little-endian word
//! 4. `mach_vm_protect()` back to the captured protection, whatever step 3 did
//!
//! A word that straddles two regions is escalated and restored per region,
//! each with the protection it had before.
//!
//! Writes are always exactly one machine word; there is no variable-width write.
//!
//! ## References
//!
//! - [mach_vm_region](https://developer.apple.com/documentation/kernel/1402149-mach_vm_region/)
//! - [mach_vm_protect](https://developer.apple.com/documentation/kernel/1402149-mach_vm_protect/)

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use crate::error::{DebuggerError, Result};
use crate::guards::ProtectionGuard;
use crate::platform::TargetBackend;
use crate::session::Session;
use crate::types::{Address, Protection, RegionInfo, TaskHandle};

/// Bytes per displayed line.
pub const LINE_WIDTH: usize = 16;

/// Most lines `read lines` will fetch (320 bytes).
pub const MAX_LINES: usize = 20;

/// Native machine word; the widest `read value` and the only write size.
pub const WORD_SIZE: usize = 8;

/// Rendered in `char` mode for bytes outside the printable range.
pub const PLACEHOLDER: char = '?';

/// How `read lines` renders each byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat
{
    /// Printable ASCII (33-126), `?` otherwise
    Char,
    /// Two-digit hex
    Bytes,
}

impl FromStr for LineFormat
{
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self>
    {
        match s {
            "char" => Ok(LineFormat::Char),
            "bytes" => Ok(LineFormat::Bytes),
            other => Err(DebuggerError::InvalidCommand(format!(
                "line format must be 'char' or 'bytes', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for LineFormat
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            LineFormat::Char => f.write_str("char"),
            LineFormat::Bytes => f.write_str("bytes"),
        }
    }
}

/// `0x` followed by two lowercase hex digits per byte.
pub fn hex_string(bytes: &[u8]) -> String
{
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Printable ASCII for `char` mode.
pub fn display_char(byte: u8) -> char
{
    if (33..=126).contains(&byte) {
        char::from(byte)
    } else {
        PLACEHOLDER
    }
}

/// Result of `read lines`: 16-byte rows starting at an aligned base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLines
{
    /// Address the operator asked for (used in the header)
    pub requested: Address,
    /// `requested` rounded down to 16 bytes (first row label)
    pub base: Address,
    pub format: LineFormat,
    pub bytes: Vec<u8>,
    /// Whether the line count was cut to [`MAX_LINES`]
    pub clamped: bool,
}

impl MemoryLines
{
    /// Rows as `(address, bytes)`.
    pub fn rows(&self) -> impl Iterator<Item = (Address, &[u8])> + '_
    {
        self.bytes.chunks(LINE_WIDTH).enumerate().map(move |(i, row)| {
            let offset = (i * LINE_WIDTH) as u64;
            (Address::new(self.base.value().wrapping_add(offset)), row)
        })
    }
}

impl fmt::Display for MemoryLines
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:#x} | ", self.requested)?;
        for column in 0..LINE_WIDTH {
            match self.format {
                LineFormat::Char => write!(f, "{column:X} ")?,
                LineFormat::Bytes => write!(f, "{column:02X} ")?,
            }
        }

        for (address, row) in self.rows() {
            write!(f, "\n{address:#x} | ")?;
            for byte in row {
                match self.format {
                    LineFormat::Char => write!(f, "{} ", display_char(*byte))?,
                    LineFormat::Bytes => write!(f, "{byte:02x} ")?,
                }
            }
        }
        Ok(())
    }
}

impl<B: TargetBackend> Session<B>
{
    /// Copy `size` bytes at `address` out of the target.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`
    /// - `MemoryAccessDenied`: the range isn't (fully) readable, wraps past the
    ///   top of the address space, or is too large to buffer
    pub fn read_bytes(&self, address: Address, size: usize) -> Result<Vec<u8>>
    {
        let task = self.task()?;
        if size == 0 {
            return Ok(Vec::new());
        }
        if address.checked_add(size as u64).is_none() {
            return Err(DebuggerError::MemoryAccessDenied {
                address,
                details: format!("{size} bytes runs past the end of the address space"),
            });
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|err| DebuggerError::MemoryAccessDenied {
                address,
                details: format!("cannot buffer {size} bytes: {err}"),
            })?;
        buf.resize(size, 0);

        let copied = self
            .backend
            .read_memory(task, address, &mut buf)
            .map_err(|err| DebuggerError::MemoryAccessDenied {
                address,
                details: format!("failed to read {size} bytes: {err}"),
            })?;
        if copied < size {
            return Err(DebuggerError::MemoryAccessDenied {
                address,
                details: format!("short read: {copied} of {size} bytes"),
            });
        }

        debug!("read {size} bytes at {address}");
        Ok(buf)
    }

    /// Read `requested_lines` rows of 16 bytes, starting at `address` rounded down to 16.
    ///
    /// More than [`MAX_LINES`] rows are clamped to [`MAX_LINES`] with a warning.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`
    /// - `MemoryAccessDenied`
    pub fn read_lines(&self, format: LineFormat, address: Address, requested_lines: usize) -> Result<MemoryLines>
    {
        let clamped = requested_lines > MAX_LINES;
        let lines = if clamped {
            warn!("Max lines to print is {MAX_LINES}!");
            MAX_LINES
        } else {
            requested_lines
        };

        let base = address.align_down(LINE_WIDTH as u64);
        info!("Reading {lines} {format} lines from memory address {address:#x}...");
        let bytes = self.read_bytes(base, LINE_WIDTH * lines)?;

        Ok(MemoryLines {
            requested: address,
            base,
            format,
            bytes,
            clamped,
        })
    }

    /// Read up to 8 bytes at `address` as one little-endian integer.
    ///
    /// Sizes above [`WORD_SIZE`] are clamped with a warning; size 0 returns 0
    /// without touching the target.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`
    /// - `MemoryAccessDenied`
    pub fn read_value(&self, address: Address, size: usize) -> Result<u64>
    {
        let size = if size > WORD_SIZE {
            warn!("Max read out size is {WORD_SIZE}!");
            WORD_SIZE
        } else {
            size
        };

        let mut word = [0u8; WORD_SIZE];
        if size > 0 {
            let bytes = self.read_bytes(address, size)?;
            word[..size].copy_from_slice(&bytes);
        } else {
            self.task()?;
        }
        Ok(u64::from_le_bytes(word))
    }

    /// Write one 8-byte word at `address`, preserving page protection.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`
    /// - `MemoryAccessDenied`: region query failed, the address is unmapped,
    ///   or `vm_write()` failed (protection is still restored)
    /// - `ProtectionChangeFailed`: escalation failed (nothing written), or the
    ///   write succeeded but restoring the original protection failed
    pub fn write_memory(&self, address: Address, value: u64) -> Result<()>
    {
        let task = self.task()?;

        let end = address
            .checked_add(WORD_SIZE as u64)
            .ok_or_else(|| DebuggerError::MemoryAccessDenied {
                address,
                details: "write runs past the end of the address space".to_string(),
            })?;
        let regions = self.regions_covering(task, address, end)?;

        let page_size = self.backend.page_size();
        let pages_start = address.align_down(page_size);
        let pages_end = end.align_up(page_size);

        let escalated = Protection::READ | Protection::WRITE | Protection::COPY;
        let mut guards: SmallVec<[ProtectionGuard<'_, B>; 2]> = SmallVec::new();
        for region in &regions {
            let start = region.start.max(pages_start);
            let stop = region.end().min(pages_end);
            // an early return drops the guards already pushed, which restores them
            guards.push(ProtectionGuard::escalate(
                &self.backend,
                task,
                start,
                stop.value() - start.value(),
                region.protection,
                escalated,
            )?);
        }

        info!("Writing {value:x} to memory address {address:#x}...");
        let written = self.backend.write_memory(task, address, &value.to_le_bytes());
        let restored = guards
            .into_iter()
            .map(ProtectionGuard::restore)
            .fold(Ok(()), |first, next| match (first, next) {
                (Ok(()), next) => next,
                (Err(err), Err(later)) => {
                    error!("{later}");
                    Err(err)
                }
                (Err(err), Ok(())) => Err(err),
            });

        match (written, restored) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(err)) => Err(err),
            (Err(err), restored) => {
                if let Err(restore_err) = restored {
                    error!("{restore_err}");
                }
                Err(DebuggerError::MemoryAccessDenied {
                    address,
                    details: format!("vm_write failed: {err}"),
                })
            }
        }
    }

    /// Regions holding every byte of `[address, end)`, in address order.
    ///
    /// A write that straddles two mappings touches both; each keeps its own
    /// protection so it can be put back separately.
    fn regions_covering(&self, task: TaskHandle, address: Address, end: Address) -> Result<SmallVec<[RegionInfo; 2]>>
    {
        let mut regions = SmallVec::new();
        let mut cursor = address;
        while cursor < end {
            let region = self
                .backend
                .region_info(task, cursor)
                .map_err(|err| DebuggerError::MemoryAccessDenied {
                    address,
                    details: format!("mach_vm_region failed: {err}"),
                })?;
            if !region.contains(cursor) {
                return Err(DebuggerError::MemoryAccessDenied {
                    address,
                    details: format!("{cursor} is not mapped (next region starts at {})", region.start),
                });
            }
            cursor = region.end();
            regions.push(region);
        }
        Ok(regions)
    }
}
