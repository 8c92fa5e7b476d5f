//! # Breakpoint/Watchpoint Manager
//!
//! Two independent tables, one per comparator class, each backed by the
//! value/control register pairs of `ARM_DEBUG_STATE64`:
//!
//! | Kind       | Value register | Control register | Enabled encoding |
//! |------------|----------------|------------------|------------------|
//! | Breakpoint | `DBGBVR<n>`    | `DBGBCR<n>`      | `0x1E5`          |
//! | Watchpoint | `DBGWVR<n>`    | `DBGWCR<n>`      | `0x1FFD`         |
//!
//! Apple Silicon implements six comparators of each kind, so each table
//! holds at most [`MAX_SLOTS`] entries. Slots fill from index 0 upward and
//! `remove` always clears the most recently added one; there is no lookup by
//! address.
//!
//! ## Control register bits
//!
//! - bit 0: enable
//! - bits 1-2: privilege mode control, `0b10` = EL0 (user) only
//! - bits 3-4 (watchpoints): load/store control, `0b11` = reads and writes
//! - bits 5-8 (breakpoints): byte address select, `0b1111` = whole instruction
//! - bits 5-12 (watchpoints): byte address select, `0xFF` = eight bytes
//!
//! Disabled is all-zero in both registers.

use std::fmt;

use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::error::{DebuggerError, Result};
use crate::platform::TargetBackend;
use crate::session::Session;
use crate::threads::with_suspended_primary;
use crate::types::{Address, DebugState, ThreadHandle};

/// Hardware comparators per kind on Apple Silicon.
pub const MAX_SLOTS: usize = 6;

/// `DBGBCR`: E | PMC=EL0 | BAS=0b1111
pub const BCR_ENABLED: u64 = 0x1E5;

/// `DBGWCR`: E | PAC=EL0 | LSC=load+store | BAS=0xFF
pub const WCR_ENABLED: u64 = 0x1FFD;

/// Which comparator class a table drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind
{
    Breakpoint,
    Watchpoint,
}

impl SlotKind
{
    /// Control register value for an enabled slot of this kind.
    pub const fn enabled_encoding(self) -> u64
    {
        match self {
            SlotKind::Breakpoint => BCR_ENABLED,
            SlotKind::Watchpoint => WCR_ENABLED,
        }
    }

    /// Write `address` and the enabled encoding into pair `index`.
    pub fn arm(self, state: &mut DebugState, index: usize, address: Address)
    {
        let (value, control) = self.pair_mut(state, index);
        *value = address.value();
        *control = self.enabled_encoding();
    }

    /// Zero pair `index`.
    pub fn disarm(self, state: &mut DebugState, index: usize)
    {
        let (value, control) = self.pair_mut(state, index);
        *value = 0;
        *control = 0;
    }

    /// `(value, control)` of pair `index` as currently loaded in `state`.
    pub fn pair(self, state: &DebugState, index: usize) -> (u64, u64)
    {
        match self {
            SlotKind::Breakpoint => (state.bvr[index], state.bcr[index]),
            SlotKind::Watchpoint => (state.wvr[index], state.wcr[index]),
        }
    }

    fn pair_mut(self, state: &mut DebugState, index: usize) -> (&mut u64, &mut u64)
    {
        match self {
            SlotKind::Breakpoint => (&mut state.bvr[index], &mut state.bcr[index]),
            SlotKind::Watchpoint => (&mut state.wvr[index], &mut state.wcr[index]),
        }
    }
}

impl fmt::Display for SlotKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SlotKind::Breakpoint => f.write_str("breakpoint"),
            SlotKind::Watchpoint => f.write_str("watchpoint"),
        }
    }
}

/// One active entry of a slot table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot
{
    pub index: usize,
    pub address: Address,
    pub enabled: bool,
}

impl fmt::Display for Slot
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let state = if self.enabled { "enabled" } else { "disabled" };
        write!(f, "{} {:#x} ({state})", self.index, self.address)
    }
}

/// Addresses armed in one comparator class, in slot order
///
/// Only the session changes a table, and only after the hardware accepted
/// the new debug state.
#[derive(Debug, Clone)]
pub struct SlotTable
{
    kind: SlotKind,
    addresses: SmallVec<[Address; MAX_SLOTS]>,
}

impl SlotTable
{
    pub fn new(kind: SlotKind) -> Self
    {
        Self {
            kind,
            addresses: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> SlotKind
    {
        self.kind
    }

    /// Number of active slots.
    pub fn len(&self) -> usize
    {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.addresses.is_empty()
    }

    pub fn is_full(&self) -> bool
    {
        self.addresses.len() >= MAX_SLOTS
    }

    /// Active slots in index order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_
    {
        self.addresses.iter().enumerate().map(|(index, address)| Slot {
            index,
            address: *address,
            enabled: true,
        })
    }

    fn push(&mut self, address: Address)
    {
        self.addresses.push(address);
    }

    fn pop(&mut self) -> Option<Address>
    {
        self.addresses.pop()
    }
}

impl<B: TargetBackend> Session<B>
{
    /// Arm the next free slot of `kind` at `address`.
    ///
    /// Binds the exception channel first if needed; a bind failure is logged
    /// and the slot is armed anyway. Returns the slot index.
    ///
    /// ## Errors
    ///
    /// - `SlotExhausted`: all six slots in use; nothing changed
    /// - `RegisterStateFailed`: debug state fetch or commit failed; table unchanged
    /// - `ResumeFailed`: the slot is armed and recorded, but the thread stayed suspended
    /// - `NotAttached`, `ThreadEnumerationFailed`, `SuspendFailed`
    pub fn set_slot(&mut self, kind: SlotKind, address: Address) -> Result<usize>
    {
        let target = self.target.as_mut().ok_or(DebuggerError::NotAttached)?;
        let index = target.table(kind).len();
        if index >= MAX_SLOTS {
            return Err(DebuggerError::SlotExhausted(kind));
        }

        if let Err(err) = target.exceptions.ensure_bound(&self.backend, target.task) {
            warn!("{err}");
        }

        let backend = &self.backend;
        let mut committed = false;
        let outcome = with_suspended_primary(backend, target.task, |thread| {
            let mut state = fetch_debug_state(backend, thread)?;
            kind.arm(&mut state, index, address);
            commit_debug_state(backend, thread, &state)?;
            committed = true;
            Ok(())
        });

        // the hardware holds the slot once committed, even if the resume failed
        if committed {
            target.table_mut(kind).push(address);
            info!("Setting {kind} {index} at address {address:#x}");
        }
        outcome?;
        Ok(index)
    }

    /// Disarm the most recently armed slot of `kind`.
    ///
    /// ## Errors
    ///
    /// - `NoActiveSlot`: table is empty
    /// - `RegisterStateFailed`: debug state fetch or commit failed; table unchanged
    /// - `ResumeFailed`: the slot is disarmed and dropped, but the thread stayed suspended
    /// - `NotAttached`, `ThreadEnumerationFailed`, `SuspendFailed`
    pub fn remove_slot(&mut self, kind: SlotKind) -> Result<Slot>
    {
        let target = self.target.as_mut().ok_or(DebuggerError::NotAttached)?;
        let count = target.table(kind).len();
        if count == 0 {
            return Err(DebuggerError::NoActiveSlot(kind));
        }
        let index = count - 1;

        let backend = &self.backend;
        let mut committed = false;
        let outcome = with_suspended_primary(backend, target.task, |thread| {
            let mut state = fetch_debug_state(backend, thread)?;
            kind.disarm(&mut state, index);
            commit_debug_state(backend, thread, &state)?;
            committed = true;
            Ok(())
        });

        let removed = if committed {
            info!("Removing {kind} {index}");
            target.table_mut(kind).pop()
        } else {
            None
        };
        outcome?;
        let address = removed.ok_or(DebuggerError::NoActiveSlot(kind))?;
        Ok(Slot {
            index,
            address,
            enabled: false,
        })
    }

    /// Active slots of `kind`.
    pub fn slots(&self, kind: SlotKind) -> Result<Vec<Slot>>
    {
        Ok(self.target()?.table(kind).slots().collect())
    }
}

fn fetch_debug_state<B: TargetBackend + ?Sized>(backend: &B, thread: ThreadHandle) -> Result<DebugState>
{
    backend.get_debug_state(thread).map_err(|source| DebuggerError::RegisterStateFailed {
        operation: "read debug state",
        source,
    })
}

fn commit_debug_state<B: TargetBackend + ?Sized>(
    backend: &B,
    thread: ThreadHandle,
    state: &DebugState,
) -> Result<()>
{
    backend.set_debug_state(thread, state).map_err(|source| DebuggerError::RegisterStateFailed {
        operation: "write debug state",
        source,
    })?;
    debug!("debug state committed to thread {}", thread.0);
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_encodings()
    {
        // E, PMC=0b10, BAS=0b1111
        assert_eq!(BCR_ENABLED, 1 | (0b10 << 1) | (0b1111 << 5));
        // E, PAC=0b10, LSC=0b11, BAS=0xFF
        assert_eq!(WCR_ENABLED, 1 | (0b10 << 1) | (0b11 << 3) | (0xFF << 5));
    }

    #[test]
    fn test_kinds_use_separate_banks()
    {
        let mut state = DebugState::default();
        SlotKind::Breakpoint.arm(&mut state, 2, Address::new(0x1000));
        SlotKind::Watchpoint.arm(&mut state, 2, Address::new(0x2000));

        assert_eq!(state.bvr[2], 0x1000);
        assert_eq!(state.bcr[2], BCR_ENABLED);
        assert_eq!(state.wvr[2], 0x2000);
        assert_eq!(state.wcr[2], WCR_ENABLED);

        SlotKind::Breakpoint.disarm(&mut state, 2);
        assert_eq!(SlotKind::Breakpoint.pair(&state, 2), (0, 0));
        assert_eq!(SlotKind::Watchpoint.pair(&state, 2), (0x2000, WCR_ENABLED));
    }

    #[test]
    fn test_table_order()
    {
        let mut table = SlotTable::new(SlotKind::Breakpoint);
        table.push(Address::new(0x1000));
        table.push(Address::new(0x2000));
        let slots: Vec<Slot> = table.slots().collect();
        assert_eq!(slots[1].index, 1);
        assert_eq!(slots[1].address, Address::new(0x2000));
        assert_eq!(table.pop(), Some(Address::new(0x2000)));
        assert_eq!(table.len(), 1);
    }
}
