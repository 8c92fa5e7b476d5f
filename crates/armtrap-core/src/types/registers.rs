//! ARM64 thread and debug register state.
//!
//! Both structures mirror the kernel layouts returned by `thread_get_state()`
//! (`ARM_THREAD_STATE64`, 68 words and `ARM_DEBUG_STATE64`, 130 words). The
//! kernel hands them over as `natural_t` (u32) arrays, so each 64-bit field
//! is two consecutive words, low word first.

use std::fmt;
use std::str::FromStr;

use crate::error::{DebuggerError, Result};

/// Number of general purpose registers in the snapshot (x0-x28).
pub const GENERAL_REGISTER_COUNT: usize = 29;

/// `ARM_THREAD_STATE64_COUNT`
pub const THREAD_STATE_WORDS: usize = 68;

/// `ARM_DEBUG_STATE64_COUNT`
pub const DEBUG_STATE_WORDS: usize = 130;

/// Number of comparator pairs the kernel structure reserves per class.
///
/// Only the first six are backed by hardware on Apple Silicon.
pub const DEBUG_REGISTER_PAIRS: usize = 16;

// Word indices within ARM_THREAD_STATE64
const FP_WORD: usize = 58;
const LR_WORD: usize = 60;
const SP_WORD: usize = 62;
const PC_WORD: usize = 64;
const CPSR_WORD: usize = 66;
const PAD_WORD: usize = 67;

fn read_u64(words: &[u32], index: usize) -> u64
{
    u64::from(words[index]) | (u64::from(words[index + 1]) << 32)
}

#[allow(clippy::cast_possible_truncation)]
fn write_u64(words: &mut [u32], index: usize, value: u64)
{
    words[index] = value as u32;
    words[index + 1] = (value >> 32) as u32;
}

/// Full CPU register snapshot of one thread
///
/// Fetched fresh for every command and never cached. `fp` and `sp` are shown
/// by `register read` but are not part of the writable namespace.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterSnapshot
{
    /// x0-x28
    pub x: [u64; GENERAL_REGISTER_COUNT],
    /// x29
    pub fp: u64,
    /// x30
    pub lr: u64,
    pub sp: u64,
    pub pc: u64,
    pub cpsr: u32,
    /// Reserved padding word of the kernel structure
    pub pad: u32,
}

impl RegisterSnapshot
{
    /// Decode from the `ARM_THREAD_STATE64` word array.
    pub fn from_words(words: &[u32; THREAD_STATE_WORDS]) -> Self
    {
        let mut x = [0u64; GENERAL_REGISTER_COUNT];
        for (i, reg) in x.iter_mut().enumerate() {
            *reg = read_u64(words, i * 2);
        }

        Self {
            x,
            fp: read_u64(words, FP_WORD),
            lr: read_u64(words, LR_WORD),
            sp: read_u64(words, SP_WORD),
            pc: read_u64(words, PC_WORD),
            cpsr: words[CPSR_WORD],
            pad: words[PAD_WORD],
        }
    }

    /// Encode into the `ARM_THREAD_STATE64` word array for `thread_set_state()`.
    pub fn to_words(&self) -> [u32; THREAD_STATE_WORDS]
    {
        let mut words = [0u32; THREAD_STATE_WORDS];
        for (i, reg) in self.x.iter().enumerate() {
            write_u64(&mut words, i * 2, *reg);
        }
        write_u64(&mut words, FP_WORD, self.fp);
        write_u64(&mut words, LR_WORD, self.lr);
        write_u64(&mut words, SP_WORD, self.sp);
        write_u64(&mut words, PC_WORD, self.pc);
        words[CPSR_WORD] = self.cpsr;
        words[PAD_WORD] = self.pad;
        words
    }

    /// Value of a named register, `None` for an out-of-range `X` index.
    pub fn get(&self, name: RegisterName) -> Option<u64>
    {
        match name {
            RegisterName::X(n) => self.x.get(usize::from(n)).copied(),
            RegisterName::Lr => Some(self.lr),
            RegisterName::Pc => Some(self.pc),
            RegisterName::Cpsr => Some(u64::from(self.cpsr)),
            RegisterName::Pad => Some(u64::from(self.pad)),
        }
    }

    /// Set a named register.
    ///
    /// ## Errors
    ///
    /// - `ValueOutOfRange`: `value` doesn't fit a 32-bit register (cpsr, pad)
    /// - `UnknownRegister`: `X` index above 28
    pub fn set(&mut self, name: RegisterName, value: u64) -> Result<()>
    {
        let narrow = || u32::try_from(value).map_err(|_| DebuggerError::ValueOutOfRange { register: name, value });

        match name {
            RegisterName::X(n) => {
                let slot = self
                    .x
                    .get_mut(usize::from(n))
                    .ok_or_else(|| DebuggerError::UnknownRegister(name.to_string()))?;
                *slot = value;
            }
            RegisterName::Lr => self.lr = value,
            RegisterName::Pc => self.pc = value,
            RegisterName::Cpsr => self.cpsr = narrow()?,
            RegisterName::Pad => self.pad = narrow()?,
        }
        Ok(())
    }
}

impl fmt::Display for RegisterSnapshot
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        for (i, value) in self.x.iter().enumerate() {
            writeln!(f, "{:<4} = 0x{value:x}", format!("x{i}"))?;
        }
        writeln!(f, "{:<4} = 0x{:x}", "fp", self.fp)?;
        writeln!(f, "{:<4} = 0x{:x}", "lr", self.lr)?;
        writeln!(f, "{:<4} = 0x{:x}", "sp", self.sp)?;
        writeln!(f, "{:<4} = 0x{:x}", "pc", self.pc)?;
        writeln!(f, "{:<4} = 0x{:x}", "cpsr", self.cpsr)?;
        write!(f, "{:<4} = 0x{:x}", "pad", self.pad)
    }
}

/// Register names accepted by `register read <name>` and `register write`
///
/// The namespace is x0-x28, lr, pc, cpsr and pad. Every name maps to exactly
/// one snapshot field and every field has exactly one name; `x05` is not an
/// alias of `x5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterName
{
    /// General purpose register x0-x28
    X(u8),
    Lr,
    Pc,
    Cpsr,
    Pad,
}

const NAMED_REGISTERS: [(&str, RegisterName); 4] = [
    ("lr", RegisterName::Lr),
    ("pc", RegisterName::Pc),
    ("cpsr", RegisterName::Cpsr),
    ("pad", RegisterName::Pad),
];

impl RegisterName
{
    /// Every name in the namespace, in display order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn all() -> impl Iterator<Item = RegisterName>
    {
        (0..GENERAL_REGISTER_COUNT)
            .map(|n| RegisterName::X(n as u8))
            .chain(NAMED_REGISTERS.iter().map(|(_, name)| *name))
    }

    /// Whether the register is 32 bits wide.
    pub const fn is_32bit(self) -> bool
    {
        matches!(self, RegisterName::Cpsr | RegisterName::Pad)
    }
}

impl FromStr for RegisterName
{
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self>
    {
        if let Some((_, name)) = NAMED_REGISTERS.iter().find(|(text, _)| *text == s) {
            return Ok(*name);
        }

        let unknown = || DebuggerError::UnknownRegister(s.to_string());
        let digits = s.strip_prefix('x').ok_or_else(unknown)?;
        let n: u8 = digits.parse().map_err(|_| unknown())?;

        // Reject "x05", "x+5" and friends so each register has one spelling
        if usize::from(n) >= GENERAL_REGISTER_COUNT || n.to_string() != digits {
            return Err(unknown());
        }
        Ok(RegisterName::X(n))
    }
}

impl fmt::Display for RegisterName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            RegisterName::X(n) => write!(f, "x{n}"),
            RegisterName::Lr => f.write_str("lr"),
            RegisterName::Pc => f.write_str("pc"),
            RegisterName::Cpsr => f.write_str("cpsr"),
            RegisterName::Pad => f.write_str("pad"),
        }
    }
}

/// `arm_debug_state64_t`
///
/// Value/control register pairs for breakpoints (`bvr`/`bcr`) and
/// watchpoints (`wvr`/`wcr`), followed by `MDSCR_EL1`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugState
{
    pub bvr: [u64; DEBUG_REGISTER_PAIRS],
    pub bcr: [u64; DEBUG_REGISTER_PAIRS],
    pub wvr: [u64; DEBUG_REGISTER_PAIRS],
    pub wcr: [u64; DEBUG_REGISTER_PAIRS],
    pub mdscr_el1: u64,
}

impl DebugState
{
    /// Decode from the `ARM_DEBUG_STATE64` word array.
    pub fn from_words(words: &[u32; DEBUG_STATE_WORDS]) -> Self
    {
        let mut state = Self::default();
        let banks = [&mut state.bvr, &mut state.bcr, &mut state.wvr, &mut state.wcr];
        for (bank_index, bank) in banks.into_iter().enumerate() {
            let base = bank_index * DEBUG_REGISTER_PAIRS * 2;
            for (i, reg) in bank.iter_mut().enumerate() {
                *reg = read_u64(words, base + i * 2);
            }
        }
        state.mdscr_el1 = read_u64(words, DEBUG_STATE_WORDS - 2);
        state
    }

    /// Encode into the `ARM_DEBUG_STATE64` word array for `thread_set_state()`.
    pub fn to_words(&self) -> [u32; DEBUG_STATE_WORDS]
    {
        let mut words = [0u32; DEBUG_STATE_WORDS];
        let banks = [&self.bvr, &self.bcr, &self.wvr, &self.wcr];
        for (bank_index, bank) in banks.into_iter().enumerate() {
            let base = bank_index * DEBUG_REGISTER_PAIRS * 2;
            for (i, reg) in bank.iter().enumerate() {
                write_u64(&mut words, base + i * 2, *reg);
            }
        }
        write_u64(&mut words, DEBUG_STATE_WORDS - 2, self.mdscr_el1);
        words
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_register_names_round_trip()
    {
        for name in RegisterName::all() {
            let parsed: RegisterName = name.to_string().parse().unwrap();
            assert_eq!(parsed, name);
        }
        assert_eq!(RegisterName::all().count(), 33);
    }

    #[test]
    fn test_register_names_are_injective()
    {
        // Give every field a distinct value through its name; a duplicated
        // mapping would leave one value missing.
        let mut snapshot = RegisterSnapshot::default();
        for (i, name) in RegisterName::all().enumerate() {
            snapshot.set(name, i as u64 + 1).unwrap();
        }

        let values: HashSet<u64> = RegisterName::all().map(|name| snapshot.get(name).unwrap()).collect();
        assert_eq!(values.len(), RegisterName::all().count());
        assert_eq!(snapshot.pad, 33);
        assert_eq!(snapshot.pc, 31);
    }

    #[test]
    fn test_register_name_rejects_aliases()
    {
        for bad in ["x29", "x30", "x05", "x+5", "X5", "fp", "sp", "", "x", "pcc"] {
            assert!(bad.parse::<RegisterName>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_thread_state_word_layout()
    {
        let mut words = [0u32; THREAD_STATE_WORDS];
        words[10] = 0x42; // x5 low word
        words[64] = 0x1000; // pc low word
        words[65] = 0x1; // pc high word
        words[66] = 0x6000_0000;

        let snapshot = RegisterSnapshot::from_words(&words);
        assert_eq!(snapshot.x[5], 0x42);
        assert_eq!(snapshot.pc, 0x1_0000_1000);
        assert_eq!(snapshot.cpsr, 0x6000_0000);
        assert_eq!(snapshot.to_words(), words);
        assert_eq!(std::mem::size_of::<RegisterSnapshot>(), THREAD_STATE_WORDS * 4);
    }

    #[test]
    fn test_debug_state_word_layout()
    {
        let mut state = DebugState::default();
        state.bvr[0] = 0x1000;
        state.bcr[0] = 0x1e5;
        state.wvr[5] = 0xdead_beef_0000;
        state.wcr[5] = 0x1ffd;

        let words = state.to_words();
        assert_eq!(words[0], 0x1000);
        assert_eq!(words[32], 0x1e5);
        assert_eq!(words[64 + 10], 0xbeef_0000);
        assert_eq!(words[64 + 11], 0xdead);
        assert_eq!(DebugState::from_words(&words), state);
        assert_eq!(std::mem::size_of::<DebugState>(), DEBUG_STATE_WORDS * 4);
    }

    #[test]
    fn test_narrow_register_rejects_wide_value()
    {
        let mut snapshot = RegisterSnapshot::default();
        let err = snapshot.set(RegisterName::Cpsr, 0x1_0000_0000).unwrap_err();
        assert!(matches!(err, DebuggerError::ValueOutOfRange { .. }));
        assert_eq!(snapshot, RegisterSnapshot::default());
    }
}
