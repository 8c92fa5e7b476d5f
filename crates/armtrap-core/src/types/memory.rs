//! Memory protection and region types.

use std::fmt;
use std::ops::BitOr;

use super::Address;

/// Page protection flags (`vm_prot_t`)
///
/// The bit values match the Mach definitions so the backend can pass
/// [`Protection::bits`] straight to `mach_vm_protect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Protection(i32);

impl Protection
{
    pub const NONE: Self = Protection(0x00);
    pub const READ: Self = Protection(0x01);
    pub const WRITE: Self = Protection(0x02);
    pub const EXECUTE: Self = Protection(0x04);
    /// `VM_PROT_COPY`: make a private copy-on-write mapping before writing
    pub const COPY: Self = Protection(0x10);

    pub const fn from_bits(bits: i32) -> Self
    {
        Protection(bits)
    }

    pub const fn bits(self) -> i32
    {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Protection
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self
    {
        Protection(self.0 | rhs.0)
    }
}

impl fmt::Display for Protection
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let flag = |bit: Protection, c: char| if self.contains(bit) { c } else { '-' };
        write!(f, "{}{}{}", flag(Self::READ, 'r'), flag(Self::WRITE, 'w'), flag(Self::EXECUTE, 'x'))?;
        if self.contains(Self::COPY) {
            f.write_str("c")?;
        }
        Ok(())
    }
}

/// The region `mach_vm_region()` reports for an address
///
/// If `address` is unmapped the kernel returns the next region above it, so
/// `start` may be greater than the address that was queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionInfo
{
    pub start: Address,
    pub size: u64,
    pub protection: Protection,
    pub max_protection: Protection,
}

impl RegionInfo
{
    /// Whether `address` falls inside this region.
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address.value() - self.start.value() < self.size
    }

    /// First address past the region.
    pub fn end(&self) -> Address
    {
        Address::new(self.start.value().saturating_add(self.size))
    }
}
