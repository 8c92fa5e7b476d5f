//! Memory address type.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Strongly typed address in the target's address space
///
/// Wrapping `u64` keeps addresses from being mixed up with sizes, counts and
/// register values, all of which are also `u64` in this crate.
///
/// ## Example
///
/// ```rust
/// use armtrap_core::types::Address;
///
/// let addr = Address::from(0x2003);
/// assert_eq!(addr.align_down(16), Address::new(0x2000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use armtrap_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Round down to a multiple of `alignment` (a power of two).
    pub const fn align_down(self, alignment: u64) -> Self
    {
        Address(self.0 & !(alignment - 1))
    }

    /// Round up to a multiple of `alignment` (a power of two), saturating at the top of the address space.
    pub const fn align_up(self, alignment: u64) -> Self
    {
        let mask = alignment - 1;
        match self.0.checked_add(mask) {
            Some(value) => Address(value & !mask),
            None => Address(u64::MAX & !mask),
        }
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(addr: Address) -> Self
    {
        addr.0
    }
}

/// Parses `0x`-prefixed hex or plain decimal, the way operators type addresses.
impl FromStr for Address
{
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        parse_u64(s).map(Address)
    }
}

/// Parse a number as `0x` hex or decimal.
pub fn parse_u64(s: &str) -> Result<u64, ParseIntError>
{
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
