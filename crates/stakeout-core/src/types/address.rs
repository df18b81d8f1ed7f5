//! Memory address and address-range types.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed memory address
///
/// This wrapper around `u64` provides type safety when working with memory
/// addresses. It prevents accidentally mixing addresses with other `u64`
/// values (like sizes, slot indices, or kernel object ids).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// Used as the cleared value of a disabled debug-register slot.
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

    /// Align this address down to `alignment` (must be a power of two)
    pub const fn align_down(self, alignment: u64) -> Self
    {
        Address(self.0 & !(alignment - 1))
    }

    /// Add an offset to this address, checking for overflow
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
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
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, offset: u64) -> Address
    {
        Address(self.0 + offset)
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, offset: u64) -> Address
    {
        Address(self.0 - offset)
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

/// Half-open memory range `[begin, end)`
///
/// Watchpoints are declared over ranges. The codec may install a range wider
/// than the one requested (the hardware watches aligned windows), so ranges
/// are compared structurally, never by identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressRange
{
    begin: Address,
    end: Address,
}

impl AddressRange
{
    /// Create a range from raw begin/end values.
    ///
    /// An `end` before `begin` is normalized to the empty range at `begin`.
    pub fn new(begin: u64, end: u64) -> Self
    {
        if end < begin {
            return AddressRange {
                begin: Address::new(begin),
                end: Address::new(begin),
            };
        }
        AddressRange {
            begin: Address::new(begin),
            end: Address::new(end),
        }
    }

    /// Create a range from a base address and a size in bytes.
    pub fn from_base_and_size(base: Address, size: u64) -> Self
    {
        AddressRange {
            begin: base,
            end: base + size,
        }
    }

    /// First address in the range.
    pub const fn begin(&self) -> Address
    {
        self.begin
    }

    /// One past the last address in the range.
    pub const fn end(&self) -> Address
    {
        self.end
    }

    /// Size of the range in bytes.
    pub const fn size(&self) -> u64
    {
        self.end.value() - self.begin.value()
    }

    /// Whether the range covers no bytes.
    pub const fn is_empty(&self) -> bool
    {
        self.begin.value() == self.end.value()
    }

    /// Whether `address` falls within the range.
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.begin && address < self.end
    }

    /// Whether `other` is fully covered by this range.
    pub fn contains_range(&self, other: &AddressRange) -> bool
    {
        other.begin >= self.begin && other.end <= self.end
    }
}

impl fmt::Display for AddressRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}
