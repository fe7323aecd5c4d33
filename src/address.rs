//! Memory addresses. Programs compute addresses as signed values, while memory is indexed by
//! `usize`, so every effective address passes through `Address::try_from_value` exactly once.

use std::fmt::{Display, Formatter};
use std::ops::Add;

use crate::error::IntcodeError;
use crate::Value;

// `AddressNumberType` is `usize`, as it is naturally an index into a memory store.
pub type AddressNumberType = usize;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Address(pub AddressNumberType);

impl Address {
  /// Converts a program value to an address. Negative values are never clamped.
  pub fn try_from_value(value: Value) -> Result<Address, IntcodeError> {
    match value < 0 {
      true  => Err(IntcodeError::NegativeAddress(value)),
      false => Ok(Address(value as AddressNumberType))
    }
  }

  /// Converts the address to an index into the memory vector.
  pub fn idx(&self) -> AddressNumberType {
    self.0
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}]", self.0)
  }
}

// Increment an address
impl Add<AddressNumberType> for Address {
  type Output = Address;
  fn add(self, rhs: AddressNumberType) -> Address {
    Address(self.0 + rhs)
  }
}
