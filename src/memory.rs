//! Memory of the machine: a single growable store of values holding both code and data.
//!
//! Any non-negative address is valid. Reading or writing past the end grows the store,
//! filling the gap with zeros, so a fresh address always reads as 0.
//!
//! Cells are kept in a contiguous vector that grows at most `DENSE_WINDOW` cells past its
//! current end at a time. Writes further out than that go to a sparse map instead, so an
//! arbitrarily large address never allocates the gap below it. Once the vector grows over a
//! sparse cell, the cell moves into the vector.

use std::collections::BTreeMap;

use crate::address::Address;
use crate::error::IntcodeError;
use crate::Value;

const DENSE_WINDOW: usize = 1 << 16;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Memory {
  cells  : Vec<Value>,
  sparse : BTreeMap<usize, Value>
}

impl Memory {

  pub fn new(image: Vec<Value>) -> Memory {
    Memory {
      cells  : image,
      sparse : BTreeMap::new()
    }
  }

  /// One past the highest address that holds a cell.
  pub fn len(&self) -> usize {
    match self.sparse.keys().next_back() {
      Some(last) => self.cells.len().max(last + 1),
      None       => self.cells.len()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The contiguous cells starting at address 0. Cells written far past the end of these are
  /// not included.
  pub fn as_slice(&self) -> &[Value] {
    &self.cells
  }

  /// Looks up `address` without growing the store.
  pub fn get(&self, address: usize) -> Value {
    match self.cells.get(address) {
      Some(value) => *value,
      None        => self.sparse.get(&address).copied().unwrap_or(0)
    }
  }

  /// Reads the value at `address`, growing the store if the address is past the end.
  pub fn read(&mut self, address: Value) -> Result<Value, IntcodeError> {
    let address = Address::try_from_value(address)?;
    Ok(self.read_at(address))
  }

  /// Writes `value` at `address`, growing the store if the address is past the end.
  pub fn write(&mut self, address: Value, value: Value) -> Result<(), IntcodeError> {
    let address = Address::try_from_value(address)?;
    self.write_at(address, value);
    Ok(())
  }

  pub(crate) fn read_at(&mut self, address: Address) -> Value {
    match self.is_near(address) {
      true  => {
        self.grow_to(address);
        self.cells[address.idx()]
      }
      // An unwritten far cell reads 0 and stays unrecorded.
      false => self.get(address.idx())
    }
  }

  pub(crate) fn write_at(&mut self, address: Address, value: Value) {
    match self.is_near(address) {
      true  => {
        self.grow_to(address);
        self.cells[address.idx()] = value;
      }
      false => {
        self.sparse.insert(address.idx(), value);
      }
    }
  }

  fn is_near(&self, address: Address) -> bool {
    address.idx() < self.cells.len() + DENSE_WINDOW
  }

  fn grow_to(&mut self, address: Address) {
    if address.idx() < self.cells.len() {
      return;
    }
    let length = address.idx() + 1;
    self.cells.resize(length, 0);

    let far = self.sparse.split_off(&length);
    for (index, value) in std::mem::replace(&mut self.sparse, far) {
      self.cells[index] = value;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_existing_cells(){
    let mut memory = Memory::new(vec![4, 5, 6]);
    assert_eq!(memory.read(0), Ok(4));
    assert_eq!(memory.read(2), Ok(6));
    assert_eq!(memory.len(), 3);
  }

  #[test]
  fn read_past_end_grows_with_zeros(){
    let mut memory = Memory::new(vec![1, 2]);
    assert_eq!(memory.read(9), Ok(0));
    assert_eq!(memory.len(), 10);
    assert_eq!(memory.as_slice(), &[1, 2, 0, 0, 0, 0, 0, 0, 0, 0]);
  }

  #[test]
  fn write_past_end_grows_with_zeros(){
    let mut memory = Memory::default();
    memory.write(4, 17).unwrap();
    assert_eq!(memory.as_slice(), &[0, 0, 0, 0, 17]);
    memory.write(1, -3).unwrap();
    assert_eq!(memory.as_slice(), &[0, -3, 0, 0, 17]);
  }

  #[test]
  fn unwritten_addresses_read_zero(){
    let mut memory = Memory::new(vec![7; 3]);
    for address in 3..200 {
      assert_eq!(memory.read(address), Ok(0));
    }
  }

  #[test]
  fn negative_addresses_fail(){
    let mut memory = Memory::new(vec![1, 2, 3]);
    for address in &[-1, -2, -1000] {
      assert_eq!(memory.read(*address), Err(IntcodeError::NegativeAddress(*address)));
      assert_eq!(memory.write(*address, 9), Err(IntcodeError::NegativeAddress(*address)));
    }
    assert_eq!(memory.as_slice(), &[1, 2, 3]);
  }

  #[test]
  fn far_addresses_do_not_allocate_the_gap(){
    let far = Value::max_value() / 2;
    let mut memory = Memory::new(vec![1, 2]);
    assert_eq!(memory.read(far), Ok(0));
    assert_eq!(memory.len(), 2);

    memory.write(far, 5).unwrap();
    assert_eq!(memory.read(far), Ok(5));
    assert_eq!(memory.get(far as usize), 5);
    assert_eq!(memory.len(), far as usize + 1);
    assert_eq!(memory.as_slice(), &[1, 2]);
  }

  #[test]
  fn dense_growth_absorbs_sparse_cells(){
    let mut memory = Memory::default();
    let far = 3 * DENSE_WINDOW as Value;
    memory.write(far, 8).unwrap();
    assert!(memory.as_slice().is_empty());

    // Walk the dense end out past the sparse cell.
    let mut address = 0;
    while address <= far {
      memory.write(address, memory.get(address as usize)).unwrap();
      address += DENSE_WINDOW as Value / 2;
    }
    memory.write(far + 1, 0).unwrap();
    assert_eq!(memory.as_slice()[far as usize], 8);
    assert_eq!(memory.len(), far as usize + 2);
  }
}
