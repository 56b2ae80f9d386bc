use crate::error::RuntimeError;
use crate::value::Value;

/// Sparse, auto-growing address -> [`Value`] map that doubles as a frame's
/// symbol table for jump markers. Address 0 is reserved: a user opcode can
/// never read or write it, though the backing store is still initialized
/// through it on growth.
#[derive(Debug)]
pub struct Memory {
    cells: Vec<Value>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            cells: vec![Value::Int(0)],
        }
    }
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.cells.len() {
            self.cells.resize_with(index + 1, || Value::Int(0));
        }
    }

    pub fn get(&mut self, index: usize) -> Result<Value, RuntimeError> {
        if index == 0 {
            return Err(RuntimeError::ReservedAccess);
        }
        self.ensure_capacity(index);
        Ok(self.cells[index].clone())
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<(), RuntimeError> {
        if index == 0 {
            return Err(RuntimeError::ReservedAccess);
        }
        self.ensure_capacity(index);
        self.cells[index] = value;
        Ok(())
    }

    /// All non-reserved cells in address order, for step-mode tracing.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.cells.iter().enumerate().skip(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_address_zero_fails() {
        let mut memory = Memory::new();
        assert!(matches!(memory.get(0), Err(RuntimeError::ReservedAccess)));
    }

    #[test]
    fn writing_address_zero_fails() {
        let mut memory = Memory::new();
        assert!(matches!(
            memory.set(0, Value::Int(1)),
            Err(RuntimeError::ReservedAccess)
        ));
    }

    #[test]
    fn reading_unwritten_cell_grows_and_yields_zero() {
        let mut memory = Memory::new();
        assert_eq!(memory.get(100).unwrap(), Value::Int(0));
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut memory = Memory::new();
        memory.set(1, Value::Int(5)).unwrap();
        assert_eq!(memory.get(1).unwrap(), Value::Int(5));
    }
}
