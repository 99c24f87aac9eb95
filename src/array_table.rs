//! Array Table
//!
//! Owns every mutable data array the machine can address, including
//! the code array at identifier 0 (see module docs in `lib.rs`).
//! Identifiers are allocated from a monotonically increasing counter
//! backed by a free list of abandoned ids, so allocation and freeing
//! are both O(1) and no live identifier is ever reused (spec.md §9,
//! "Source pattern: identifier allocation by linear scan").

use std::collections::HashMap;

use thiserror::Error;

/// Identifier reserved for the code array. Never returned by `allocate`.
pub const CODE_ARRAY: u32 = 0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArrayError {
    #[error("program file length {0} is not a multiple of 4")]
    MalformedProgram(usize),
    #[error("array {0} is not currently allocated")]
    UseAfterFree(u32),
    #[error("offset {offset} is out of bounds for array {id} of length {len}")]
    OutOfBounds { id: u32, offset: u32, len: u32 },
    #[error("attempted to free array 0 (the code array)")]
    FreeOfZero,
    #[error("the identifier space is exhausted")]
    IdentifiersExhausted,
}

/// Owns all arrays, including the code array at identifier 0.
///
/// `next_id` is the lowest identifier never yet handed out; `free_ids`
/// holds identifiers abandoned by `abandon` and available for reuse.
/// Popping from the free list before bumping `next_id` keeps the
/// identifier space bounded by the high-water mark of concurrently
/// live arrays rather than by the total number of allocations made
/// over the program's lifetime.
#[derive(Debug, Default)]
pub struct ArrayTable {
    arrays: HashMap<u32, Vec<u32>>,
    free_ids: Vec<u32>,
    next_id: u32,
}

impl ArrayTable {
    /// Construct a table with an empty code array at identifier 0.
    pub fn new() -> Self {
        let mut arrays = HashMap::new();
        arrays.insert(CODE_ARRAY, Vec::new());
        Self {
            arrays,
            free_ids: Vec::new(),
            next_id: 1,
        }
    }

    /// Initialize the code array from a byte stream of big-endian u32
    /// words. Fails if the length is not a multiple of 4.
    pub fn load_program(&mut self, bytes: &[u8]) -> Result<(), ArrayError> {
        if bytes.len() % 4 != 0 {
            return Err(ArrayError::MalformedProgram(bytes.len()));
        }
        let words = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes(chunk.try_into().unwrap()))
            .collect();
        self.arrays.insert(CODE_ARRAY, words);
        Ok(())
    }

    /// Allocate a new zero-filled array of the requested length and
    /// return its (non-zero) identifier.
    pub fn allocate(&mut self, size: u32) -> Result<u32, ArrayError> {
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id = self
                    .next_id
                    .checked_add(1)
                    .ok_or(ArrayError::IdentifiersExhausted)?;
                id
            }
        };
        self.arrays.insert(id, vec![0u32; size as usize]);
        Ok(id)
    }

    /// Free the array at `id`. `id` becomes available for reuse by a
    /// subsequent `allocate`.
    pub fn abandon(&mut self, id: u32) -> Result<(), ArrayError> {
        if id == CODE_ARRAY {
            return Err(ArrayError::FreeOfZero);
        }
        if self.arrays.remove(&id).is_none() {
            return Err(ArrayError::UseAfterFree(id));
        }
        self.free_ids.push(id);
        Ok(())
    }

    fn get(&self, id: u32) -> Result<&Vec<u32>, ArrayError> {
        self.arrays.get(&id).ok_or(ArrayError::UseAfterFree(id))
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut Vec<u32>, ArrayError> {
        self.arrays.get_mut(&id).ok_or(ArrayError::UseAfterFree(id))
    }

    /// Read a single element of array `id` at `offset`.
    pub fn read(&self, id: u32, offset: u32) -> Result<u32, ArrayError> {
        let array = self.get(id)?;
        array
            .get(offset as usize)
            .copied()
            .ok_or(ArrayError::OutOfBounds {
                id,
                offset,
                len: array.len() as u32,
            })
    }

    /// Write a single element of array `id` at `offset`.
    pub fn write(&mut self, id: u32, offset: u32, value: u32) -> Result<(), ArrayError> {
        let array = self.get_mut(id)?;
        let len = array.len() as u32;
        let slot = array
            .get_mut(offset as usize)
            .ok_or(ArrayError::OutOfBounds { id, offset, len })?;
        *slot = value;
        Ok(())
    }

    /// Length of array `id`, in elements.
    pub fn len(&self, id: u32) -> Result<u32, ArrayError> {
        Ok(self.get(id)?.len() as u32)
    }

    /// Overwrite the contents of the code array with a copy of the
    /// array at `id`. A no-op when `id` is already 0 (spec.md §8,
    /// invariant 5). The source array, if non-zero, remains allocated
    /// under its own identifier afterwards.
    pub fn replace_code_with_copy_of(&mut self, id: u32) -> Result<(), ArrayError> {
        if id == CODE_ARRAY {
            return Ok(());
        }
        let copy = self.get(id)?.clone();
        self.arrays.insert(CODE_ARRAY, copy);
        Ok(())
    }

    /// Read a single word from the code array at `pc`, used by the
    /// Execution Engine's fetch step.
    pub fn code_word(&self, pc: u32) -> Result<u32, ArrayError> {
        self.read(CODE_ARRAY, pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_array_present_from_construction() {
        let table = ArrayTable::new();
        assert_eq!(table.len(CODE_ARRAY).unwrap(), 0);
    }

    #[test]
    fn load_program_rejects_misaligned_length() {
        let mut table = ArrayTable::new();
        let err = table.load_program(&[0, 1, 2]).unwrap_err();
        assert_eq!(err, ArrayError::MalformedProgram(3));
    }

    #[test]
    fn load_program_decodes_big_endian_words() {
        let mut table = ArrayTable::new();
        table.load_program(&[0x00, 0x00, 0x00, 0x01, 0xff, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(table.code_word(0).unwrap(), 1);
        assert_eq!(table.code_word(1).unwrap(), 0xff00_0000);
    }

    #[test]
    fn allocate_returns_nonzero_zero_filled_array() {
        let mut table = ArrayTable::new();
        let id = table.allocate(4).unwrap();
        assert_ne!(id, CODE_ARRAY);
        for offset in 0..4 {
            assert_eq!(table.read(id, offset).unwrap(), 0);
        }
    }

    #[test]
    fn allocate_never_reuses_a_live_identifier() {
        let mut table = ArrayTable::new();
        let a = table.allocate(1).unwrap();
        let b = table.allocate(1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn abandon_recycles_the_identifier() {
        let mut table = ArrayTable::new();
        let a = table.allocate(1).unwrap();
        table.abandon(a).unwrap();
        let b = table.allocate(1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn abandon_zero_is_an_error() {
        let mut table = ArrayTable::new();
        assert_eq!(table.abandon(CODE_ARRAY).unwrap_err(), ArrayError::FreeOfZero);
    }

    #[test]
    fn use_after_free_is_detected() {
        let mut table = ArrayTable::new();
        let a = table.allocate(1).unwrap();
        table.abandon(a).unwrap();
        assert_eq!(table.read(a, 0).unwrap_err(), ArrayError::UseAfterFree(a));
        assert_eq!(
            table.write(a, 0, 1).unwrap_err(),
            ArrayError::UseAfterFree(a)
        );
    }

    #[test]
    fn out_of_bounds_offset_is_detected() {
        let mut table = ArrayTable::new();
        let a = table.allocate(2).unwrap();
        assert_eq!(
            table.read(a, 2).unwrap_err(),
            ArrayError::OutOfBounds { id: a, offset: 2, len: 2 }
        );
    }

    #[test]
    fn replace_code_with_copy_of_zero_is_a_no_op() {
        let mut table = ArrayTable::new();
        table.load_program(&[0, 0, 0, 1]).unwrap();
        table.replace_code_with_copy_of(CODE_ARRAY).unwrap();
        assert_eq!(table.code_word(0).unwrap(), 1);
    }

    #[test]
    fn replace_code_with_copy_of_id_duplicates_not_aliases() {
        let mut table = ArrayTable::new();
        let src = table.allocate(2).unwrap();
        table.write(src, 0, 0x5A).unwrap();
        table.write(src, 1, 0x70).unwrap();

        table.replace_code_with_copy_of(src).unwrap();
        assert_eq!(table.len(CODE_ARRAY).unwrap(), 2);
        assert_eq!(table.code_word(0).unwrap(), 0x5A);

        // Source array remains allocated under its own id, and
        // mutating the code array must not alias it.
        table.write(CODE_ARRAY, 0, 0xFF).unwrap();
        assert_eq!(table.read(src, 0).unwrap(), 0x5A);
    }
}
