//! Program file loading
//!
//! Reads the "scroll" (spec.md §6): a sequence of 32-bit big-endian
//! code words with no header or padding. This is the byte-level
//! reader external collaborator — it only reads the file into bytes
//! and hands them to [`crate::machine::Machine::load`], which owns
//! the big-endian decoding and length validation.

use std::path::Path;

use thiserror::Error;

use crate::array_table::ArrayError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read program file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Malformed(#[from] ArrayError),
}

/// Read a program file from disk into its raw bytes, for use with
/// `Machine::load`.
pub fn read_program_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Unreadable {
        path: path.display().to_string(),
        source,
    })
}
