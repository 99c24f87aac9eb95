#![forbid(unsafe_code)]

//! Interpreter core for the 32-bit Universal Machine abstract
//! architecture: a register machine that fetches 32-bit big-endian
//! code words from an array-backed code segment and executes one of
//! 14 operators per cycle until HALT.
//!
//! The three components are, leaves first: [`array_table`] (owns all
//! mutable arrays, including the code array at identifier 0),
//! [`decode`] (a pure word-to-instruction decoder), and [`machine`]
//! (the fetch-decode-execute engine, dispatching to the array table
//! and to the [`io`] channels). [`loader`] is the thin external
//! collaborator that turns a program file on disk into the bytes
//! `machine::Machine::load` expects.

pub mod array_table;
pub mod decode;
pub mod io;
pub mod loader;
pub mod machine;
