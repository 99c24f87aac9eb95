//! Execution Engine
//!
//! Owns the eight registers, the program counter and the running
//! flag, and drives the fetch-decode-execute cycle (spec.md §4.3).
//! All array operations are delegated to the `ArrayTable`; all I/O is
//! delegated to the `InputChannel`/`OutputChannel` the machine was
//! constructed with.

use thiserror::Error;
use tracing::{debug, trace};

use crate::array_table::{ArrayError, ArrayTable};
use crate::decode::{decode, Instruction, Operator, Registers};
use crate::io::{InputChannel, IoError, OutputChannel};

const NUM_REGISTERS: usize = 8;

#[derive(Error, Debug)]
pub enum MachineError {
    #[error("program counter {pc} is out of bounds for the code array: {source}")]
    OutOfBoundsCode { pc: u32, #[source] source: ArrayError },
    #[error("array access failed: {0}")]
    Array(#[from] ArrayError),
    #[error("division by zero at pc={pc}")]
    DivideByZero { pc: u32 },
    #[error("output value {value} at pc={pc} exceeds a single byte (0-255)")]
    BadOutput { pc: u32, value: u32 },
    #[error("unknown operator {operator} at pc={pc}")]
    UnknownOperator { pc: u32, operator: u8 },
    #[error(transparent)]
    Io(#[from] IoError),
}

/// The abstract machine: registers, program counter, running flag,
/// and the array table backing both code and data.
pub struct Machine {
    registers: [u32; NUM_REGISTERS],
    pc: u32,
    running: bool,
    arrays: ArrayTable,
}

impl Machine {
    /// Construct a machine whose code array is loaded from `program`,
    /// a byte stream of big-endian u32 words.
    pub fn load(program: &[u8]) -> Result<Self, ArrayError> {
        let mut arrays = ArrayTable::new();
        arrays.load_program(program)?;
        Ok(Self {
            registers: [0; NUM_REGISTERS],
            pc: 0,
            running: true,
            arrays,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn register(&self, index: u8) -> u32 {
        self.registers[index as usize]
    }

    /// Set a register directly, for seeding state before `run` (tests
    /// and embedding; no operator writes a register this way).
    pub fn set_register(&mut self, index: u8, value: u32) {
        self.registers[index as usize] = value;
    }

    /// Length of array `id`, in elements. Exposed alongside `register`
    /// so callers outside the crate can observe array lifetimes (e.g.
    /// that an array survives a LOAD PROGRAM) without reaching into
    /// the array table directly.
    pub fn array_len(&self, id: u32) -> Result<u32, ArrayError> {
        self.arrays.len(id)
    }

    /// Execute one fetch-decode-execute cycle.
    fn step(
        &mut self,
        input: &mut dyn InputChannel,
        output: &mut dyn OutputChannel,
    ) -> Result<(), MachineError> {
        let fetch_pc = self.pc;
        let word = self
            .arrays
            .code_word(fetch_pc)
            .map_err(|source| MachineError::OutOfBoundsCode { pc: fetch_pc, source })?;
        self.pc = self.pc.wrapping_add(1);

        let instruction = decode(word);
        trace!(pc = fetch_pc, ?instruction, "fetched instruction");
        self.execute(fetch_pc, instruction, input, output)
    }

    fn execute(
        &mut self,
        pc: u32,
        instruction: Instruction,
        input: &mut dyn InputChannel,
        output: &mut dyn OutputChannel,
    ) -> Result<(), MachineError> {
        match instruction {
            Instruction::Orthography { a, value } => {
                self.set_register(a, value);
                Ok(())
            }
            Instruction::Standard { op, registers } => self.dispatch(pc, op, registers, input, output),
        }
    }

    fn dispatch(
        &mut self,
        pc: u32,
        op: Operator,
        Registers { a, b, c }: Registers,
        input: &mut dyn InputChannel,
        output: &mut dyn OutputChannel,
    ) -> Result<(), MachineError> {
        match op {
            Operator::ConditionalMove => {
                if self.register(c) != 0 {
                    self.set_register(a, self.register(b));
                }
                Ok(())
            }
            Operator::ArrayIndex => {
                let value = self.arrays.read(self.register(b), self.register(c))?;
                self.set_register(a, value);
                Ok(())
            }
            Operator::ArrayAmendment => {
                self.arrays
                    .write(self.register(a), self.register(b), self.register(c))?;
                Ok(())
            }
            Operator::Addition => {
                let value = self.register(b).wrapping_add(self.register(c));
                self.set_register(a, value);
                Ok(())
            }
            Operator::Multiplication => {
                let value = self.register(b).wrapping_mul(self.register(c));
                self.set_register(a, value);
                Ok(())
            }
            Operator::Division => {
                let divisor = self.register(c);
                if divisor == 0 {
                    return Err(MachineError::DivideByZero { pc });
                }
                self.set_register(a, self.register(b) / divisor);
                Ok(())
            }
            Operator::NotAnd => {
                let value = !(self.register(b) & self.register(c));
                self.set_register(a, value);
                Ok(())
            }
            Operator::Halt => {
                self.running = false;
                Ok(())
            }
            Operator::Allocation => {
                let id = self.arrays.allocate(self.register(c))?;
                debug!(id, size = self.register(c), "array allocated");
                self.set_register(b, id);
                Ok(())
            }
            Operator::Abandonment => {
                let id = self.register(c);
                self.arrays.abandon(id)?;
                debug!(id, "array abandoned");
                Ok(())
            }
            Operator::Output => {
                let value = self.register(c);
                if value > 0xFF {
                    return Err(MachineError::BadOutput { pc, value });
                }
                output.write_byte(value as u8)?;
                Ok(())
            }
            Operator::Input => {
                let value = match input.read_byte()? {
                    Some(byte) => byte as u32,
                    None => 0xFFFF_FFFF,
                };
                self.set_register(c, value);
                Ok(())
            }
            Operator::LoadProgram => {
                let source = self.register(b);
                self.arrays.replace_code_with_copy_of(source)?;
                self.pc = self.register(c);
                Ok(())
            }
            Operator::Unknown(operator) => Err(MachineError::UnknownOperator { pc, operator }),
        }
    }

    /// Run the fetch-decode-execute cycle until HALT executes or a
    /// program error aborts execution.
    pub fn run(
        &mut self,
        input: &mut dyn InputChannel,
        output: &mut dyn OutputChannel,
    ) -> Result<(), MachineError> {
        while self.running {
            self.step(input, output)?;
        }
        Ok(())
    }
}
