//! I/O channels
//!
//! The VM's two byte-oriented channels (spec.md §6) are external
//! collaborators: this module specifies their interface as a pair of
//! traits so the Execution Engine never depends on `Stdin`/`Stdout`
//! directly, and tests can drive the machine against an in-memory
//! channel instead (in the style of the teacher's `Queue`-backed UART
//! buffer in `hart/memory.rs`).

use std::io::{self, Read, Write};

use queues::{IsQueue, Queue};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("host input channel failed: {0}")]
    Input(#[source] io::Error),
    #[error("host output channel failed: {0}")]
    Output(#[source] io::Error),
}

/// A source of input bytes, one at a time.
pub trait InputChannel {
    /// Read one byte, or `None` on end-of-stream.
    fn read_byte(&mut self) -> Result<Option<u8>, IoError>;
}

/// A sink for output bytes, one at a time.
pub trait OutputChannel {
    fn write_byte(&mut self, byte: u8) -> Result<(), IoError>;
}

/// Reads from the process's standard input.
#[derive(Debug, Default)]
pub struct Stdin;

impl InputChannel for Stdin {
    fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
        let mut buf = [0u8; 1];
        match io::stdin().read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) => Err(IoError::Input(e)),
        }
    }
}

/// Writes to the process's standard output.
#[derive(Debug, Default)]
pub struct Stdout;

impl OutputChannel for Stdout {
    fn write_byte(&mut self, byte: u8) -> Result<(), IoError> {
        io::stdout().write_all(&[byte]).map_err(IoError::Output)
    }
}

/// An in-memory input channel, for tests and embedding. Bytes are
/// served in FIFO order; once drained, every further read reports
/// end-of-stream.
#[derive(Debug, Default)]
pub struct BufferedInput {
    queue: Queue<u8>,
}

impl BufferedInput {
    pub fn from_bytes(bytes: impl IntoIterator<Item = u8>) -> Self {
        let mut queue = Queue::new();
        for byte in bytes {
            queue.add(byte).expect("unbounded queue accepts any push");
        }
        Self { queue }
    }
}

impl InputChannel for BufferedInput {
    fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
        Ok(self.queue.remove().ok())
    }
}

/// An in-memory output channel that collects written bytes, for
/// tests and embedding.
#[derive(Debug, Default)]
pub struct BufferedOutput {
    bytes: Vec<u8>,
}

impl BufferedOutput {
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl OutputChannel for BufferedOutput {
    fn write_byte(&mut self, byte: u8) -> Result<(), IoError> {
        self.bytes.push(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_input_serves_bytes_then_eof() {
        let mut input = BufferedInput::from_bytes([1, 2]);
        assert_eq!(input.read_byte().unwrap(), Some(1));
        assert_eq!(input.read_byte().unwrap(), Some(2));
        assert_eq!(input.read_byte().unwrap(), None);
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[test]
    fn buffered_output_collects_written_bytes() {
        let mut output = BufferedOutput::default();
        output.write_byte(b'Z').unwrap();
        output.write_byte(b'!').unwrap();
        assert_eq!(output.into_bytes(), vec![b'Z', b'!']);
    }
}
