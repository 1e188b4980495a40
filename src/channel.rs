//! The CPU and memory contexts are joined only by a pair of unidirectional
//! byte streams, exactly as spec'd: "a sequence of fixed-width signed
//! integer cells in host byte order; no length prefix, no delimiter."
//!
//! Each direction is a plain `mpsc::channel::<u8>()`. A thin `io::Write`/
//! `io::Read` adapter sits on top of the raw byte channel, and `byteorder`
//! frames each cell as 4 native-endian bytes over that adapter — the same
//! cursor-and-byteorder idiom the disassembler uses to pull fields out of a
//! ROM buffer, here retargeted at a live channel instead of a `Vec<u8>`.

use std::io::{self, Read, Write};
use std::sync::mpsc;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::error::SimError;

struct ChannelWriter(mpsc::Sender<u8>);

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            self.0
                .send(byte)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer context gone"))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ChannelReader(mpsc::Receiver<u8>);

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        for (filled, slot) in buf.iter_mut().enumerate() {
            match self.0.recv() {
                Ok(byte) => *slot = byte,
                // Peer dropped its sender: report whatever we already have
                // as a short read, which is how the stream's EOF surfaces.
                Err(_) => return Ok(filled),
            }
        }
        Ok(buf.len())
    }
}

/// The writing end of one direction of the CPU↔memory link.
pub struct CellSender(ChannelWriter);

/// The reading end of one direction of the CPU↔memory link.
pub struct CellReceiver(ChannelReader);

/// Creates one unidirectional byte-stream link and returns its two ends.
pub fn cell_link() -> (CellSender, CellReceiver) {
    let (tx, rx) = mpsc::channel();
    (CellSender(ChannelWriter(tx)), CellReceiver(ChannelReader(rx)))
}

impl CellSender {
    pub fn send_cell(&mut self, value: i32) -> Result<(), SimError> {
        self.0
            .write_i32::<NativeEndian>(value)
            .map_err(|e| SimError::Protocol(e.to_string()))
    }
}

impl CellReceiver {
    pub fn recv_cell(&mut self) -> Result<i32, SimError> {
        self.0
            .read_i32::<NativeEndian>()
            .map_err(|e| SimError::Protocol(e.to_string()))
    }
}
