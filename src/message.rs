//! Message ingest and padding controller.
//!
//! Buffers the streamed message, applies FIPS 180-4 padding when the stream
//! ends, and serves the padded message to compression engines as big-endian
//! 32-bit words addressed by `(block, word)` coordinates.

use log::debug;

use crate::consts::{BLOCK_LEN, BLOCK_WORDS};
use crate::hash_result::HashErrorKind::{BufferOverflow, InvalidState, OutOfRange};
use crate::hash_result::HashResult;
use crate::util::be_u32_at;

/// Read-only word-fetch contract between the controller and the engines.
///
/// `word` is a pure read: repeated calls at the same coordinates return the
/// same value and no sequence of calls alters the underlying buffer.
pub trait WordSource {
    /// 32-bit big-endian word `index` (0..16) of padded block `block`.
    fn word(&self, block: usize, index: usize) -> HashResult<u32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// empty, ready for the first byte
    Idle,
    /// message bytes arriving
    Receive,
    /// padded and counted; serving words until reset
    Serve,
}

pub struct MessageController {
    state: ControllerState,
    buf: Vec<u8>,
    // original message length; fixed at finish
    msg_len: usize,
    block_count: usize,
    // capacity of the padded buffer, None = unbounded
    limit: Option<usize>,
}

/// padded length of a message of `msg_len` bytes: the 0x80 marker, zero
/// fill and 8-byte length trailer rounded up to a whole block.
fn padded_len(msg_len: usize) -> usize {
    (msg_len + 1 + 8).div_ceil(BLOCK_LEN) * BLOCK_LEN
}

impl MessageController {
    /// controller with an unbounded message buffer.
    pub fn new() -> MessageController {
        MessageController {
            state: ControllerState::Idle,
            buf: Vec::new(),
            msg_len: 0,
            block_count: 0,
            limit: None,
        }
    }

    /// controller whose padded buffer may not exceed `limit` bytes, the way
    /// a fixed message RAM would. `feed` past the limit fails with
    /// `BufferOverflow`. A 1024-byte limit admits messages up to 1015 bytes.
    pub fn with_limit(limit: usize) -> MessageController {
        assert!(limit >= BLOCK_LEN, "limit below one block: {}", limit);
        let mut controller = MessageController::new();
        controller.limit = Some(limit);
        controller
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// true once `finish` has run and words can be served.
    pub fn is_done(&self) -> bool {
        self.state == ControllerState::Serve
    }

    /// original message length in bytes (excluding padding).
    pub fn message_len(&self) -> usize {
        match self.state {
            ControllerState::Serve => self.msg_len,
            _ => self.buf.len(),
        }
    }

    /// number of 64-byte blocks in the padded message; 0 until `finish`.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// return to `Idle`, discarding the buffered message.
    pub fn reset(&mut self) {
        self.state = ControllerState::Idle;
        self.buf.clear();
        self.msg_len = 0;
        self.block_count = 0;
    }

    /// append one message byte.
    pub fn feed(&mut self, byte: u8) -> HashResult<()> {
        self.feed_slice(&[byte])
    }

    /// append `bytes` in order; equivalent to feeding each byte.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> HashResult<()> {
        if self.state == ControllerState::Serve {
            return hash_err!(InvalidState, "feed after finish");
        }
        if let Some(limit) = self.limit {
            let wanted = self.buf.len() + bytes.len();
            if padded_len(wanted) > limit {
                return hash_err!(
                    BufferOverflow,
                    "message of {} bytes will not fit a {}-byte buffer",
                    wanted,
                    limit
                );
            }
        }
        if !bytes.is_empty() {
            self.state = ControllerState::Receive;
            self.buf.extend_from_slice(bytes);
        }
        Ok(())
    }

    /// end of stream: pad, append the length trailer and fix the block
    /// count. Legal with no bytes fed (the empty message).
    pub fn finish(&mut self) -> HashResult<()> {
        if self.state == ControllerState::Serve {
            return hash_err!(InvalidState, "finish after finish");
        }
        self.msg_len = self.buf.len();
        self.append_padding();
        self.append_length();
        self.compute_block_count();
        self.state = ControllerState::Serve;
        debug!(
            "message finished: {} bytes, {} blocks",
            self.msg_len, self.block_count
        );
        Ok(())
    }

    // FIPS 180-4 5.1.1: one 0x80 byte, then zeros to 56 mod 64
    fn append_padding(&mut self) {
        self.buf.push(0x80);
        while self.buf.len() % BLOCK_LEN != BLOCK_LEN - 8 {
            self.buf.push(0);
        }
    }

    // original length in bits as a 64-bit big-endian trailer
    fn append_length(&mut self) {
        let bits = (self.msg_len as u64) * 8;
        self.buf.extend_from_slice(&bits.to_be_bytes());
    }

    fn compute_block_count(&mut self) {
        debug_assert_eq!(self.buf.len() % BLOCK_LEN, 0);
        self.block_count = self.buf.len() / BLOCK_LEN;
    }
}

impl Default for MessageController {
    fn default() -> MessageController {
        MessageController::new()
    }
}

impl WordSource for MessageController {
    fn word(&self, block: usize, index: usize) -> HashResult<u32> {
        if self.state != ControllerState::Serve {
            return hash_err!(InvalidState, "word fetch before finish");
        }
        if block >= self.block_count || index >= BLOCK_WORDS {
            return hash_err!(
                OutOfRange,
                "word ({}, {}) outside {} blocks",
                block,
                index,
                self.block_count
            );
        }
        Ok(be_u32_at(&self.buf, block * BLOCK_LEN + index * 4))
    }
}
