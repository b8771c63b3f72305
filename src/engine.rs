//! Block compression engine.
//!
//! One `step` performs one micro-operation: load one schedule word, extend
//! one schedule entry, run one compression round, or fold the working
//! variables back into the hash state. This keeps the phase structure of
//! the hardware design observable and lets a pipeline overlap the load and
//! extend phases of one block with the compression of another.

use crate::consts::{BLOCK_WORDS, SCHEDULE_LEN, K};
use crate::func::{big_sigma0, big_sigma1, ch, maj, small_sigma0, small_sigma1};
use crate::hash_result::HashErrorKind::InvalidState;
use crate::hash_result::HashResult;
use crate::message::WordSource;
use crate::util::words_to_be_bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// no block in flight
    Idle,
    /// pulling W[0..16] from the word source
    Load,
    /// extending the schedule to W[16..64]
    Extend,
    /// schedule ready, chained hash state not yet delivered
    Stall,
    /// running the 64 compression rounds
    Compress,
    /// folding working variables into the hash state
    Update,
    /// block finished, output pending collection
    Done,
}

/// busy/done view of an engine or pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    pub busy: bool,
    pub done: bool,
}

pub struct Engine {
    state: EngineState,
    // running hash state: chained input before compression, output after
    hash: [u32; 8],
    // working variables a..h, live only during Compress/Update
    vars: [u32; 8],
    w: [u32; SCHEDULE_LEN],
    // absolute index of the block in flight
    block: usize,
    // blocks remaining in this start, including the one in flight
    blocks_left: usize,
    // word index, schedule index or round counter depending on phase
    cursor: usize,
    input_ready: bool,
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            state: EngineState::Idle,
            hash: [0; 8],
            vars: [0; 8],
            w: [0; SCHEDULE_LEN],
            block: 0,
            blocks_left: 0,
            cursor: 0,
            input_ready: false,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn poll(&self) -> Poll {
        Poll {
            busy: !matches!(self.state, EngineState::Idle | EngineState::Done),
            done: self.state == EngineState::Done,
        }
    }

    /// abandon any block in flight and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.blocks_left = 0;
        self.input_ready = false;
    }

    /// single-engine entry: process blocks `0..num_blocks` with the hash
    /// state seeded from `input`, chaining internally between blocks.
    pub fn start(&mut self, num_blocks: usize, input: [u32; 8]) -> HashResult<()> {
        if self.state != EngineState::Idle {
            return hash_err!(InvalidState, "start while {:?}", self.state);
        }
        self.hash = input;
        self.input_ready = true;
        if num_blocks == 0 {
            self.state = EngineState::Done;
            return Ok(());
        }
        self.block = 0;
        self.blocks_left = num_blocks;
        self.cursor = 0;
        self.state = EngineState::Load;
        Ok(())
    }

    /// pipeline entry: accept a single block without its chained input.
    /// The engine loads and extends the schedule, then stalls until
    /// `chain_input` delivers the predecessor's hash state.
    pub fn load_block(&mut self, block: usize) -> HashResult<()> {
        if self.state != EngineState::Idle {
            return hash_err!(InvalidState, "load_block while {:?}", self.state);
        }
        self.block = block;
        self.blocks_left = 1;
        self.cursor = 0;
        self.input_ready = false;
        self.state = EngineState::Load;
        Ok(())
    }

    /// deliver the chained hash state for the block accepted by
    /// `load_block`. Legal exactly once per block, before compression.
    pub fn chain_input(&mut self, input: [u32; 8]) -> HashResult<()> {
        if self.input_ready {
            return hash_err!(InvalidState, "chain input delivered twice");
        }
        match self.state {
            EngineState::Load | EngineState::Extend => {
                self.hash = input;
                self.input_ready = true;
                Ok(())
            }
            EngineState::Stall => {
                self.hash = input;
                self.input_ready = true;
                self.enter_compress();
                Ok(())
            }
            state => hash_err!(InvalidState, "chain input while {:?}", state),
        }
    }

    /// advance by one micro-operation. A no-op in `Idle`, `Done` and
    /// `Stall`; the engine fails closed rather than erroring.
    pub fn step<S: WordSource>(&mut self, src: &S) -> HashResult<()> {
        match self.state {
            EngineState::Idle | EngineState::Done | EngineState::Stall => Ok(()),
            EngineState::Load => {
                self.w[self.cursor] = src.word(self.block, self.cursor)?;
                self.cursor += 1;
                if self.cursor == BLOCK_WORDS {
                    self.state = EngineState::Extend;
                }
                Ok(())
            }
            EngineState::Extend => {
                let i = self.cursor;
                self.w[i] = small_sigma1(self.w[i - 2])
                    .wrapping_add(self.w[i - 7])
                    .wrapping_add(small_sigma0(self.w[i - 15]))
                    .wrapping_add(self.w[i - 16]);
                self.cursor += 1;
                if self.cursor == SCHEDULE_LEN {
                    if self.input_ready {
                        self.enter_compress();
                    } else {
                        self.state = EngineState::Stall;
                    }
                }
                Ok(())
            }
            EngineState::Compress => {
                let t = self.cursor;
                let a = self.vars[0];
                let b = self.vars[1];
                let c = self.vars[2];
                let d = self.vars[3];
                let e = self.vars[4];
                let f = self.vars[5];
                let g = self.vars[6];
                let h = self.vars[7];

                let t1 = h
                    .wrapping_add(big_sigma1(e))
                    .wrapping_add(ch(e, f, g))
                    .wrapping_add(K[t])
                    .wrapping_add(self.w[t]);
                let t2 = big_sigma0(a).wrapping_add(maj(a, b, c));

                self.vars = [t1.wrapping_add(t2), a, b, c, d.wrapping_add(t1), e, f, g];
                self.cursor += 1;
                if self.cursor == SCHEDULE_LEN {
                    self.state = EngineState::Update;
                }
                Ok(())
            }
            EngineState::Update => {
                for i in 0..8 {
                    self.hash[i] = self.hash[i].wrapping_add(self.vars[i]);
                }
                // dispatch decision: next block of this start, or done
                self.blocks_left -= 1;
                if self.blocks_left > 0 {
                    self.block += 1;
                    self.cursor = 0;
                    self.state = EngineState::Load;
                } else {
                    self.state = EngineState::Done;
                }
                Ok(())
            }
        }
    }

    fn enter_compress(&mut self) {
        debug_assert!(self.input_ready);
        self.vars = self.hash;
        self.cursor = 0;
        self.state = EngineState::Compress;
    }

    /// collect the finished hash state and return to `Idle`.
    pub fn take_output(&mut self) -> HashResult<[u32; 8]> {
        if self.state != EngineState::Done {
            return hash_err!(InvalidState, "take_output while {:?}", self.state);
        }
        self.state = EngineState::Idle;
        self.input_ready = false;
        Ok(self.hash)
    }

    /// final hash state as eight 32-bit words, H0 first.
    pub fn digest_words(&self) -> HashResult<[u32; 8]> {
        if self.state != EngineState::Done {
            return hash_err!(InvalidState, "digest while {:?}", self.state);
        }
        Ok(self.hash)
    }

    /// final digest as 32 big-endian bytes.
    pub fn digest(&self) -> HashResult<[u8; 32]> {
        Ok(words_to_be_bytes(&self.digest_words()?))
    }

    /// drive a started engine to completion. Errors if the engine was not
    /// started or would stall waiting for a chain input that nothing will
    /// deliver.
    pub fn run<S: WordSource>(&mut self, src: &S) -> HashResult<()> {
        loop {
            match self.state {
                EngineState::Done => return Ok(()),
                EngineState::Idle => {
                    return hash_err!(InvalidState, "run before start");
                }
                EngineState::Stall => {
                    return hash_err!(InvalidState, "stalled without chain input");
                }
                _ => self.step(src)?,
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}
