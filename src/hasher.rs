//! Top-level digest service: composes the message controller with a single
//! compression engine or a multi-lane pipeline.

use crate::consts::H_INIT;
use crate::engine::Engine;
use crate::hash_result::HashResult;
use crate::message::MessageController;
use crate::pipeline::Pipeline;

/// One-shot SHA-256 of `msg`.
pub fn sha256(msg: &[u8]) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(msg);
    hasher.finalize()
}

/// Streaming SHA-256 digest.
///
/// Lifecycle: construct, `update` any number of times, `finalize`.
/// `finalize` consumes the hasher, so no call can follow it; `reset`
/// returns a hasher to its initial state at any earlier point. Bytes are
/// digested in submission order and slicing across `update` calls does not
/// affect the result.
pub struct Hasher {
    controller: MessageController,
    lanes: usize,
}

impl Hasher {
    /// single-engine hasher.
    pub fn new() -> Hasher {
        Hasher::with_lanes(1)
    }

    /// hasher backed by `lanes` parallel compression engines. The digest
    /// is identical for every lane count.
    pub fn with_lanes(lanes: usize) -> Hasher {
        assert!(lanes >= 1, "hasher needs at least one lane");
        Hasher {
            controller: MessageController::new(),
            lanes,
        }
    }

    /// append message bytes.
    pub fn update(&mut self, bytes: &[u8]) {
        // the controller is unbounded and still receiving, so ingest
        // cannot fail here
        match self.controller.feed_slice(bytes) {
            Ok(()) => {}
            Err(e) => panic!("message ingest failed: {}", e),
        }
    }

    /// pad, digest and return 32 big-endian bytes, H0 first.
    pub fn finalize(mut self) -> [u8; 32] {
        match self.run_digest() {
            Ok(digest) => digest,
            // a failure past this point is a broken dispatch invariant,
            // not bad input
            Err(e) => panic!("digest pipeline failed: {}", e),
        }
    }

    fn run_digest(&mut self) -> HashResult<[u8; 32]> {
        self.controller.finish()?;
        let num_blocks = self.controller.block_count();
        if self.lanes == 1 {
            let mut engine = Engine::new();
            engine.start(num_blocks, H_INIT)?;
            engine.run(&self.controller)?;
            engine.digest()
        } else {
            let mut pipeline = Pipeline::new(self.lanes);
            pipeline.start(num_blocks, H_INIT)?;
            pipeline.run(&self.controller)
        }
    }

    /// discard all fed bytes and return to the initial state.
    pub fn reset(&mut self) {
        self.controller.reset();
    }
}

impl Default for Hasher {
    fn default() -> Hasher {
        Hasher::new()
    }
}
