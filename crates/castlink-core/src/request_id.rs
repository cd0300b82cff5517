//! Correlation id generation.

use std::cell::Cell;

use castlink_proto::RequestId;

use crate::env::Environment;

/// Produces request ids unique within one bridge session.
///
/// Ids combine wall clock milliseconds, a per-generator sequence number and
/// 32 random bits: `req-<millis>-<seq>-<random>` (hex). The sequence alone
/// guarantees uniqueness inside a session; time and randomness keep ids from
/// different sessions apart. Not cryptographic.
pub struct RequestIdGenerator<E: Environment> {
    env: E,
    sequence: Cell<u64>,
}

impl<E: Environment> RequestIdGenerator<E> {
    /// Create a generator backed by `env`.
    pub fn new(env: E) -> Self {
        Self { env, sequence: Cell::new(0) }
    }

    /// Next id.
    pub fn generate(&self) -> RequestId {
        let sequence = self.sequence.get().wrapping_add(1);
        self.sequence.set(sequence);

        let millis = self.env.wall_clock_millis();
        let random = self.env.random_u32();
        RequestId::new(format!("req-{millis:x}-{sequence:x}-{random:08x}"))
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.sequence.get()
    }
}
