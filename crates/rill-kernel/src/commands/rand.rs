//! rand — unbounded producer of pseudo-random numeric rows.
//!
//! Runs until the consumer goes away or the interrupt fires; there is
//! no count argument on purpose — this is the producer used to exercise
//! backpressure and cancellation downstream.

use std::hash::{BuildHasher, Hasher};
use std::time::SystemTime;

use async_trait::async_trait;

use rill_types::{ExitStatus, Record, Value};

use crate::channel::{InChannel, OutChannel, SendError};
use crate::error::CommandError;

use super::command::{Command, ExecContext};

pub struct Rand;

#[async_trait]
impl Command for Rand {
    fn name(&self) -> &str {
        "rand"
    }

    async fn run(
        &self,
        _args: &[String],
        _input: InChannel,
        output: OutChannel,
        _errors: OutChannel,
        _ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let mut rng = SplitMix64::seeded();
        loop {
            let value = Value::Numeric((rng.next() >> 1) as i64);
            match output.send(Record::single("value", value)?).await {
                Ok(()) => {}
                Err(SendError::Closed) => return Ok(ExitStatus::SUCCESS),
                Err(SendError::Interrupted) => return Err(CommandError::Interrupted),
            }
        }
    }
}

/// Small deterministic generator over a hashed seed. Statistical
/// quality is irrelevant here; the rows only need to keep coming.
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    /// Seed from `RandomState` entropy mixed with the current time.
    fn seeded() -> SplitMix64 {
        let mut hasher = std::collections::hash_map::RandomState::new().build_hasher();
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        hasher.write_u128(now.as_nanos());
        SplitMix64 {
            state: hasher.finish(),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}
