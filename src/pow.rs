use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::blockchain::{BlockTemplate, MinedBlock, PowPreimage, TARGET_HEX_LEN};
use crate::error::{Error, Result};

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Checked once per attempt; returning true stops the search.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

/// Never stops the search.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl Cancellation for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Stops the search once a wall-clock instant has passed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Deadline(Instant::now() + timeout)
    }
}

impl Cancellation for Deadline {
    fn is_cancelled(&self) -> bool {
        Instant::now() >= self.0
    }
}

impl Cancellation for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F: Fn() -> bool> Cancellation for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Sequential CPU miner.
#[derive(Debug, Clone, Copy)]
pub struct Miner {
    /// Largest nonce tried (inclusive).
    pub max_nonce: u64,
    /// Attempts between progress log lines.
    pub progress_interval: u64,
}

impl Default for Miner {
    fn default() -> Self {
        Self {
            max_nonce: u64::MAX,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Miner {
    pub fn with_max_nonce(max_nonce: u64) -> Self {
        Self {
            max_nonce,
            ..Self::default()
        }
    }

    /// Searches without cancellation.
    pub fn mine(&self, template: BlockTemplate) -> Result<MinedBlock> {
        self.mine_until(template, &NeverCancel)
    }

    /// Searches until a nonce satisfies the target, the nonce bound is
    /// passed, or `cancel` fires.
    pub fn mine_until<C: Cancellation + ?Sized>(&self, template: BlockTemplate, cancel: &C) -> Result<MinedBlock> {
        let preimage = PowPreimage::new(&template)?;
        let target = template.difficulty_target().as_str().as_bytes().to_vec();
        let interval = self.progress_interval.max(1);
        let started = Instant::now();
        let mut buf = [0u8; TARGET_HEX_LEN];

        tracing::info!(difficulty = %template.difficulty_target(), txs = template.transactions().len(), "mining started");

        let mut nonce: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                tracing::warn!(nonce, "mining cancelled");
                return Err(Error::Cancelled { nonce });
            }

            let hash = preimage.hash_into(nonce, &mut buf);
            if hash.as_bytes() < target.as_slice() {
                let attempts = nonce.saturating_add(1);
                tracing::info!(
                    nonce,
                    hash,
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "found block"
                );
                let hash = hash.to_string();
                return Ok(MinedBlock { template, nonce, hash });
            }

            if nonce % interval == 0 && nonce > 0 {
                tracing::debug!(nonce, elapsed_ms = started.elapsed().as_millis() as u64, "mining in progress");
            }

            if nonce >= self.max_nonce {
                let attempts = nonce.saturating_add(1);
                tracing::warn!(attempts, "nonce space exhausted");
                return Err(Error::SearchExhausted { attempts });
            }
            nonce += 1;
        }
    }
}
