pub mod blockchain;
pub mod canonical;
pub mod config;
pub mod error;
pub mod mempool;
pub mod merkle;
pub mod pow;
pub mod report;
pub mod tx;

pub use crate::blockchain::{block_hash, BlockHeader, BlockTemplate, MinedBlock, Target};
pub use crate::config::Settings;
pub use crate::error::{Error, Result};
pub use crate::mempool::{MempoolDir, TransactionSource};
pub use crate::merkle::merkle_root;
pub use crate::pow::{Cancellation, Miner};
pub use crate::report::{FileSink, Report, ReportSink};
pub use crate::tx::{coinbase, coinbase_to, validate_transactions, RejectedRecord, Transaction};

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub block: MinedBlock,
    /// Records left out of the block, with the reason for each.
    pub rejected: Vec<RejectedRecord>,
    /// Hashes computed before the winning nonce was found, inclusive.
    pub attempts: u64,
}

/// Runs the whole pipeline once: read, validate, assemble, mine, report.
///
/// Nothing reaches `sink` unless mining succeeds.
pub fn run<S, K>(settings: &Settings, source: &S, sink: &mut K) -> Result<RunSummary>
where
    S: TransactionSource + ?Sized,
    K: ReportSink + ?Sized,
{
    let records = source.pending()?;
    let partition = validate_transactions(records);
    if !partition.invalid.is_empty() {
        tracing::warn!(
            rejected = partition.invalid.len(),
            accepted = partition.valid.len(),
            "dropping malformed transaction records"
        );
    }

    let coinbase = coinbase_to(&settings.reward_address, settings.reward);
    let template = BlockTemplate::assemble(partition.valid, coinbase, settings.difficulty_target.clone())?;
    tracing::info!(
        txs = template.transactions().len(),
        merkle_root = template.merkle_root(),
        "assembled candidate block"
    );

    let cancel = settings.cancellation();
    let block = settings.miner().mine_until(template, &*cancel)?;

    sink.write_report(&Report::from_block(&block))?;

    Ok(RunSummary {
        attempts: block.nonce.saturating_add(1),
        block,
        rejected: partition.invalid,
    })
}
