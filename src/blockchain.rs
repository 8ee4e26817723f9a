use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::canonical;
use crate::error::{Error, Result};
use crate::merkle::merkle_root;
use crate::tx::Transaction;

/// Number of hex digits in a block hash and in a difficulty target.
pub const TARGET_HEX_LEN: usize = 64;
pub const DEFAULT_TARGET: &str = "0000ffff00000000000000000000000000000000000000000000000000000000";

// -----------------------------
// Types
// -----------------------------

/// Fixed-length lowercase hex threshold a block hash must stay below.
///
/// Hashes are compared to the target as strings. Both sides are always
/// `TARGET_HEX_LEN` lowercase hex digits, which makes the string order
/// identical to the numeric order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target(String);

impl Target {
    /// The all-`f` target, met by every hash except the maximal one.
    pub fn easiest() -> Self {
        Target("f".repeat(TARGET_HEX_LEN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `hash` is strictly below the target.
    pub fn is_met_by(&self, hash: &str) -> bool {
        hash.len() == TARGET_HEX_LEN && hash < self.0.as_str()
    }
}

impl Default for Target {
    fn default() -> Self {
        Target(DEFAULT_TARGET.to_string())
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != TARGET_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidTarget(s.to_string()));
        }
        Ok(Target(s.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Target {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The hashed and reported subset of a block, without transaction bodies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub merkle_root: String,
    pub timestamp: i64,
    pub difficulty_target: Target,
    pub nonce: u64,
}

/// An assembled block waiting for a nonce.
///
/// Nothing here changes after assembly, so the merkle root always matches
/// the transaction list. The nonce lives with the miner.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTemplate {
    transactions: Vec<Transaction>,
    merkle_root: String,
    timestamp: i64,
    difficulty_target: Target,
}

/// Field layout hashed for a block. Keys are emitted sorted by the
/// canonical writer regardless of declaration order.
#[derive(Serialize)]
struct BlockView<'a> {
    transactions: &'a [Transaction],
    merkle_root: &'a str,
    timestamp: i64,
    difficulty_target: &'a Target,
    nonce: u64,
}

// -----------------------------
// Assembly
// -----------------------------

impl BlockTemplate {
    /// Builds a template stamped with the current time.
    pub fn assemble(valid: Vec<Transaction>, coinbase: Transaction, target: Target) -> Result<Self> {
        Self::assemble_at(valid, coinbase, target, Utc::now().timestamp())
    }

    /// Builds a template with an explicit timestamp (seconds since epoch).
    pub fn assemble_at(
        valid: Vec<Transaction>,
        coinbase: Transaction,
        target: Target,
        timestamp: i64,
    ) -> Result<Self> {
        let mut transactions = Vec::with_capacity(valid.len() + 1);
        transactions.push(coinbase);
        transactions.extend(valid);

        let ids: Vec<&str> = transactions.iter().map(Transaction::id).collect();
        let merkle_root = merkle_root(&ids)?;
        tracing::debug!(txs = transactions.len(), %merkle_root, timestamp, "assembled block template");

        Ok(Self {
            transactions,
            merkle_root,
            timestamp,
            difficulty_target: target,
        })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The coinbase, always first.
    pub fn coinbase(&self) -> &Transaction {
        &self.transactions[0]
    }

    pub fn txids(&self) -> Vec<String> {
        self.transactions.iter().map(|tx| tx.id().to_string()).collect()
    }

    pub fn merkle_root(&self) -> &str {
        &self.merkle_root
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn difficulty_target(&self) -> &Target {
        &self.difficulty_target
    }

    pub fn header(&self, nonce: u64) -> BlockHeader {
        BlockHeader {
            merkle_root: self.merkle_root.clone(),
            timestamp: self.timestamp,
            difficulty_target: self.difficulty_target.clone(),
            nonce,
        }
    }

    fn view(&self, nonce: u64) -> BlockView<'_> {
        BlockView {
            transactions: &self.transactions,
            merkle_root: &self.merkle_root,
            timestamp: self.timestamp,
            difficulty_target: &self.difficulty_target,
            nonce,
        }
    }
}

// -----------------------------
// Hashing
// -----------------------------

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash of the block built from `template` with `nonce`: SHA-256 of the
/// canonical text, as lowercase hex.
pub fn block_hash(template: &BlockTemplate, nonce: u64) -> Result<String> {
    let text = canonical::to_string(&template.view(nonce))?;
    Ok(sha256_hex(text.as_bytes()))
}

/// Canonical block text split around the nonce, with the hash state of the
/// prefix precomputed. Produces the same hashes as [`block_hash`].
#[derive(Clone)]
pub struct PowPreimage {
    prefix: Sha256,
    suffix: String,
}

impl PowPreimage {
    pub fn new(template: &BlockTemplate) -> Result<Self> {
        // Sorted key order: difficulty_target, merkle_root, nonce, timestamp, transactions.
        let prefix = format!(
            "{{\"difficulty_target\": {}, \"merkle_root\": {}, \"nonce\": ",
            canonical::to_string(&template.difficulty_target)?,
            canonical::to_string(&template.merkle_root)?,
        );
        let suffix = format!(
            ", \"timestamp\": {}, \"transactions\": {}}}",
            template.timestamp,
            canonical::to_string(&template.transactions)?,
        );
        Ok(Self {
            prefix: Sha256::new().chain_update(prefix.as_bytes()),
            suffix,
        })
    }

    /// Writes the lowercase hex hash for `nonce` into `out` and returns it.
    pub fn hash_into<'a>(&self, nonce: u64, out: &'a mut [u8; TARGET_HEX_LEN]) -> &'a str {
        let digest = self
            .prefix
            .clone()
            .chain_update(nonce.to_string().as_bytes())
            .chain_update(self.suffix.as_bytes())
            .finalize();
        // 32 digest bytes always fill 64 hex digits exactly.
        let encoded = hex::encode_to_slice(digest, &mut out[..]);
        debug_assert!(encoded.is_ok(), "digest does not fit the hex buffer");
        let hash = std::str::from_utf8(&out[..]);
        debug_assert!(hash.is_ok(), "hex output is not ASCII");
        hash.unwrap_or_default()
    }

    pub fn hash(&self, nonce: u64) -> String {
        let mut out = [0u8; TARGET_HEX_LEN];
        self.hash_into(nonce, &mut out).to_string()
    }
}

// -----------------------------
// Mined block
// -----------------------------

/// A template together with the nonce that satisfied its target.
#[derive(Debug, Clone, PartialEq)]
pub struct MinedBlock {
    pub template: BlockTemplate,
    pub nonce: u64,
    pub hash: String,
}

impl MinedBlock {
    pub fn header(&self) -> BlockHeader {
        self.template.header(self.nonce)
    }

    /// Recomputes the merkle root and the hash from scratch and checks both
    /// against the stored values and the target.
    pub fn verify(&self) -> Result<bool> {
        let ids: Vec<&str> = self.template.transactions.iter().map(Transaction::id).collect();
        if merkle_root(&ids)? != self.template.merkle_root {
            return Ok(false);
        }
        let hash = block_hash(&self.template, self.nonce)?;
        Ok(hash == self.hash && self.template.difficulty_target.is_met_by(&hash))
    }
}
