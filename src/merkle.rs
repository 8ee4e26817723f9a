use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

fn hash_pair(left: &str, right: &str) -> String {
    let mut h = Sha256::new();
    h.update(left.as_bytes());
    h.update(right.as_bytes());
    hex::encode(h.finalize())
}

/// Reduces `ids` to a single root by hashing adjacent pairs of hex strings,
/// duplicating the last one on odd levels. Empty input is rejected.
pub fn merkle_root<S: AsRef<str>>(ids: &[S]) -> Result<String> {
    if ids.is_empty() {
        return Err(Error::InvalidInput("merkle root of an empty sequence"));
    }

    let mut level: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [single] => hash_pair(single, single),
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }
    Ok(level.swap_remove(0))
}
