use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Sentinel identifier of the reward transaction.
pub const COINBASE_ID: &str = "coinbase";
/// Address credited by the coinbase unless configured otherwise.
pub const DEFAULT_REWARD_ADDRESS: &str = "miner_address";
/// Amount credited by the coinbase unless configured otherwise.
pub const BLOCK_REWARD: u64 = 50;

const ID_FIELD: &str = "id";
/// Field name used by mempool dumps for the identifier.
const LEGACY_ID_FIELD: &str = "txid";
const INPUTS_FIELD: &str = "inputs";
const OUTPUTS_FIELD: &str = "outputs";

/// A structurally valid transaction.
///
/// The full record is kept as received so the block hash commits to every
/// field, including the ones this crate never interprets.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    id: String,
    record: Map<String, Value>,
}

impl Transaction {
    /// Validates a raw record, handing it back with the reason on failure.
    pub fn from_record(record: Value) -> Result<Self, RejectedRecord> {
        let id = match check_record(&record) {
            Ok(id) => id,
            Err(reason) => return Err(RejectedRecord { record, reason }),
        };
        match record {
            Value::Object(record) => Ok(Self { id, record }),
            // check_record only accepts objects
            other => Err(RejectedRecord {
                record: other,
                reason: MalformedRecord::NotAnObject,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn inputs(&self) -> &[Value] {
        sequence(&self.record, INPUTS_FIELD)
    }

    pub fn outputs(&self) -> &[Value] {
        sequence(&self.record, OUTPUTS_FIELD)
    }

    pub fn is_coinbase(&self) -> bool {
        self.id == COINBASE_ID && self.inputs().is_empty()
    }
}

impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

fn sequence<'a>(record: &'a Map<String, Value>, field: &str) -> &'a [Value] {
    record
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// -----------------------------
// Coinbase
// -----------------------------

/// The reward transaction with the default address and amount.
pub fn coinbase() -> Transaction {
    coinbase_to(DEFAULT_REWARD_ADDRESS, BLOCK_REWARD)
}

/// The reward transaction: no inputs, one output paying `value` to `address`.
pub fn coinbase_to(address: &str, value: u64) -> Transaction {
    let mut record = Map::new();
    record.insert(ID_FIELD.to_string(), Value::String(COINBASE_ID.to_string()));
    record.insert(INPUTS_FIELD.to_string(), Value::Array(Vec::new()));
    record.insert(
        OUTPUTS_FIELD.to_string(),
        json!([{ "address": address, "value": value }]),
    );
    Transaction {
        id: COINBASE_ID.to_string(),
        record,
    }
}

// -----------------------------
// Validation
// -----------------------------

/// Why a record was kept out of the block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("record is not an object")]
    NotAnObject,
    #[error("record has no identifier")]
    MissingId,
    #[error("identifier is not a non-empty string")]
    InvalidId,
    /// The report lists one id per line, so ids must not break lines.
    #[error("identifier contains a line break")]
    LineBreakInId,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` is not a sequence")]
    NotASequence(&'static str),
}

/// A record routed to the invalid side of the partition.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub record: Value,
    pub reason: MalformedRecord,
}

/// Result of [`validate_transactions`]; both sides keep input order.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub valid: Vec<Transaction>,
    pub invalid: Vec<RejectedRecord>,
}

/// Splits raw records into valid transactions and rejected records.
pub fn validate_transactions(records: Vec<Value>) -> Partition {
    let mut partition = Partition::default();
    for record in records {
        match Transaction::from_record(record) {
            Ok(tx) => partition.valid.push(tx),
            Err(rejected) => {
                tracing::debug!(reason = %rejected.reason, "rejecting transaction record");
                partition.invalid.push(rejected);
            }
        }
    }
    partition
}

/// Checks the structural invariant and returns the identifier.
fn check_record(record: &Value) -> Result<String, MalformedRecord> {
    let fields = record.as_object().ok_or(MalformedRecord::NotAnObject)?;

    let id = fields
        .get(ID_FIELD)
        .or_else(|| fields.get(LEGACY_ID_FIELD))
        .ok_or(MalformedRecord::MissingId)?;
    let id = match id.as_str() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err(MalformedRecord::InvalidId),
    };
    if id.contains(&['\n', '\r'][..]) {
        return Err(MalformedRecord::LineBreakInId);
    }

    for field in [INPUTS_FIELD, OUTPUTS_FIELD] {
        match fields.get(field) {
            None => return Err(MalformedRecord::MissingField(field)),
            Some(Value::Array(_)) => {}
            Some(_) => return Err(MalformedRecord::NotASequence(field)),
        }
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Value {
        json!({"id": id, "inputs": [], "outputs": [{"address": "A", "value": 1}]})
    }

    #[test]
    fn test_coinbase_fixture() {
        let cb = coinbase();
        assert_eq!(cb.id(), "coinbase");
        assert!(cb.inputs().is_empty());
        assert_eq!(cb.outputs().len(), 1);
        assert_eq!(cb.outputs()[0]["value"], 50);
        assert_eq!(cb.outputs()[0]["address"], "miner_address");
        assert!(cb.is_coinbase());
        assert_eq!(
            serde_json::to_value(&cb).unwrap(),
            json!({"id": "coinbase", "inputs": [], "outputs": [{"address": "miner_address", "value": 50}]})
        );
    }

    #[test]
    fn test_coinbase_is_deterministic() {
        assert_eq!(coinbase(), coinbase());
    }

    #[test]
    fn test_valid_record_keeps_extra_fields() {
        let tx = Transaction::from_record(json!({
            "id": "tx1", "inputs": [{"txid": "p", "vout": 0}], "outputs": [], "fee": 3
        }))
        .unwrap();
        assert_eq!(tx.id(), "tx1");
        assert_eq!(tx.inputs().len(), 1);
        assert_eq!(serde_json::to_value(&tx).unwrap()["fee"], 3);
        assert!(!tx.is_coinbase());
    }

    #[test]
    fn test_legacy_txid_accepted() {
        let tx = Transaction::from_record(json!({"txid": "abc", "inputs": [], "outputs": []})).unwrap();
        assert_eq!(tx.id(), "abc");
    }

    #[test]
    fn test_rejection_reasons() {
        let cases = vec![
            (json!("tx"), MalformedRecord::NotAnObject),
            (json!({"inputs": [], "outputs": []}), MalformedRecord::MissingId),
            (json!({"id": "", "inputs": [], "outputs": []}), MalformedRecord::InvalidId),
            (json!({"id": 4, "inputs": [], "outputs": []}), MalformedRecord::InvalidId),
            (json!({"id": "tx1\nforged", "inputs": [], "outputs": []}), MalformedRecord::LineBreakInId),
            (json!({"id": "tx1\rforged", "inputs": [], "outputs": []}), MalformedRecord::LineBreakInId),
            (json!({"txid": "\n", "inputs": [], "outputs": []}), MalformedRecord::LineBreakInId),
            (json!({"id": "tx3"}), MalformedRecord::MissingField("inputs")),
            (json!({"id": "tx3", "inputs": []}), MalformedRecord::MissingField("outputs")),
            (json!({"id": "tx3", "inputs": {}, "outputs": []}), MalformedRecord::NotASequence("inputs")),
        ];
        for (record, expected) in cases {
            let rejected = Transaction::from_record(record.clone()).unwrap_err();
            assert_eq!(rejected.reason, expected);
            assert_eq!(rejected.record, record);
        }
    }

    #[test]
    fn test_partition_preserves_order() {
        let records = vec![
            record("a"),
            json!({"id": "bad1"}),
            record("b"),
            json!(null),
            record("c"),
        ];
        let partition = validate_transactions(records);
        let ids: Vec<&str> = partition.valid.iter().map(Transaction::id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(partition.invalid.len(), 2);
        assert_eq!(partition.invalid[0].record, json!({"id": "bad1"}));
        assert_eq!(partition.invalid[1].record, Value::Null);
    }

    #[test]
    fn test_partition_empty() {
        let partition = validate_transactions(Vec::new());
        assert!(partition.valid.is_empty());
        assert!(partition.invalid.is_empty());
    }
}
