use mempool_miner::{block_hash, merkle_root, run, Error, FileSink, MempoolDir, Settings, Target};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

fn write_mempool(dir: &std::path::Path) {
    fs::write(
        dir.join("01_tx1.json"),
        json!({"id": "tx1", "inputs": [], "outputs": [{"address": "A", "value": 1}]}).to_string(),
    )
    .unwrap();
    fs::write(
        dir.join("02_tx2.json"),
        json!({"id": "tx2", "inputs": [], "outputs": [{"address": "B", "value": 2}]}).to_string(),
    )
    .unwrap();
    fs::write(dir.join("03_tx3.json"), json!({"id": "tx3"}).to_string()).unwrap();
}

fn easy_settings() -> Settings {
    Settings {
        difficulty_target: Target::easiest(),
        ..Settings::default()
    }
}

#[test]
fn end_to_end_report() {
    let workdir = tempdir().unwrap();
    let mempool = workdir.path().join("mempool");
    fs::create_dir(&mempool).unwrap();
    write_mempool(&mempool);
    let output = workdir.path().join("output.txt");

    let summary = run(&easy_settings(), &MempoolDir::new(&mempool), &mut FileSink::new(&output)).unwrap();

    assert_eq!(summary.block.template.txids(), ["coinbase", "tx1", "tx2"]);
    assert_eq!(summary.rejected.len(), 1);
    assert_eq!(summary.rejected[0].record, json!({"id": "tx3"}));
    assert!(summary.block.verify().unwrap());

    let text = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(&lines[2..], ["coinbase", "tx1", "tx2"]);

    let header: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(header["merkle_root"], merkle_root(&["coinbase", "tx1", "tx2"]).unwrap());
    assert_eq!(header["nonce"], summary.block.nonce);
    assert_eq!(header["difficulty_target"], "f".repeat(64));

    let coinbase: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(
        coinbase,
        json!({"id": "coinbase", "inputs": [], "outputs": [{"address": "miner_address", "value": 50}]})
    );
}

#[test]
fn reported_header_reproduces_hash() {
    let records = vec![
        json!({"id": "tx1", "inputs": [], "outputs": [{"address": "A", "value": 1}]}),
        json!({"id": "tx2", "inputs": [], "outputs": [{"address": "B", "value": 2}]}),
    ];
    let settings = Settings {
        difficulty_target: format!("4{}", "0".repeat(63)).parse().unwrap(),
        ..Settings::default()
    };
    let mut sink: Vec<u8> = Vec::new();
    let summary = run(&settings, &records, &mut sink).unwrap();

    let block = &summary.block;
    assert_eq!(block_hash(&block.template, block.nonce).unwrap(), block.hash);
    assert!(block.hash.as_str() < settings.difficulty_target.as_str());
    assert_eq!(summary.attempts, block.nonce + 1);
    assert!(String::from_utf8(sink).unwrap().starts_with("{\"difficulty_target\": \"4000"));
}

#[test]
fn configured_reward_goes_to_coinbase() {
    let settings = Settings {
        reward_address: "pool".to_string(),
        reward: 25,
        ..easy_settings()
    };
    let mut sink: Vec<u8> = Vec::new();
    let summary = run(&settings, &Vec::<serde_json::Value>::new(), &mut sink).unwrap();
    let coinbase = summary.block.template.coinbase();
    assert_eq!(coinbase.outputs()[0]["address"], "pool");
    assert_eq!(coinbase.outputs()[0]["value"], 25);
    assert_eq!(summary.block.template.merkle_root(), "coinbase");
}

#[test]
fn missing_mempool_aborts_without_output() {
    let workdir = tempdir().unwrap();
    let output = workdir.path().join("output.txt");
    let err = run(
        &easy_settings(),
        &MempoolDir::new(workdir.path().join("absent")),
        &mut FileSink::new(&output),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(!output.exists());
}

#[test]
fn exhausted_search_writes_nothing() {
    let settings = Settings {
        difficulty_target: "0".repeat(64).parse().unwrap(),
        max_nonce: Some(50),
        ..Settings::default()
    };
    let mut sink: Vec<u8> = Vec::new();
    let err = run(&settings, &Vec::<serde_json::Value>::new(), &mut sink).unwrap_err();
    assert!(matches!(err, Error::SearchExhausted { attempts: 51 }));
    assert!(sink.is_empty());
}

#[test]
fn id_with_line_break_stays_out_of_report() {
    let records = vec![
        json!({"id": "tx1\nforged", "inputs": [], "outputs": []}),
        json!({"id": "tx2", "inputs": [], "outputs": []}),
    ];
    let mut sink: Vec<u8> = Vec::new();
    let summary = run(&easy_settings(), &records, &mut sink).unwrap();

    assert_eq!(summary.block.template.txids(), ["coinbase", "tx2"]);
    assert_eq!(summary.rejected.len(), 1);

    let text = String::from_utf8(sink).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(&lines[2..], ["coinbase", "tx2"]);
}
