//! Keypair files in both accepted encodings

use std::io::Write;

use minter_client::wallet::{load_keypair, pubkey_from_keypair_file, Wallet};
use minter_client::MintError;
use solana_sdk::signature::{Keypair, Signer};
use tempfile::NamedTempFile;

fn write_bytes(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write keypair");
    file
}

#[test]
fn test_json_keypair_loads() {
    let keypair = Keypair::new();
    let json = serde_json::to_vec(&keypair.to_bytes().to_vec()).unwrap();
    let file = write_bytes(&json);

    let loaded = load_keypair(file.path()).unwrap();
    assert_eq!(loaded.pubkey(), keypair.pubkey());
}

#[test]
fn test_raw_keypair_loads() {
    let keypair = Keypair::new();
    let file = write_bytes(&keypair.to_bytes());

    let wallet = Wallet::from_file(file.path()).unwrap();
    assert_eq!(wallet.pubkey(), keypair.pubkey());
    assert_eq!(pubkey_from_keypair_file(file.path()).unwrap(), keypair.pubkey());
}

#[test]
fn test_all_zero_key_rejected() {
    let file = write_bytes(&[0u8; 64]);
    assert!(matches!(load_keypair(file.path()), Err(MintError::Keypair(_))));

    let json = serde_json::to_vec(&vec![0u8; 64]).unwrap();
    let file = write_bytes(&json);
    assert!(matches!(load_keypair(file.path()), Err(MintError::Keypair(_))));
}

#[test]
fn test_wrong_length_rejected() {
    let json = serde_json::to_vec(&vec![7u8; 32]).unwrap();
    let file = write_bytes(&json);

    match load_keypair(file.path()) {
        Err(MintError::Keypair(msg)) => assert!(msg.contains("expected 64 bytes")),
        other => panic!("Expected Keypair error, got {:?}", other.map(|k| k.pubkey())),
    }
}

#[test]
fn test_garbage_rejected() {
    let file = write_bytes(b"not a keypair");
    assert!(matches!(load_keypair(file.path()), Err(MintError::Keypair(_))));
}
