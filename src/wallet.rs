//! Keypair file loading

use std::path::{Path, PathBuf};
use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

use crate::errors::{MintError, MintResult};

/// Load a keypair from a Solana CLI JSON file or a raw 64-byte file
///
/// A leading `~/` is expanded against `$HOME`.
pub fn load_keypair(path: impl AsRef<Path>) -> MintResult<Keypair> {
    let path = expand_home(path.as_ref());
    let keypair_bytes = std::fs::read(&path).map_err(|e| {
        MintError::Keypair(format!("failed to read keypair file {}: {}", path.display(), e))
    })?;

    let secret: Vec<u8> = if keypair_bytes.len() == 64 {
        keypair_bytes
    } else {
        serde_json::from_slice(&keypair_bytes).map_err(|e| {
            MintError::Keypair(format!("failed to parse keypair JSON {}: {}", path.display(), e))
        })?
    };

    if secret.len() != 64 {
        return Err(MintError::Keypair(format!(
            "invalid keypair length: expected 64 bytes, got {}",
            secret.len()
        )));
    }
    if secret.iter().all(|&b| b == 0) {
        return Err(MintError::Keypair("all-zero key rejected".to_string()));
    }

    Keypair::try_from(secret.as_slice())
        .map_err(|e| MintError::Keypair(format!("invalid keypair bytes: {}", e)))
}

/// Address of the keypair stored at `path`
///
/// Used to discover a program id from its deploy keypair.
pub fn pubkey_from_keypair_file(path: impl AsRef<Path>) -> MintResult<Pubkey> {
    Ok(load_keypair(path)?.pubkey())
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Payer wallet shared across the session
#[derive(Clone)]
pub struct Wallet {
    keypair: Arc<Keypair>,
}

impl Wallet {
    pub fn from_file(path: impl AsRef<Path>) -> MintResult<Self> {
        Ok(Self::from_keypair(load_keypair(path)?))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair_arc(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home_only_touches_tilde_prefix() {
        let absolute = Path::new("/etc/keys/id.json");
        assert_eq!(expand_home(absolute), absolute.to_path_buf());

        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_home(Path::new("~/id.json")),
                PathBuf::from(home).join("id.json")
            );
        }
    }

    #[test]
    fn test_missing_file_is_keypair_error() {
        let result = load_keypair("/nonexistent/minter/id.json");
        assert!(matches!(result, Err(MintError::Keypair(_))));
    }
}
