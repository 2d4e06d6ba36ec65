//! Configuration module for the minter client
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and converts the raw values into the typed
//! options the session consumes.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};

use crate::errors::{MintError, MintResult};
use crate::funding::FundingOptions;
use crate::programs::{DEFAULT_UPDATE_AUTHORITY, METADATA_PROGRAM_ID};
use crate::submit::SubmitOptions;

/// Environment variable that overrides `rpc.url`
pub const RPC_URL_ENV: &str = "MINTER_RPC_URL";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Payer wallet
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Deployed minter program
    #[serde(default)]
    pub program: ProgramConfig,

    /// Mint parameters
    pub mint: MintConfig,

    /// Submission and funding behavior
    #[serde(default)]
    pub submit: SubmitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// processed, confirmed or finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to the payer keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Minter program address
    #[serde(default)]
    pub program_id: Option<String>,

    /// Deploy keypair the program id is read from when `program_id` is unset
    #[serde(default)]
    pub keypair_path: Option<String>,

    /// Token metadata program
    #[serde(default = "default_metadata_program")]
    pub metadata_program_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintConfig {
    /// Existing token the minter program burns
    pub secondary_mint: String,

    /// Update authority written into the new metadata
    #[serde(default = "default_update_authority")]
    pub update_authority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    /// Skip node-side simulation before transmission
    #[serde(default = "default_true")]
    pub skip_preflight: bool,

    /// Delay between status queries in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for confirmation after this many seconds
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    /// Airdrop the shortfall when the payer cannot cover fees and rent
    #[serde(default = "default_true")]
    pub airdrop: bool,
}

// Default value functions
fn default_rpc_url() -> String { "http://127.0.0.1:8899".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_metadata_program() -> String { METADATA_PROGRAM_ID.to_string() }
fn default_update_authority() -> String { DEFAULT_UPDATE_AUTHORITY.to_string() }
fn default_poll_interval_ms() -> u64 { 500 }
fn default_confirm_timeout() -> u64 { 60 }
fn default_true() -> bool { true }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            skip_preflight: true,
            poll_interval_ms: default_poll_interval_ms(),
            confirm_timeout_secs: default_confirm_timeout(),
            airdrop: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `MINTER_RPC_URL` when set
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(RPC_URL_ENV) {
            if !url.trim().is_empty() {
                self.rpc.url = url;
            }
        }
    }

    /// Check every value that can be checked without the network
    pub fn validate(&self) -> MintResult<()> {
        if self.rpc.url.trim().is_empty() {
            return Err(MintError::Configuration("rpc.url must not be empty".to_string()));
        }
        if self.rpc.timeout_secs == 0 {
            return Err(MintError::Configuration("rpc.timeout_secs must be > 0".to_string()));
        }
        self.commitment()?;

        if self.program.program_id.is_none() && self.program.keypair_path.is_none() {
            return Err(MintError::Configuration(
                "program.program_id or program.keypair_path is required".to_string(),
            ));
        }
        if self.program.program_id.is_some() {
            self.program_id()?;
        }
        self.metadata_program_id()?;
        self.secondary_mint()?;
        self.update_authority()?;

        if self.submit.poll_interval_ms == 0 {
            return Err(MintError::Configuration(
                "submit.poll_interval_ms must be > 0".to_string(),
            ));
        }
        if self.submit.confirm_timeout_secs == 0 {
            return Err(MintError::Configuration(
                "submit.confirm_timeout_secs must be > 0".to_string(),
            ));
        }
        let timeout_ms = self.submit.confirm_timeout_secs.saturating_mul(1000);
        if self.submit.poll_interval_ms >= timeout_ms {
            return Err(MintError::Configuration(
                "submit.poll_interval_ms must be shorter than submit.confirm_timeout_secs".to_string(),
            ));
        }

        Ok(())
    }

    pub fn commitment(&self) -> MintResult<CommitmentConfig> {
        match self.rpc.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(MintError::Configuration(format!(
                "rpc.commitment must be processed, confirmed or finalized, got '{}'",
                other
            ))),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    /// Explicit program id, `None` when it comes from the deploy keypair
    pub fn program_id(&self) -> MintResult<Option<Pubkey>> {
        self.program
            .program_id
            .as_deref()
            .map(|value| parse_pubkey("program.program_id", value))
            .transpose()
    }

    pub fn metadata_program_id(&self) -> MintResult<Pubkey> {
        parse_pubkey("program.metadata_program_id", &self.program.metadata_program_id)
    }

    pub fn secondary_mint(&self) -> MintResult<Pubkey> {
        parse_pubkey("mint.secondary_mint", &self.mint.secondary_mint)
    }

    pub fn update_authority(&self) -> MintResult<Pubkey> {
        parse_pubkey("mint.update_authority", &self.mint.update_authority)
    }

    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            skip_preflight: self.submit.skip_preflight,
            poll_interval: Duration::from_millis(self.submit.poll_interval_ms),
            confirm_timeout: Duration::from_secs(self.submit.confirm_timeout_secs),
        }
    }

    pub fn funding_options(&self) -> FundingOptions {
        FundingOptions {
            airdrop: self.submit.airdrop,
            poll_interval: Duration::from_millis(self.submit.poll_interval_ms),
            confirm_timeout: Duration::from_secs(self.submit.confirm_timeout_secs),
        }
    }
}

fn parse_pubkey(field: &str, value: &str) -> MintResult<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|e| MintError::Configuration(format!("{} '{}' is not a valid address: {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECONDARY: &str = "So11111111111111111111111111111111111111112";

    fn minimal() -> String {
        format!(
            r#"
[program]
program_id = "{}"

[mint]
secondary_mint = "{}"
"#,
            Pubkey::new_unique(),
            SECONDARY
        )
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = Config::from_toml(&minimal()).unwrap();

        assert_eq!(config.rpc.url, "http://127.0.0.1:8899");
        assert_eq!(config.commitment().unwrap(), CommitmentConfig::confirmed());
        assert!(config.submit.skip_preflight);
        assert!(config.submit.airdrop);
        assert_eq!(config.update_authority().unwrap(), DEFAULT_UPDATE_AUTHORITY);
        assert_eq!(config.metadata_program_id().unwrap(), METADATA_PROGRAM_ID);
        assert_eq!(
            config.submit_options().poll_interval,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_missing_secondary_mint_rejected() {
        let toml = format!("[program]\nprogram_id = \"{}\"\n", Pubkey::new_unique());
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn test_program_source_required() {
        let toml = format!("[mint]\nsecondary_mint = \"{}\"\n", SECONDARY);
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("program.program_id"));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut config = Config::from_toml(&minimal()).unwrap();
        config.mint.update_authority = "not-a-key".to_string();

        assert!(matches!(
            config.validate(),
            Err(MintError::Configuration(msg)) if msg.contains("mint.update_authority")
        ));
    }

    #[test]
    fn test_unknown_commitment_rejected() {
        let mut config = Config::from_toml(&minimal()).unwrap();
        config.rpc.commitment = "max".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_bounded_by_timeout() {
        let mut config = Config::from_toml(&minimal()).unwrap();
        config.submit.poll_interval_ms = 5_000;
        config.submit.confirm_timeout_secs = 2;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_confirm_timeout_accepted() {
        let mut config = Config::from_toml(&minimal()).unwrap();
        config.submit.confirm_timeout_secs = u64::MAX;

        assert!(config.validate().is_ok());
        assert_eq!(
            config.submit_options().confirm_timeout,
            Duration::from_secs(u64::MAX)
        );
    }
}
