// src/config.rs
//! Runtime settings.
//!
//! Layered with the `config` crate, later sources overriding earlier ones:
//! 1. built-in defaults
//! 2. optional `dao-vc.toml` in the working directory
//! 3. `DAO_VC_*` environment variables (a `.env` file is loaded first)
//!
//! | key                  | default                 |
//! |----------------------|-------------------------|
//! | `private_key`        | none                    |
//! | `chain_id`           | `1`                     |
//! | `domain_name`        | `dao-vc-verifier-test`  |
//! | `domain_version`     | `"1"`                   |
//! | `verifying_contract` | zero address            |
//! | `rpc_url`            | none                    |
//! | `verifier_contract`  | none                    |

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use dotenv::dotenv;
use ethers::types::Address;
use serde::Deserialize;
use std::fmt;

use crate::eip712::domain::{DomainSeparator, DOMAIN_VERSION};
use crate::error::ConfigError;
use crate::utils::crypto::parse_address;
use crate::wallet::key_management::KeyManager;

pub const CONFIG_FILE: &str = "dao-vc";
pub const ENV_PREFIX: &str = "DAO_VC";
pub const DEFAULT_DOMAIN_NAME: &str = "dao-vc-verifier-test";
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub private_key: Option<String>,
    pub chain_id: u64,
    pub domain_name: String,
    pub domain_version: String,
    pub verifying_contract: String,
    pub rpc_url: Option<String>,
    pub verifier_contract: Option<String>,
}

impl Settings {
    /// Loads settings from defaults, `dao-vc.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_builder(
            defaults()?
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(Environment::with_prefix(ENV_PREFIX)),
        )
    }

    /// Builds and validates settings from an arbitrary source stack.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Fails fast on values that would only surface later as signing or
    /// verification errors.
    fn validate(&self) -> Result<(), ConfigError> {
        self.domain()?;
        if let Some(address) = &self.verifier_contract {
            parse_address(address)?;
        }
        if let Some(key) = &self.private_key {
            KeyManager::from_private_key(key)?;
        }
        Ok(())
    }

    pub fn domain(&self) -> Result<DomainSeparator, ConfigError> {
        DomainSeparator::new(
            self.domain_name.clone(),
            self.domain_version.clone(),
            self.chain_id,
            &self.verifying_contract,
        )
    }

    /// Issuer key; required for issuing.
    pub fn key_manager(&self) -> Result<KeyManager, ConfigError> {
        let key = self
            .private_key
            .as_deref()
            .ok_or(ConfigError::MissingSetting("private_key"))?;
        KeyManager::from_private_key(key)
    }

    pub fn rpc_url(&self) -> Result<&str, ConfigError> {
        self.rpc_url
            .as_deref()
            .ok_or(ConfigError::MissingSetting("rpc_url"))
    }

    pub fn verifier_contract(&self) -> Result<Address, ConfigError> {
        let address = self
            .verifier_contract
            .as_deref()
            .ok_or(ConfigError::MissingSetting("verifier_contract"))?;
        parse_address(address)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("chain_id", &self.chain_id)
            .field("domain_name", &self.domain_name)
            .field("domain_version", &self.domain_version)
            .field("verifying_contract", &self.verifying_contract)
            .field("rpc_url", &self.rpc_url)
            .field("verifier_contract", &self.verifier_contract)
            .finish()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("chain_id", 1u64)?
        .set_default("domain_name", DEFAULT_DOMAIN_NAME)?
        .set_default("domain_version", DOMAIN_VERSION)?
        .set_default("verifying_contract", ZERO_ADDRESS)?)
}
