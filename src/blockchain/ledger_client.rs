// src/blockchain/ledger_client.rs
//! EVM ledger client.
//!
//! Read-only access to contracts on an EVM chain: `eth_call` queries and gas
//! estimation. Nothing here signs or sends transactions; credential signing is
//! an off-chain operation.

use ethers::providers::{Http, Middleware, Provider};
use ethers_contract::{BaseContract, Contract};
use ethers_core::{
    abi::{Abi, Detokenize, Tokenize},
    types::{Address, U256},
};
use log::debug;
use std::sync::Arc;

use crate::error::{ConfigError, Error, Result};

/// Thin wrapper over a middleware stack used for contract reads.
///
/// Generic over the middleware so tests can run against a mocked provider.
#[derive(Debug)]
pub struct LedgerClient<M> {
    client: Arc<M>,
}

impl<M> Clone for LedgerClient<M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl LedgerClient<Provider<Http>> {
    /// Creates a client for an HTTP JSON-RPC endpoint.
    ///
    /// # Arguments
    /// * `rpc_url` - JSON-RPC endpoint URL
    ///
    /// # Errors
    /// `Configuration` if the URL cannot be parsed. No request is made here.
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|err| ConfigError::Settings(format!("invalid rpc url `{rpc_url}`: {err}")))?;
        Ok(Self::new(Arc::new(provider)))
    }
}

impl<M: Middleware + 'static> LedgerClient<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }

    /// Chain id reported by the node.
    pub async fn chain_id(&self) -> Result<u64> {
        let chain_id = self
            .client
            .get_chainid()
            .await
            .map_err(|err| Error::External(err.to_string()))?;
        Ok(chain_id.as_u64())
    }

    /// Queries a smart contract (read-only operation).
    ///
    /// # Arguments
    /// * `contract_address` - Address of the target contract
    /// * `abi` - Contract ABI bytes
    /// * `method` - Method name to call
    /// * `params` - Method parameters
    ///
    /// # Returns
    /// Decoded return value from the contract call
    ///
    /// # Errors
    /// - `Configuration` if the ABI cannot be loaded
    /// - `External` if the parameters do not fit the method, the call reverts
    ///   or the node is unreachable
    pub async fn query_contract<R: Detokenize>(
        &self,
        contract_address: Address,
        abi: &[u8],
        method: &str,
        params: impl Tokenize,
    ) -> Result<R> {
        debug!("eth_call {method} on {contract_address:?}");
        self.contract(contract_address, abi)?
            .method::<_, R>(method, params)
            .map_err(|err| Error::External(err.to_string()))?
            .call()
            .await
            .map_err(|err| Error::External(err.to_string()))
    }

    /// Estimates the gas a call to `method` would consume.
    pub async fn estimate_gas(
        &self,
        contract_address: Address,
        abi: &[u8],
        method: &str,
        params: impl Tokenize,
    ) -> Result<U256> {
        self.contract(contract_address, abi)?
            .method::<_, ()>(method, params)
            .map_err(|err| Error::External(err.to_string()))?
            .estimate_gas()
            .await
            .map_err(|err| Error::External(err.to_string()))
    }

    fn contract(&self, contract_address: Address, abi: &[u8]) -> Result<Contract<M>> {
        let abi = Abi::load(abi)
            .map_err(|err| ConfigError::Settings(format!("invalid contract ABI: {err}")))?;
        Ok(Contract::new(
            contract_address,
            BaseContract::from(abi),
            self.client.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use ethers::providers::MockProvider;

    fn mocked() -> (LedgerClient<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (LedgerClient::new(Arc::new(provider)), mock)
    }

    #[tokio::test]
    async fn test_chain_id_from_node() {
        let (client, mock) = mocked();
        mock.push::<U256, _>(U256::from(11_155_111u64)).unwrap();
        assert_eq!(client.chain_id().await.unwrap(), 11_155_111);
    }

    #[tokio::test]
    async fn test_node_failure_is_external() {
        let (client, _mock) = mocked();
        let err = client.chain_id().await.unwrap_err();
        assert_eq!(err.stage(), Stage::External);
    }

    #[tokio::test]
    async fn test_invalid_abi_is_configuration() {
        let (client, _mock) = mocked();
        let err = client
            .query_contract::<bool>(Address::zero(), b"not json", "verifyDaoVc", ())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Configuration);
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        assert!(LedgerClient::connect("not a url").is_err());
        assert!(LedgerClient::connect("http://localhost:8545").is_ok());
    }
}
