use alloy::{
    network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol,
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use eyre::eyre;
use tracing::debug;

use crate::object::{ContractArtifact, Network};

sol! {
    #[sol(rpc)]
    interface IUUPSUpgradeable {
        function upgradeToAndCall(address newImplementation, bytes data) external payable;
    }

    interface IInitializable {
        function initialize() external;
    }
}

/// Outcome of a confirmed deploy or upgrade transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub address: Address,
    pub block_number: u64,
    pub gas_used: u64,
}

/// On-chain operations the orchestrator needs. The real implementation talks
/// to an EVM node; tests substitute their own to count transactions.
#[async_trait]
pub trait Chain: Send + Sync {
    fn deployer(&self) -> Address;

    async fn chain_id(&self) -> eyre::Result<u64>;

    /// Deploy the implementation, then an ERC-1967 proxy pointing at it,
    /// initialized through `initialize()`.
    async fn deploy_behind_proxy(
        &self,
        implementation: &ContractArtifact,
        proxy: &ContractArtifact,
    ) -> eyre::Result<TxOutcome>;

    /// Deploy a fresh implementation and switch the given proxy over to it.
    async fn upgrade_proxy(
        &self,
        proxy_address: Address,
        implementation: &ContractArtifact,
    ) -> eyre::Result<TxOutcome>;
}

pub struct EvmChain<P> {
    provider: P,
    deployer: Address,
}

/// Connect to the network with a local private-key signer.
pub fn connect(network: &Network, private_key: &str) -> eyre::Result<EvmChain<impl Provider>> {
    let signer: PrivateKeySigner = private_key
        .trim()
        .parse()
        .map_err(|_| eyre!("malformed deployer private key"))?;
    let deployer = signer.address();
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(network.rpc_url()?);
    Ok(EvmChain { provider, deployer })
}

/// Creation code for the proxy: artifact bytecode followed by the ABI-encoded
/// `(implementation, initData)` constructor arguments.
fn proxy_deploy_code(proxy: &ContractArtifact, impl_address: Address) -> eyre::Result<Bytes> {
    let init_data = IInitializable::initializeCall {}.abi_encode();
    let args = (impl_address, Bytes::from(init_data)).abi_encode_params();
    Ok([proxy.deploy_code()?.to_vec(), args].concat().into())
}

impl<P: Provider> EvmChain<P> {
    async fn deploy_code(&self, code: Bytes) -> eyre::Result<(Address, u64, u64)> {
        let tx = TransactionRequest::default().with_deploy_code(code);
        let receipt = self
            .provider
            .send_transaction(tx)
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(eyre!(
                "deployment transaction reverted: {}",
                receipt.transaction_hash()
            ));
        }
        let address = receipt
            .contract_address()
            .ok_or_else(|| eyre!("no contract address in receipt"))?;
        let block_number = receipt
            .block_number()
            .ok_or_else(|| eyre!("confirmed receipt carries no block number"))?;
        Ok((address, block_number, receipt.gas_used()))
    }
}

#[async_trait]
impl<P: Provider> Chain for EvmChain<P> {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> eyre::Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn deploy_behind_proxy(
        &self,
        implementation: &ContractArtifact,
        proxy: &ContractArtifact,
    ) -> eyre::Result<TxOutcome> {
        let (impl_address, ..) = self.deploy_code(implementation.deploy_code()?).await?;
        debug!("implementation deployed at: {impl_address}");

        let (address, block_number, gas_used) = self
            .deploy_code(proxy_deploy_code(proxy, impl_address)?)
            .await?;
        Ok(TxOutcome {
            address,
            block_number,
            gas_used,
        })
    }

    async fn upgrade_proxy(
        &self,
        proxy_address: Address,
        implementation: &ContractArtifact,
    ) -> eyre::Result<TxOutcome> {
        let (impl_address, ..) = self.deploy_code(implementation.deploy_code()?).await?;
        debug!("new implementation deployed at: {impl_address}");

        let proxy = IUUPSUpgradeable::new(proxy_address, &self.provider);
        let receipt = proxy
            .upgradeToAndCall(impl_address, Bytes::new())
            .send()
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(eyre!(
                "upgrade transaction reverted: {}",
                receipt.transaction_hash()
            ));
        }
        let block_number = receipt
            .block_number()
            .ok_or_else(|| eyre!("confirmed receipt carries no block number"))?;
        Ok(TxOutcome {
            // the proxy keeps its address across upgrades
            address: proxy_address,
            block_number,
            gas_used: receipt.gas_used(),
        })
    }
}
