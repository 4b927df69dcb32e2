use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::primitives::Address;
use chrono::prelude::Utc;
use eyre::eyre;
use tracing::info;

use crate::{
    chain::{self, Chain, TxOutcome},
    object::{ContractArtifact, DeploymentRecord, Network},
};

/// Artifact name of the OpenZeppelin proxy the contract is deployed behind
const PROXY_ARTIFACT: &str = "ERC1967Proxy";

pub(crate) fn deployment_record_path(network: &Network, contract_name: &str) -> PathBuf {
    PathBuf::from("deployments")
        .join(network.dir_name())
        .join(format!("{contract_name}.json"))
}

pub(crate) fn save_deployment_record(
    path: &Path,
    record: &DeploymentRecord,
) -> eyre::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(record)?)?;
    Ok(())
}

/// A missing record file means the contract was never deployed here; anything
/// else that goes wrong while reading is a real error.
pub(crate) fn load_deployment_record(path: &Path) -> eyre::Result<Option<DeploymentRecord>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&content)?))
}

fn new_record(
    contract_name: &str,
    operation: &str,
    chain_id: u64,
    implementation: &ContractArtifact,
    outcome: &TxOutcome,
) -> DeploymentRecord {
    DeploymentRecord {
        name: contract_name.to_string(),
        date: Utc::now().to_rfc3339(),
        operation: operation.to_string(),
        address: outcome.address,
        abi: implementation.abi.clone(),
        chain_id,
        block_number: outcome.block_number,
        gas_used: outcome.gas_used,
        comment: None,
    }
}

/// Deploy the contract behind a new proxy unless a record of a previous
/// deployment exists, or upgrade the given proxy in place. The record is
/// written only after the transaction is confirmed.
pub async fn ensure_deployed<C: Chain>(
    chain: &C,
    network: &Network,
    contract_name: &str,
    artifacts_dir: &Path,
    upgrade_proxy: Option<Address>,
    record_path: &Path,
) -> eyre::Result<()> {
    match upgrade_proxy {
        None => {
            info!("== {contract_name} deployment to {network} ==");
            if let Some(record) = load_deployment_record(record_path)? {
                info!(
                    "{contract_name} already deployed to {network} at {}",
                    record.address
                );
                return Ok(());
            }

            let chain_id = chain.chain_id().await?;
            info!("ChainId: {chain_id}");
            info!("Deployer address: {}", chain.deployer());

            let implementation = ContractArtifact::load(artifacts_dir, contract_name)?;
            let proxy = ContractArtifact::load(artifacts_dir, PROXY_ARTIFACT)?;
            let outcome = chain.deploy_behind_proxy(&implementation, &proxy).await?;
            save_deployment_record(
                record_path,
                &new_record(contract_name, "deploy", chain_id, &implementation, &outcome),
            )?;
            info!(
                "{contract_name} proxy deployed at: {} (block: {}) with {} gas",
                outcome.address, outcome.block_number, outcome.gas_used
            );
        }
        Some(proxy_address) => {
            info!("==== {contract_name} upgrade at {network} ====");
            info!("Proxy address: {proxy_address}");

            let chain_id = chain.chain_id().await?;
            let implementation = ContractArtifact::load(artifacts_dir, contract_name)?;
            let outcome = chain.upgrade_proxy(proxy_address, &implementation).await?;
            save_deployment_record(
                record_path,
                &new_record(contract_name, "upgrade", chain_id, &implementation, &outcome),
            )?;
            info!(
                "{contract_name} upgraded through proxy: {} (block: {}) with {} gas",
                outcome.address, outcome.block_number, outcome.gas_used
            );
            // verify the new implementation separately, e.g.
            // forge verify-contract --chain <network> <implementation address> <contract>
        }
    }
    Ok(())
}

pub async fn deploy_contract(
    network: String,
    contract_name: String,
    artifacts_dir: String,
    upgrade_proxy: Option<String>,
    private_key: String,
) -> eyre::Result<()> {
    let network: Network = network.try_into()?;
    let upgrade_proxy = upgrade_proxy
        .map(|s| {
            s.parse::<Address>()
                .map_err(|_| eyre!("malformed proxy address: {s}"))
        })
        .transpose()?;
    let chain = chain::connect(&network, &private_key)?;
    let record_path = deployment_record_path(&network, &contract_name);
    ensure_deployed(
        &chain,
        &network,
        &contract_name,
        Path::new(&artifacts_dir),
        upgrade_proxy,
        &record_path,
    )
    .await
}

pub fn print_record(network: String, contract_name: String) -> eyre::Result<()> {
    let network: Network = network.try_into()?;
    let path = deployment_record_path(&network, &contract_name);
    match load_deployment_record(&path)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("{contract_name} has no deployment record on {network}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const PROXY_ADDRESS: Address = Address::repeat_byte(0xe6);
    const DEPLOYED_ADDRESS: Address = Address::repeat_byte(0x11);

    struct MockChain {
        deploys: AtomicUsize,
        upgrades: AtomicUsize,
        fail: bool,
    }

    impl MockChain {
        fn new() -> Self {
            Self {
                deploys: AtomicUsize::new(0),
                upgrades: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait::async_trait]
    impl Chain for MockChain {
        fn deployer(&self) -> Address {
            Address::repeat_byte(0xaa)
        }

        async fn chain_id(&self) -> eyre::Result<u64> {
            Ok(31337)
        }

        async fn deploy_behind_proxy(
            &self,
            _implementation: &ContractArtifact,
            _proxy: &ContractArtifact,
        ) -> eyre::Result<TxOutcome> {
            self.deploys.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(eyre!("transaction reverted"));
            }
            Ok(TxOutcome {
                address: DEPLOYED_ADDRESS,
                block_number: 100,
                gas_used: 1_000_000,
            })
        }

        async fn upgrade_proxy(
            &self,
            proxy_address: Address,
            _implementation: &ContractArtifact,
        ) -> eyre::Result<TxOutcome> {
            self.upgrades.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(eyre!("transaction reverted"));
            }
            Ok(TxOutcome {
                address: proxy_address,
                block_number: 200,
                gas_used: 500_000,
            })
        }
    }

    fn test_env() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let artifacts = tmp.path().join("artifacts");
        fs::create_dir(&artifacts).unwrap();
        for name in ["Brickly", "ERC1967Proxy"] {
            let artifact = json!({
                "contractName": name,
                "abi": [{ "type": "function", "name": "initialize", "inputs": [] }],
                "bytecode": "0x600a600c600039600a6000f3",
            });
            fs::write(artifacts.join(format!("{name}.json")), artifact.to_string()).unwrap();
        }
        let record_path = tmp.path().join("deployments/sepolia/Brickly.json");
        (tmp, artifacts, record_path)
    }

    async fn run(
        chain: &MockChain,
        artifacts: &Path,
        upgrade_proxy: Option<Address>,
        record_path: &Path,
    ) -> eyre::Result<()> {
        ensure_deployed(
            chain,
            &Network::Sepolia,
            "Brickly",
            artifacts,
            upgrade_proxy,
            record_path,
        )
        .await
    }

    #[tokio::test]
    async fn first_deployment_performs_one_deploy_and_writes_one_record() {
        let (_tmp, artifacts, record_path) = test_env();
        let chain = MockChain::new();

        run(&chain, &artifacts, None, &record_path).await.unwrap();

        assert_eq!(chain.deploys.load(Ordering::SeqCst), 1);
        assert_eq!(chain.upgrades.load(Ordering::SeqCst), 0);
        let record = load_deployment_record(&record_path).unwrap().unwrap();
        assert_eq!(record.address, DEPLOYED_ADDRESS);
        assert_eq!(record.operation, "deploy");
        assert_eq!(record.chain_id, 31337);
        assert_eq!(record.block_number, 100);
        assert!(record.abi.is_array());
    }

    #[tokio::test]
    async fn recorded_deployment_short_circuits_without_transactions() {
        let (_tmp, artifacts, record_path) = test_env();
        let chain = MockChain::new();

        run(&chain, &artifacts, None, &record_path).await.unwrap();
        run(&chain, &artifacts, None, &record_path).await.unwrap();

        assert_eq!(chain.deploys.load(Ordering::SeqCst), 1);
        assert_eq!(chain.upgrades.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upgrade_runs_once_regardless_of_existing_record() {
        let (_tmp, artifacts, record_path) = test_env();
        let chain = MockChain::new();

        run(&chain, &artifacts, None, &record_path).await.unwrap();
        run(&chain, &artifacts, Some(PROXY_ADDRESS), &record_path)
            .await
            .unwrap();

        assert_eq!(chain.deploys.load(Ordering::SeqCst), 1);
        assert_eq!(chain.upgrades.load(Ordering::SeqCst), 1);
        let record = load_deployment_record(&record_path).unwrap().unwrap();
        assert_eq!(record.address, PROXY_ADDRESS);
        assert_eq!(record.operation, "upgrade");
    }

    #[tokio::test]
    async fn upgrade_without_prior_record_still_writes_one() {
        let (_tmp, artifacts, record_path) = test_env();
        let chain = MockChain::new();

        run(&chain, &artifacts, Some(PROXY_ADDRESS), &record_path)
            .await
            .unwrap();

        assert_eq!(chain.deploys.load(Ordering::SeqCst), 0);
        assert_eq!(chain.upgrades.load(Ordering::SeqCst), 1);
        let record = load_deployment_record(&record_path).unwrap().unwrap();
        assert_eq!(record.address, PROXY_ADDRESS);
    }

    #[tokio::test]
    async fn failed_deployment_leaves_no_record() {
        let (_tmp, artifacts, record_path) = test_env();
        let chain = MockChain::failing();

        assert!(run(&chain, &artifacts, None, &record_path).await.is_err());
        assert!(!record_path.exists());
    }

    #[tokio::test]
    async fn failed_upgrade_keeps_the_previous_record() {
        let (_tmp, artifacts, record_path) = test_env();

        run(&MockChain::new(), &artifacts, None, &record_path)
            .await
            .unwrap();
        let failing = MockChain::failing();
        assert!(run(&failing, &artifacts, Some(PROXY_ADDRESS), &record_path)
            .await
            .is_err());

        let record = load_deployment_record(&record_path).unwrap().unwrap();
        assert_eq!(record.operation, "deploy");
        assert_eq!(record.address, DEPLOYED_ADDRESS);
    }

    #[test]
    fn absent_record_is_none_but_malformed_record_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Brickly.json");

        assert!(load_deployment_record(&path).unwrap().is_none());

        fs::write(&path, "not json").unwrap();
        assert!(load_deployment_record(&path).is_err());
    }
}
