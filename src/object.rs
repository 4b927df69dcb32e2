use std::{fmt::Display, fs, path::Path};

use alloy::primitives::{Address, Bytes};
use eyre::eyre;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Sepolia,
    Custom(Url),
}

impl Network {
    /// RPC endpoint of the network. Named networks resolve through the
    /// `MAINNET_RPC_URL` / `SEPOLIA_RPC_URL` environment variables.
    pub fn rpc_url(&self) -> eyre::Result<Url> {
        match self {
            Network::Mainnet => env_rpc_url("MAINNET_RPC_URL"),
            Network::Sepolia => env_rpc_url("SEPOLIA_RPC_URL"),
            Network::Custom(url) => Ok(url.clone()),
        }
    }

    /// Directory name the network's deployment records live under
    pub fn dir_name(&self) -> String {
        match self {
            Network::Mainnet => "mainnet".to_string(),
            Network::Sepolia => "sepolia".to_string(),
            Network::Custom(url) => url.host_str().unwrap_or("custom").to_string(),
        }
    }
}

fn env_rpc_url(var: &str) -> eyre::Result<Url> {
    let raw = std::env::var(var).map_err(|_| eyre!("{var} must be set for this network"))?;
    raw.parse().map_err(|_| eyre!("{var} is not a valid url: {raw}"))
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Sepolia => write!(f, "sepolia"),
            Network::Custom(url) => write!(f, "{}", url),
        }
    }
}

impl TryFrom<String> for Network {
    type Error = eyre::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "sepolia" => Ok(Network::Sepolia),
            _ => Ok(Network::Custom(
                value.parse().map_err(|_| eyre!("unknown network: {value}"))?,
            )),
        }
    }
}

/// The persisted outcome of a deployment or upgrade. One record exists per
/// contract per network; a successful upgrade overwrites it in place.
#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct DeploymentRecord {
    pub name: String,
    pub date: String,
    pub operation: String,
    pub address: Address,
    /// Interface descriptor of the deployed implementation, as emitted by the
    /// contract compiler
    pub abi: serde_json::Value,
    pub chain_id: u64,
    pub block_number: u64,
    pub gas_used: u64,
    // This field is not required, so you can edit your <contract>.json file to add comment for cooperations
    #[serde(default)]
    pub comment: Option<String>,
}

/// Compiled contract artifact in the Hardhat output format.
#[derive(serde::Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub abi: serde_json::Value,
    pub bytecode: String,
}

impl ContractArtifact {
    pub fn load(artifacts_dir: &Path, contract_name: &str) -> eyre::Result<Self> {
        let path = artifacts_dir.join(format!("{contract_name}.json"));
        let content =
            fs::read(&path).map_err(|e| eyre!("{e}: {}", path.to_string_lossy()))?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Creation bytecode, without constructor arguments
    pub fn deploy_code(&self) -> eyre::Result<Bytes> {
        self.bytecode
            .parse()
            .map_err(|_| eyre!("malformed bytecode in {} artifact", self.contract_name))
    }
}
