use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The network to connect to, options are `mainnet`, `sepolia`, or an RPC url like `http://localhost:8545`
    #[arg(short, long, default_value_t = String::from("sepolia"))]
    pub network: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the contract behind a new upgradeable proxy, or upgrade an existing proxy
    Deploy {
        /// Contract name in the artifacts directory
        #[arg(long, default_value_t = String::from("Brickly"))]
        contract_name: String,
        /// Proxy address to upgrade; the deployer must have upgrade access.
        /// When absent, a first deployment is performed unless one is already recorded
        #[arg(long)]
        upgrade_proxy: Option<String>,
        /// Directory holding the compiled contract artifacts
        #[arg(long, default_value_t = String::from("artifacts"))]
        artifacts_dir: String,
        /// Hex-encoded private key of the deployer account
        #[arg(long, env = "DEPLOYER_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
    },
    /// Print the deployment record of a contract, if any
    Record {
        /// The contract name whose record will be printed
        #[arg(long, default_value_t = String::from("Brickly"))]
        contract_name: String,
    },
}
