pub mod chain;
pub mod command;
pub mod handle;
pub mod object;

pub use object::{DeploymentRecord, Network};

/// Load the deployment record of a contract from the local deployments
/// directory, if it has one on the given network
pub fn load_contract_deployment(
    network: &Network,
    contract_name: &str,
) -> eyre::Result<Option<DeploymentRecord>> {
    let path = handle::deployment_record_path(network, contract_name);
    handle::load_deployment_record(&path)
}
