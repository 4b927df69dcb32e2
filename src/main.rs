use brickly_deployer::{
    command::{Cli, Commands},
    handle,
};
use clap::Parser;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Deploy {
            contract_name,
            upgrade_proxy,
            artifacts_dir,
            private_key,
        } => {
            handle::deploy_contract(
                cli.network,
                contract_name,
                artifacts_dir,
                upgrade_proxy,
                private_key,
            )
            .await
        }
        Commands::Record { contract_name } => handle::print_record(cli.network, contract_name),
    }
}
