use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod balances;
pub mod config;
pub mod connect;
pub mod consts;
pub mod dev;
pub mod events;
pub mod keys;
pub mod migration;
pub mod staking;
pub mod subscription;

use config::Config;
use migration::{CallEncoder, MetadataCallEncoder};
use staking::ChainStakingSource;

/// Builds reserve-to-locks migration calls for the parachain staking pallet.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file; defaults to ./data/config.json when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the collator and delegator migration calls (default).
    Migrate,
    /// Query balances, transfer and watch events on a development node.
    Dev,
}

impl Cli {
    /// Like `Parser::try_parse_from`, but usage errors exit with status 1.
    pub fn parse_or_exit<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(cli) => cli,
            // --help and --version
            Err(err) if !err.use_stderr() => {
                let _ = err.print();
                std::process::exit(0);
            }
            Err(err) => {
                let _ = err.print();
                std::process::exit(1);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse_or_exit(std::env::args_os());
    match run(cli).await {
        Ok(()) => println!("successfully exited"),
        Err(err) => {
            println!("error occur: {:?}", err);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match cli.mode.unwrap_or(Mode::Migrate) {
        Mode::Migrate => migrate(&config).await,
        Mode::Dev => {
            let api = connect::connect(&config.dev.host).await?;
            dev::run(&api, &config.dev).await
        }
    }
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    let api = connect::connect(&config.host).await?;
    let source = ChainStakingSource::new(&api, config.ss58_prefix);

    let mut out = std::io::stdout();
    let accounts = staking::gather_accounts(
        &source,
        config.collator_override.as_deref(),
        config.fetch_concurrency,
        &mut out,
    )
    .await?;

    let metadata_encoder;
    let encoder: &dyn CallEncoder = match &config.call_indices {
        Some(indices) => indices,
        None => {
            metadata_encoder = MetadataCallEncoder::new(&api);
            &metadata_encoder
        }
    };
    let plan = migration::build_plan(encoder, &accounts.collators, &accounts.delegators, config.batch_size)?;
    migration::write_plan(&mut out, &plan)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_means_migrate_with_default_config() {
        let cli = Cli::try_parse_from(["parachain-staking-migrate"]).unwrap();
        assert_eq!(cli.mode, None);
        assert_eq!(cli.config, None);
    }

    #[test]
    fn config_flag_is_accepted_before_or_after_the_mode() {
        let cli = Cli::try_parse_from(["parachain-staking-migrate", "--config", "a.json", "dev"]).unwrap();
        assert_eq!(cli.mode, Some(Mode::Dev));
        assert_eq!(cli.config, Some(PathBuf::from("a.json")));

        let cli = Cli::try_parse_from(["parachain-staking-migrate", "migrate", "--config", "b.json"]).unwrap();
        assert_eq!(cli.mode, Some(Mode::Migrate));
        assert_eq!(cli.config, Some(PathBuf::from("b.json")));
    }

    #[test]
    fn bare_path_and_unknown_mode_are_rejected() {
        assert!(Cli::try_parse_from(["parachain-staking-migrate", "bogus"]).is_err());
        assert!(Cli::try_parse_from(["parachain-staking-migrate", "cfg.json"]).is_err());
    }
}
