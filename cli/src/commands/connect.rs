//! Shared connection setup for the voting commands

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use votechain_client::chain::{
    provider_accounts, provider_chain_id, Eip1193Provider, VotingReader,
};
use votechain_client::contract::{AddressBook, ContractKind, ContractResolver};
use votechain_client::local::{LocalChain, LocalWalletBackend, DEV_ACCOUNTS};
use votechain_client::networks::{NetworkEnv, SEPOLIA_CHAIN_ID};
use votechain_client::notify::{Notice, NoticeLevel, Notifier};
use votechain_client::orchestrator::VotingOrchestrator;
use votechain_client::runtime::{MockCoprocessor, MockRuntimeFactory, RuntimeFactory};
use votechain_client::session::{WalletAdapter, WalletBackend, WalletEvent};
use votechain_rpc::{HttpProvider, RpcWalletBackend};

use crate::config::{default_config_path, default_data_dir, VotechainConfig};

/// Where and as whom to connect
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// Use the in-process demo chain instead of a node
    #[arg(long)]
    pub local: bool,

    /// Network preset (local, sepolia)
    #[arg(short, long)]
    pub network: Option<String>,

    /// JSON-RPC endpoint
    #[arg(long, env = "VOTECHAIN_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Contract flavour (simple, encrypted)
    #[arg(long)]
    pub contract: Option<ContractKind>,

    /// Contract address override for the connected chain
    #[arg(long)]
    pub address: Option<Address>,

    /// Account to act as
    #[arg(long, env = "VOTECHAIN_ACCOUNT")]
    pub account: Option<Address>,
}

/// Load the configuration file, then apply command-line overrides
pub fn load_config(
    args: &ConnectArgs,
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<VotechainConfig> {
    let mut config = if let Some(path) = &config_path {
        VotechainConfig::load(path)?
    } else {
        let network = args.network.as_deref().unwrap_or("local");
        let default_dir = data_dir.unwrap_or_else(|| default_data_dir(network));
        let default_path = default_config_path(&default_dir);

        if default_path.exists() {
            VotechainConfig::load(&default_path)?
        } else {
            VotechainConfig::for_network(network)
        }
    };

    if let Some(rpc_url) = &args.rpc_url {
        config.network.rpc_url = rpc_url.clone();
    }
    if let Some(kind) = args.contract {
        config.contract.kind = kind;
    }
    if let Some(address) = args.address {
        config.contract.address = Some(address);
    }
    if let Some(account) = args.account {
        config.voting.account = Some(account);
    }

    config.validate()?;
    Ok(config)
}

/// Prints notices to the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let icon = match notice.level {
            NoticeLevel::Success => "✅",
            NoticeLevel::Error => "❌",
            NoticeLevel::Warning => "⚠️ ",
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Loading => "⏳",
        };
        println!("{} {}", icon, notice.message);
        if let Some(description) = notice.description {
            println!("   {}", description);
        }
    }
}

/// A wallet session wired to an orchestrator
pub struct VotingSession {
    pub config: VotechainConfig,
    pub orchestrator: Arc<VotingOrchestrator>,
    adapter: WalletAdapter,
    provider: Arc<dyn Eip1193Provider>,
    chain_id: u64,
    local: Option<Arc<LocalChain>>,
}

impl VotingSession {
    pub async fn open(args: &ConnectArgs, config: VotechainConfig) -> anyhow::Result<Self> {
        let kind = config.contract.kind;
        let env = NetworkEnv::from_env();

        let (provider, backend, factory, chain_id, local): (
            Arc<dyn Eip1193Provider>,
            Arc<dyn WalletBackend>,
            Arc<dyn RuntimeFactory>,
            u64,
            Option<Arc<LocalChain>>,
        ) = if args.local {
            let chain = Arc::new(match kind {
                ContractKind::Simple => LocalChain::simple(),
                ContractKind::Encrypted => LocalChain::encrypted(),
            });
            info!("Using in-process {} chain", kind.contract_name());
            let provider: Arc<dyn Eip1193Provider> = chain.clone();
            let backend: Arc<dyn WalletBackend> = Arc::new(LocalWalletBackend::new(chain.clone()));
            let factory: Arc<dyn RuntimeFactory> = Arc::new(chain.runtime_factory());
            (provider, backend, factory, chain.chain_id(), Some(chain))
        } else {
            let rpc_url = match (&args.rpc_url, env.sepolia_rpc.as_deref()) {
                (None, Some(custom)) if config.network.chain_id == SEPOLIA_CHAIN_ID => {
                    custom.to_string()
                }
                _ => config.network.rpc_url.clone(),
            };
            let http = HttpProvider::with_timeout(
                &rpc_url,
                Duration::from_secs(config.network.request_timeout_secs),
            )?;
            let provider: Arc<dyn Eip1193Provider> = Arc::new(http);
            let chain_id = provider_chain_id(provider.as_ref())
                .await
                .with_context(|| format!("Could not reach node at {}", rpc_url))?;
            if chain_id != config.network.chain_id {
                warn!(
                    "Node at {} serves chain {}, configuration expects {}",
                    rpc_url, chain_id, config.network.chain_id
                );
            }

            let backend = RpcWalletBackend::new(provider.clone(), chain_id, kind).with_polling(
                Duration::from_millis(config.network.poll_interval_ms),
                Duration::from_secs(config.network.receipt_timeout_secs),
            );
            let backend: Arc<dyn WalletBackend> = Arc::new(backend);
            let factory: Arc<dyn RuntimeFactory> =
                Arc::new(MockRuntimeFactory::new(Arc::new(MockCoprocessor::new())));
            (provider, backend, factory, chain_id, None)
        };

        let mut resolver = ContractResolver::from_env(kind, &env);
        if let Some(path) = &config.contract.address_book {
            resolver = resolver.with_address_book(AddressBook::load(path)?);
        }
        if let Some(address) = config.contract.address {
            resolver = resolver.with_override(chain_id, address);
        }

        let adapter = WalletAdapter::new(backend);
        let orchestrator = Arc::new(VotingOrchestrator::new(
            config.orchestrator(),
            resolver,
            adapter.subscribe(),
            factory,
            Arc::new(ConsoleNotifier),
        ));

        Ok(Self {
            config,
            orchestrator,
            adapter,
            provider,
            chain_id,
            local,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn reader(&self) -> Option<Arc<dyn VotingReader>> {
        self.adapter.current().read_client
    }

    /// Account to act as: configured, else the first one the wallet offers
    async fn pick_account(&self) -> anyhow::Result<Address> {
        if let Some(account) = self.config.voting.account {
            return Ok(account);
        }
        if self.local.is_some() {
            return Ok(DEV_ACCOUNTS[1]);
        }
        let accounts = provider_accounts(self.provider.as_ref()).await?;
        accounts
            .first()
            .copied()
            .context("Node exposes no accounts; pass --account")
    }

    /// Connect the wallet and wait for the encryption runtime
    pub async fn connect(&self) -> anyhow::Result<Address> {
        let account = self.pick_account().await?;
        self.connect_as(account).await?;
        Ok(account)
    }

    pub async fn connect_as(&self, account: Address) -> anyhow::Result<()> {
        self.adapter
            .apply(WalletEvent::Connected {
                address: account,
                chain_id: self.chain_id,
                provider: self.provider.clone(),
            })
            .await;

        if let Some(pending) = self.orchestrator.sync_session() {
            pending.await.context("Encryption runtime task failed")?;
        }
        if let Some(err) = self.orchestrator.runtime().error() {
            warn!("Encryption runtime unavailable: {}", err);
        }

        self.orchestrator.refresh_players().await;
        Ok(())
    }
}
