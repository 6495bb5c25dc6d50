//! Command line access to a UnionPay contract and to the node helpers.

mod config;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Parser, Subcommand};
use config::{Config, DEFAULT_NODE_URL};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use unionpay::log::LogFilterBuilder;
use unionpay::node;
use unionpay::prelude::*;
use unionpay::{topic_hash, ContractDescriptor};

#[derive(Debug, Parser)]
#[command(name = "unionpay", version, about = "Inspect and operate a UnionPay contract")]
struct Args {
    /// TOML configuration file.
    #[arg(long, env = "UNIONPAY_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP JSON-RPC endpoint of the node (default: http://localhost:8545).
    #[arg(long)]
    node_url: Option<String>,

    /// Address of the UnionPay contract.
    #[arg(long, value_parser = parse_address)]
    contract: Option<Address>,

    /// Contract artifact JSON to use instead of the bundled one.
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Environment variable holding the hex private key used for signing.
    #[arg(long, default_value = "UNIONPAY_PRIVATE_KEY")]
    key_env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the topic hash of an event signature.
    TopicHash {
        /// For example `Transfer(address,address,uint256)`.
        signature: String,
    },
    /// Check whether code is deployed at an address.
    IsContract {
        #[arg(value_parser = parse_address)]
        address: Address,
    },
    /// Print whether a transaction is pending, succeeded or reverted.
    Status {
        #[arg(value_parser = parse_hash)]
        tx: H256,
    },
    /// Print the sender of a transaction.
    Sender {
        #[arg(value_parser = parse_hash)]
        tx: H256,
    },
    /// Print past logs as JSON lines.
    Logs {
        /// Emitting contracts, any if omitted.
        #[arg(long, value_parser = parse_address)]
        address: Vec<Address>,
        /// Accepted values of the first topic, any if omitted.
        #[arg(long, value_parser = parse_hash)]
        topic: Vec<H256>,
        /// First block, inclusive.
        #[arg(long)]
        from: Option<u64>,
        /// Last block, inclusive.
        #[arg(long)]
        to: Option<u64>,
    },
    /// Print the ETH balance held by the contract.
    Balance,
    /// Print the contract owner.
    Owner,
    /// Print the platform account.
    Platform,
    /// Print UserPay events as they happen, until interrupted.
    Watch,
    /// Deploy a new UnionPay contract signed with the private key.
    Deploy,
}

/// Values resolved from flags, the config file and defaults.
struct Settings {
    node_url: String,
    contract: Option<Address>,
    artifact: Option<PathBuf>,
    poll_interval: Option<Duration>,
    chain_id: Option<u64>,
    key_env: String,
}

impl Settings {
    fn resolve(args: &Args, config: Config) -> Self {
        Settings {
            node_url: args
                .node_url
                .clone()
                .or(config.node_url)
                .unwrap_or_else(|| DEFAULT_NODE_URL.to_owned()),
            contract: args.contract.or(config.contract),
            artifact: args.artifact.clone().or(config.artifact),
            poll_interval: config.poll_interval_ms.map(Duration::from_millis),
            chain_id: config.chain_id,
            key_env: args.key_env.clone(),
        }
    }

    fn descriptor(&self) -> Result<ContractDescriptor> {
        match &self.artifact {
            Some(path) => ContractDescriptor::load(path)
                .with_context(|| format!("failed to load artifact {}", path.display())),
            None => Ok(UnionPay::<Http>::artifact()?),
        }
    }

    fn union_pay(&self, web3: Web3<Http>) -> Result<UnionPay<Http>> {
        let address = self
            .contract
            .ok_or_else(|| anyhow!("no contract address, use --contract or the config file"))?;
        Ok(UnionPay::at(web3, &self.descriptor()?, address))
    }

    fn account(&self) -> Result<Account> {
        let key = std::env::var(&self.key_env)
            .with_context(|| format!("private key variable {} is not set", self.key_env))?;
        let key = PrivateKey::from_hex_str(key)
            .with_context(|| format!("{} does not hold a valid private key", self.key_env))?;
        Ok(Account::Offline(key, self.chain_id))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let settings = Settings::resolve(&args, config);

    if let Command::TopicHash { signature } = &args.command {
        println!("{:?}", topic_hash(signature));
        return Ok(());
    }

    debug!(node_url = %settings.node_url, "connecting");
    let web3 = Web3::new(
        Http::new(&settings.node_url)
            .with_context(|| format!("invalid node url {}", settings.node_url))?,
    );

    match args.command {
        Command::TopicHash { .. } => unreachable!("handled without a node"),
        Command::IsContract { address } => {
            println!("{}", node::is_contract(&web3, address).await?);
        }
        Command::Status { tx } => {
            println!("{:?}", node::transaction_status(&web3, tx).await?);
        }
        Command::Sender { tx } => {
            println!("{:?}", node::transaction_sender(&web3, tx).await?);
        }
        Command::Logs {
            address,
            topic,
            from,
            to,
        } => {
            let mut filter = LogFilterBuilder::new(web3).address(address);
            if let Some(from) = from {
                filter = filter.from_block(from.into());
            }
            if let Some(to) = to {
                filter = filter.to_block(to.into());
            }
            match topic.len() {
                0 => {}
                1 => filter = filter.topic0(Topic::This(topic[0])),
                _ => filter = filter.topic0(Topic::OneOf(topic)),
            }

            let range = filter.block_range();
            for log in filter.past_logs().await? {
                if range.contains(&log) {
                    println!("{}", serde_json::to_string(&log)?);
                }
            }
        }
        Command::Balance => {
            println!("{}", settings.union_pay(web3)?.get_balance().await?);
        }
        Command::Owner => {
            println!("{:?}", settings.union_pay(web3)?.owner().await?);
        }
        Command::Platform => {
            println!("{:?}", settings.union_pay(web3)?.platform().await?);
        }
        Command::Watch => watch(&settings, web3).await?,
        Command::Deploy => {
            let account = settings.account()?;
            info!(deployer = ?account.address(), "deploying UnionPay");
            let (address, tx, _) = UnionPay::builder(web3, settings.descriptor()?)?
                .from(account)
                .deploy()
                .await?;
            println!("{:?} {:?}", address, tx.hash());
        }
    }

    Ok(())
}

async fn watch(settings: &Settings, web3: Web3<Http>) -> Result<()> {
    let contract = settings.union_pay(web3)?;
    let mut events = contract.user_pay()?;
    if let Some(poll_interval) = settings.poll_interval {
        events = events.poll_interval(poll_interval);
    }

    let (sink, mut payments) = mpsc::channel(64);
    let subscription = events.watch(sink)?;
    info!(contract = ?contract.address(), "watching UserPay events");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            payment = payments.recv() => match payment {
                Some(payment) => print_payment(&payment),
                None => {
                    // the watcher ended on its own, report why
                    subscription.closed().await?;
                    bail!("event watcher stopped");
                }
            },
        }
    }

    subscription.unsubscribe().await?;
    Ok(())
}

fn print_payment(event: &StreamEvent<UserPay>) {
    let payment = event.inner_data();
    let status = if event.is_removed() { "removed" } else { "added" };
    let block = event.meta.as_ref().map(|meta| meta.block_number);
    println!(
        "{} block={:?} from={:?} to={:?} amount={} amount_indeed={} trans_id={}",
        status,
        block,
        payment.from,
        payment.to,
        payment.amount,
        payment.amount_indeed,
        payment.trans_id,
    );
}

fn parse_address(s: &str) -> Result<Address> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
    if bytes.len() != 20 {
        bail!("expected 20 bytes, got {}", bytes.len());
    }
    Ok(Address::from_slice(&bytes))
}

fn parse_hash(s: &str) -> Result<H256> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
    if bytes.len() != 32 {
        bail!("expected 32 bytes, got {}", bytes.len());
    }
    Ok(H256::from_slice(&bytes))
}
