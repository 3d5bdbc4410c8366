//! Command-line interface definitions for the zksession tool
//!
//! Clap structures for argument parsing. Network settings can come from
//! flags, environment variables (a `.env` file is loaded first) or the TOML
//! file given with `--config`, in that order of precedence.

use alloy_primitives::{Address, Bytes};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use zksession_core::FieldElement;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum InputFormat {
    /// `Prover.toml` as read by `nargo`
    #[default]
    #[value(name = "toml")]
    Toml,
    #[value(name = "json")]
    Json,
}

#[derive(Parser)]
#[command(name = "zksession")]
#[command(about = "Zero-knowledge session keys for ERC-4337 accounts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file with `[chain]` and `[noir]` tables
    #[arg(long, global = true, env = "ZKSESSION_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Endpoint overrides shared by the commands that talk to the network
#[derive(Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    /// Node JSON-RPC endpoint
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Bundler JSON-RPC endpoint
    #[arg(long, env = "BUNDLER_URL")]
    pub bundler_url: Option<String>,

    /// Paymaster JSON-RPC endpoint
    #[arg(long, env = "PAYMASTER_URL")]
    pub paymaster_url: Option<String>,

    /// Derive bundler and paymaster URLs from a Pimlico API key
    #[arg(long, env = "PIMLICO_API_KEY", hide_env_values = true)]
    pub pimlico_api_key: Option<String>,

    /// Pay for gas from the account instead of using a paymaster
    #[arg(long)]
    pub no_paymaster: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the root of an allow-list built from the given addresses
    AllowlistRoot {
        /// Addresses in insertion order
        #[arg(value_name = "ADDRESS", value_delimiter = ',')]
        addresses: Vec<Address>,

        /// Tree depth
        #[arg(long, default_value_t = zksession_core::DEFAULT_ALLOWLIST_DEPTH)]
        depth: usize,

        /// Also print the membership witness of this address
        #[arg(long)]
        witness_for: Option<Address>,
    },

    /// Print the session claims and their root
    ClaimsRoot {
        /// Smart account address
        #[arg(long)]
        account: Address,

        /// Session key address
        #[arg(long)]
        session_key: Address,

        /// Allow-list A: contracts the session may call
        #[arg(long, value_delimiter = ',')]
        contracts: Vec<Address>,

        /// Allow-list B: addresses the session may send value to
        #[arg(long, value_delimiter = ',')]
        recipients: Vec<Address>,
    },

    /// Export circuit inputs for a transaction under a stored session
    BuildInputs {
        /// Session material written by `open-session`
        #[arg(short, long)]
        session: PathBuf,

        /// Destination of the call
        #[arg(long)]
        to: Address,

        /// Value in ether (e.g. `0.001`)
        #[arg(long, default_value = "0")]
        value: String,

        /// Call data
        #[arg(long, default_value = "0x")]
        data: Bytes,

        /// Operation challenge (field element, hex)
        #[arg(long, default_value = "0x0")]
        challenge: FieldElement,

        #[arg(long, default_value = "toml", value_enum)]
        format: InputFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Deploy a new account and register a session key on it
    OpenSession {
        /// Allow-list A: contracts the session may call
        #[arg(long, value_delimiter = ',')]
        contracts: Vec<Address>,

        /// Allow-list B: addresses the session may send value to
        #[arg(long, value_delimiter = ',')]
        recipients: Vec<Address>,

        /// Where to write the session material
        #[arg(short, long, default_value = "session.json")]
        output: PathBuf,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Send a transaction authorized by a session proof
    Send {
        /// Session material written by `open-session`
        #[arg(short, long)]
        session: PathBuf,

        /// Destination of the call
        #[arg(long)]
        to: Address,

        /// Value in ether (e.g. `0.001`)
        #[arg(long, default_value = "0")]
        value: String,

        /// Call data
        #[arg(long, default_value = "0x")]
        data: Bytes,

        /// Noir circuit package directory
        #[arg(long, env = "ZKSESSION_CIRCUIT_DIR")]
        circuit_dir: Option<PathBuf>,

        #[command(flatten)]
        network: NetworkArgs,
    },
}
