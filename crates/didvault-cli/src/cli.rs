use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "didvault",
    about = "Encrypted keyring storage for decentralized identities",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Check the data key and the keyring store without writing anything.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Store and read keyring records.
    #[command(subcommand)]
    Keyring(KeyringCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum KeyringCommand {
    /// Encrypt and store a keyring record read from a JSON file (`-` for stdin).
    Add {
        #[arg(long, short)]
        file: PathBuf,
    },
    /// Print the decrypted record for a DID.
    Show { did: String },
    /// Replace the record stored under an id.
    Update {
        id: String,
        #[arg(long, short)]
        file: PathBuf,
    },
    /// Delete a record (not supported by the keyring store).
    Delete { id: String },
}
