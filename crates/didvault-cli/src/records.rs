use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use color_eyre::{
    eyre::{bail, WrapErr},
    Result,
};
use didvault_core::keyring::{Identified, KeyringError, KeyringRecord, KeyringRepository};

use crate::{cli::KeyringCommand, config::Config, storage};

/// Execute a keyring subcommand against the configured encrypted store.
pub async fn handle(cmd: KeyringCommand, config: &Config) -> Result<()> {
    let repo = storage::repo_from_config(config).await?;
    let output = execute(cmd, &repo).await?;
    println!("{output}");
    Ok(())
}

/// Run `cmd` and return what should be printed.
pub async fn execute<R: KeyringRepository>(cmd: KeyringCommand, repo: &R) -> Result<String> {
    match cmd {
        KeyringCommand::Add { file } => {
            let created = repo.insert(read_record(&file)?).await?;
            render(&created)
        }
        KeyringCommand::Show { did } => match repo.find_by_did(&did).await? {
            Some(found) => render(&found),
            None => Ok(format!("No keyring record for `{did}`.")),
        },
        KeyringCommand::Update { id, file } => {
            let updated = repo.update(&id, read_record(&file)?).await?;
            render(&updated)
        }
        KeyringCommand::Delete { id } => match repo.delete_by_id(&id).await {
            Ok(()) => Ok(format!("Deleted {id}")),
            Err(KeyringError::NotImplemented { operation }) => {
                bail!("{operation} is not supported by the keyring store")
            }
            Err(err) => Err(err.into()),
        },
    }
}

/// Read a JSON keyring record from `path`, or stdin when `path` is `-`.
fn read_record(path: &Path) -> Result<KeyringRecord> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("failed to read record from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&contents).wrap_err("record is not a valid keyring JSON document")
}

fn render(record: &Identified<KeyringRecord>) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}
