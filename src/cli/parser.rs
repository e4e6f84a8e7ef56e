use clap::{Parser, Subcommand, ValueEnum};

use crate::core::models::TrashKind;

pub const DEFAULT_VAULT_PATH: &str = "cofre.db";

#[derive(Debug, Parser)]
#[command(name = "cofre", version, about = "Local encrypted credential vault")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the vault database file.
    #[arg(long, env = "COFRE_VAULT", default_value = DEFAULT_VAULT_PATH, global = true)]
    pub vault: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new vault with a master password.
    Init,
    /// Report whether a vault exists at the configured path.
    Status,
    /// List active secrets.
    List,
    /// Add a secret, optionally with file attachments.
    Add {
        #[arg(long = "attach", value_name = "FILE")]
        attach: Vec<String>,
    },
    /// Edit an existing secret.
    Edit {
        id: i64,
        #[arg(long = "attach", value_name = "FILE")]
        attach: Vec<String>,
    },
    /// Show a secret, with reveal and clipboard options.
    Show { id: i64 },
    /// Move a secret to the trash.
    Rm { id: i64 },
    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },
    /// Inspect and manage trashed records.
    Trash {
        #[command(subcommand)]
        action: TrashCommands,
    },
    /// Attach files to an existing secret.
    Attach {
        secret_id: i64,
        #[arg(required = true, value_name = "FILE")]
        files: Vec<String>,
    },
    /// List a secret's attachments.
    Attachments { secret_id: i64 },
    /// Export the vault to an encrypted backup file.
    Export { path: String },
    /// Import records from an encrypted backup file.
    Import { path: String },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    Add,
    List,
    Edit { id: i64 },
    Rm { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum TrashCommands {
    List,
    Restore { kind: KindArg, id: i64 },
    Purge { kind: KindArg, id: i64 },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Secret,
    Project,
}

impl From<KindArg> for TrashKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Secret => TrashKind::Secret,
            KindArg::Project => TrashKind::Project,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, KindArg, TrashCommands};
    use clap::Parser;

    #[test]
    fn parses_add_with_attachments() {
        let cli = Cli::try_parse_from(["cofre", "add", "--attach", "id_rsa", "--attach", "cert.pem"])
            .expect("command should parse");

        let Commands::Add { attach } = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(attach, vec!["id_rsa".to_owned(), "cert.pem".to_owned()]);
    }

    #[test]
    fn parses_trash_restore_kind() {
        let cli = Cli::try_parse_from(["cofre", "trash", "restore", "project", "7"])
            .expect("command should parse");

        let Commands::Trash { action } = cli.command else {
            panic!("expected trash command");
        };
        let TrashCommands::Restore { kind, id } = action else {
            panic!("expected restore action");
        };
        assert_eq!(kind, KindArg::Project);
        assert_eq!(id, 7);
    }

    #[test]
    fn vault_path_defaults_and_overrides() {
        let cli = Cli::try_parse_from(["cofre", "status"]).expect("command should parse");
        assert_eq!(cli.vault, "cofre.db");

        let cli = Cli::try_parse_from(["cofre", "status", "--vault", "/tmp/work.db"])
            .expect("command should parse");
        assert_eq!(cli.vault, "/tmp/work.db");
    }
}
