use std::{fs, path::Path, sync::Arc, time::Duration};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::ExposeSecret;
use zeroize::Zeroize;

use crate::{
    attach::stage::AttachmentStage,
    cli::{
        display::{
            self, clear_screen, error as error_msg, is_insecure_terminal, print_header, secure,
            success, system, warning,
        },
        parser::{Cli, Commands, ProjectCommands, TrashCommands},
        prompts,
    },
    core::{
        errors::{CofreError, CofreResult},
        models::{ProjectDraft, SecretDraft},
        validate,
    },
    gateway::sqlite::SqliteGateway,
    sync::session::VaultSession,
};

fn map_user_error(err: &CofreError) -> String {
    match err {
        CofreError::Validation(message) => format!("Invalid input: {message}."),
        CofreError::Locked => "Vault is locked. Unlock failed or was skipped.".to_owned(),
        CofreError::VaultExists => "A vault already exists at this path.".to_owned(),
        CofreError::VaultMissing => "No vault found. Run init first.".to_owned(),
        CofreError::InvalidCredentials => "Invalid master password.".to_owned(),
        CofreError::NotFound => "Record not found.".to_owned(),
        CofreError::Remote(message) => format!("Vault backend error: {message}."),
        CofreError::Flush {
            uploaded,
            remaining,
        } => format!(
            "Attachment upload stopped: {uploaded} saved, {remaining} still staged. \
             Edit the secret to retry."
        ),
        CofreError::Config(message) if message == "operation cancelled" => {
            "Operation cancelled.".to_owned()
        }
        CofreError::Config(_) => "Invalid configuration or input.".to_owned(),
        CofreError::Crypto => "Security operation failed.".to_owned(),
        CofreError::Serialization => "Data format error.".to_owned(),
        CofreError::Storage => "Storage operation failed.".to_owned(),
    }
}

async fn open_session(cli: &Cli) -> CofreResult<VaultSession> {
    let gateway = SqliteGateway::connect(&format!("sqlite://{}", cli.vault)).await?;
    Ok(VaultSession::new(Arc::new(gateway)))
}

async fn unlock(session: &VaultSession) -> CofreResult<()> {
    if !session.status().await? {
        return Err(CofreError::VaultMissing);
    }
    secure("Enter master password:");
    let password = prompts::secure_password_prompt("Master password: ")?;
    session.unlock(password).await
}

pub async fn run() -> CofreResult<()> {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Init => run_init(&cli).await,
        Commands::Status => run_status(&cli).await,
        Commands::List => run_list(&cli).await,
        Commands::Add { attach } => run_add(&cli, attach).await,
        Commands::Edit { id, attach } => run_edit(&cli, *id, attach).await,
        Commands::Show { id } => run_show(&cli, *id).await,
        Commands::Rm { id } => run_rm(&cli, *id).await,
        Commands::Project { action } => run_project(&cli, action).await,
        Commands::Trash { action } => run_trash(&cli, action).await,
        Commands::Attach { secret_id, files } => run_attach(&cli, *secret_id, files).await,
        Commands::Attachments { secret_id } => run_attachments(&cli, *secret_id).await,
        Commands::Export { path } => run_export(&cli, path).await,
        Commands::Import { path } => run_import(&cli, path).await,
    };

    if let Err(err) = &result {
        error_msg(&map_user_error(err));
    }

    result
}

async fn run_init(cli: &Cli) -> CofreResult<()> {
    print_header("Cofre Vault Initialization");
    let session = open_session(cli).await?;
    if session.status().await? {
        return Err(CofreError::VaultExists);
    }

    secure("Create master password:");
    let password = prompts::secure_password_with_confirmation(
        "Master password: ",
        "Confirm master password: ",
    )?;
    validate::master_password(password.expose_secret())?;

    warning("This password cannot be recovered.");
    let proceed = prompts::confirmation_prompt("Proceed?", false)?;
    if !proceed {
        return Err(CofreError::Config("operation cancelled".to_owned()));
    }

    session.setup(password).await?;
    success("Vault initialized successfully.");
    system(&format!("Path: {}", cli.vault));
    Ok(())
}

async fn run_status(cli: &Cli) -> CofreResult<()> {
    print_header("Vault Status");
    let session = open_session(cli).await?;
    if session.status().await? {
        success(&format!("Vault ready at {}.", cli.vault));
    } else {
        warning(&format!("No vault at {}. Run init first.", cli.vault));
    }
    Ok(())
}

async fn run_list(cli: &Cli) -> CofreResult<()> {
    print_header("Active Secrets");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    let secrets = session.active_secrets().await?;
    if secrets.is_empty() {
        system("Vault is empty.");
        return Ok(());
    }
    system(&format!(
        "{:>6}  {:<24}  {:<20}  {}",
        "ID", "Title", "Username", "Project"
    ));
    for secret in &secrets {
        system(&display::secret_row(secret));
    }
    session.lock().await
}

fn secret_draft_from_prompts(initial: Option<&SecretDraft>) -> CofreResult<SecretDraft> {
    let title = match initial {
        Some(draft) => prompts::input_with_initial("Title", &draft.title)?,
        None => prompts::input("Title")?,
    };
    let username = prompts::optional_input("Username/Email")?;
    let password = prompts::secure_password_prompt("Password: ")?;
    let project_id = prompts::optional_input("Project ID")?
        .map(|raw| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| CofreError::Validation("project id must be numeric".to_owned()))
        })
        .transpose()?;

    Ok(SecretDraft {
        title,
        username,
        password: password.expose_secret().to_owned(),
        project_id,
    })
}

fn stage_files(stage: &AttachmentStage, paths: &[String]) -> CofreResult<()> {
    for path in paths {
        let content = fs::read(path).map_err(|_| {
            CofreError::Validation(format!("unable to read attachment file {path}"))
        })?;
        let filename = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();
        stage.stage(filename, mime_type, content);
    }
    Ok(())
}

fn save_spinner(message: &str) -> CofreResult<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .map_err(|_| CofreError::Config("invalid progress style".to_owned()))?,
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(80));
    Ok(spinner)
}

async fn run_add(cli: &Cli, attach: &[String]) -> CofreResult<()> {
    print_header("Add Secret");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    let draft = secret_draft_from_prompts(None)?;
    let stage = AttachmentStage::new();
    stage_files(&stage, attach)?;

    let spinner = save_spinner("Saving secret...")?;
    let result = session.create_secret(draft, &stage).await;
    spinner.finish_and_clear();
    let created = result?;

    session.lock().await?;
    success("Secret stored securely.");
    system(&format!("ID: {}", created.id));
    if !attach.is_empty() {
        system(&format!("Attachments uploaded: {}", attach.len()));
    }
    Ok(())
}

async fn run_edit(cli: &Cli, id: i64, attach: &[String]) -> CofreResult<()> {
    print_header("Edit Secret");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    let current = session
        .active_secrets()
        .await?
        .into_iter()
        .find(|secret| secret.id == id)
        .ok_or(CofreError::NotFound)?;
    let initial = SecretDraft {
        title: current.title,
        username: current.username,
        password: String::new(),
        project_id: current.project_id,
    };

    let draft = secret_draft_from_prompts(Some(&initial))?;
    let stage = AttachmentStage::new();
    stage_files(&stage, attach)?;

    let spinner = save_spinner("Saving changes...")?;
    let result = session.update_secret(id, draft, &stage).await;
    spinner.finish_and_clear();
    result?;

    session.lock().await?;
    success("Secret updated.");
    Ok(())
}

async fn run_show(cli: &Cli, id: i64) -> CofreResult<()> {
    print_header("Secret Details");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    let secret = session
        .active_secrets()
        .await?
        .into_iter()
        .find(|secret| secret.id == id)
        .ok_or(CofreError::NotFound)?;
    let attachments = session.attachments(id).await?;

    let mut password = secret.password.clone();
    system(&format!("Title: {}", secret.title));
    system(&format!(
        "Username: {}",
        secret.username.as_deref().unwrap_or("-")
    ));
    system("Password: ********");
    if !attachments.is_empty() {
        system(&format!("Attachments: {}", attachments.len()));
    }

    if is_insecure_terminal() {
        warning("Sensitive actions are blocked on insecure terminal output.");
        password.zeroize();
        session.lock().await?;
        return Ok(());
    }

    let choice = prompts::select("Options", &["Reveal password", "Copy to clipboard", "Exit"])?;

    match choice {
        0 => {
            system(&format!("Password: {}", password));
            warning("Password will clear in 10 seconds.");
            tokio::time::sleep(Duration::from_secs(10)).await;
            clear_screen();
            system("Password view cleared.");
        }
        1 => {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|_| CofreError::Config("clipboard unavailable".to_owned()))?;
            clipboard
                .set_text(password.clone())
                .map_err(|_| CofreError::Config("clipboard write failed".to_owned()))?;
            success("Password copied. Clearing clipboard in 15 seconds.");
            tokio::time::sleep(Duration::from_secs(15)).await;
            let _ = clipboard.set_text(String::new());
            system("Clipboard cleared.");
        }
        _ => {}
    }

    password.zeroize();
    session.lock().await
}

async fn run_rm(cli: &Cli, id: i64) -> CofreResult<()> {
    print_header("Move Secret to Trash");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    session.soft_delete_secret(id).await?;
    session.lock().await?;
    success("Secret moved to trash. Restore it from trash if needed.");
    Ok(())
}

async fn run_project(cli: &Cli, action: &ProjectCommands) -> CofreResult<()> {
    let session = open_session(cli).await?;

    match action {
        ProjectCommands::Add => {
            print_header("Add Project");
            unlock(&session).await?;
            let name = prompts::input("Name")?;
            let description = prompts::optional_input("Description")?;
            let created = session
                .create_project(ProjectDraft { name, description })
                .await?;
            session.lock().await?;
            success("Project created.");
            system(&format!("ID: {}", created.id));
        }
        ProjectCommands::List => {
            print_header("Projects");
            unlock(&session).await?;
            let projects = session.active_projects().await?;
            if projects.is_empty() {
                system("No projects yet.");
            }
            for project in projects.iter() {
                let description = project.description.as_deref().unwrap_or("-");
                system(&format!("{:>6}  {:<24}  {}", project.id, project.name, description));
            }
            session.lock().await?;
        }
        ProjectCommands::Edit { id } => {
            print_header("Edit Project");
            unlock(&session).await?;
            let name = prompts::input("Name")?;
            let description = prompts::optional_input("Description")?;
            session
                .update_project(*id, ProjectDraft { name, description })
                .await?;
            session.lock().await?;
            success("Project updated.");
        }
        ProjectCommands::Rm { id } => {
            print_header("Move Project to Trash");
            unlock(&session).await?;
            session.soft_delete_project(*id).await?;
            session.lock().await?;
            success("Project moved to trash. Its secrets stay active, unassigned.");
        }
    }
    Ok(())
}

async fn run_trash(cli: &Cli, action: &TrashCommands) -> CofreResult<()> {
    let session = open_session(cli).await?;
    let trash = session.trash();

    match action {
        TrashCommands::List => {
            print_header("Trash");
            unlock(&session).await?;
            let items = trash.items().await?;
            if items.is_empty() {
                system("Trash is empty.");
            } else {
                system(&format!(
                    "{:>6}  {:<8}  {:<24}  {}",
                    "ID", "Kind", "Label", "Deleted"
                ));
                for item in &items {
                    system(&display::trash_row(item));
                }
            }
            session.lock().await?;
        }
        TrashCommands::Restore { kind, id } => {
            print_header("Restore from Trash");
            unlock(&session).await?;
            trash.restore((*kind).into(), *id).await?;
            session.lock().await?;
            success("Record restored.");
        }
        TrashCommands::Purge { kind, id } => {
            print_header("Purge from Trash");
            unlock(&session).await?;
            warning("Purging is permanent and removes attachments.");
            let proceed = prompts::confirmation_prompt("Purge this record?", false)?;
            if !proceed {
                return Err(CofreError::Config("operation cancelled".to_owned()));
            }
            trash.purge((*kind).into(), *id).await?;
            session.lock().await?;
            success("Record purged permanently.");
        }
        TrashCommands::Empty => {
            print_header("Empty Trash");
            unlock(&session).await?;
            warning("Every trashed record will be purged permanently.");
            let proceed = prompts::confirmation_prompt("Empty the trash?", false)?;
            if !proceed {
                return Err(CofreError::Config("operation cancelled".to_owned()));
            }
            trash.empty().await?;
            session.lock().await?;
            success("Trash emptied.");
        }
    }
    Ok(())
}

async fn run_attach(cli: &Cli, secret_id: i64, files: &[String]) -> CofreResult<()> {
    print_header("Attach Files");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    let stage = AttachmentStage::new();
    stage_files(&stage, files)?;

    let spinner = save_spinner("Uploading attachments...")?;
    let result = session.add_attachments(secret_id, &stage).await;
    spinner.finish_and_clear();
    let uploaded = result?;

    session.lock().await?;
    success(&format!("Attachments uploaded: {uploaded}"));
    Ok(())
}

async fn run_attachments(cli: &Cli, secret_id: i64) -> CofreResult<()> {
    print_header("Attachments");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    let attachments = session.attachments(secret_id).await?;
    if attachments.is_empty() {
        system("No attachments for this secret.");
    } else {
        system(&format!(
            "{:>6}  {:<28}  {:<20}  {}",
            "ID", "Filename", "Type", "Size"
        ));
        for meta in attachments.iter() {
            system(&format!(
                "{:>6}  {:<28}  {:<20}  {}",
                meta.id,
                meta.filename,
                meta.mime_type,
                display::format_size(meta.file_size)
            ));
        }
    }
    session.lock().await
}

async fn run_export(cli: &Cli, path: &str) -> CofreResult<()> {
    print_header("Encrypted Backup Export");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    secure("Choose a backup password:");
    let password = prompts::secure_password_with_confirmation(
        "Backup password: ",
        "Confirm backup password: ",
    )?;
    session.export_vault(path, password).await?;
    session.lock().await?;

    success("Encrypted backup exported.");
    system(&format!("Path: {path}"));
    Ok(())
}

async fn run_import(cli: &Cli, path: &str) -> CofreResult<()> {
    print_header("Encrypted Backup Import");
    let session = open_session(cli).await?;
    unlock(&session).await?;

    secure("Enter the backup password:");
    let password = prompts::secure_password_prompt("Backup password: ")?;
    let summary = session.import_vault(path, password).await?;
    session.lock().await?;

    success("Encrypted backup imported.");
    system(&summary);
    Ok(())
}
