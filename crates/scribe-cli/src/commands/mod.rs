//! Command dispatch.

use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::aot::Generator;
use clap_complete::{generate, shells};

use crate::cli::{AuthCommands, Cli, Commands, CompletionShell};
use crate::error::CliError;

pub mod auth_cmd;
pub mod common;
pub mod insights;
pub mod notes;

use common::AppContext;

pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    // Completions need no backend or storage.
    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let context = AppContext::build()?;
    let is_auth_command = matches!(cli.command, Commands::Auth { .. });
    let result = match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Login {
                email,
                password,
                remember,
            } => auth_cmd::run_login(&context, &email, &password, remember).await,
            AuthCommands::Register {
                email,
                password,
                confirm_password,
                first_name,
                last_name,
                remember,
            } => {
                auth_cmd::run_register(
                    &context,
                    &email,
                    &password,
                    &confirm_password,
                    &first_name,
                    &last_name,
                    remember,
                )
                .await
            }
            AuthCommands::Status => auth_cmd::run_status(&context),
            AuthCommands::Logout => auth_cmd::run_logout(&context).await,
        },
        Commands::List {
            archived,
            search,
            category,
            priority,
            tag,
            sort,
            json,
        } => {
            notes::run_list(
                &context,
                notes::ListArgs {
                    archived,
                    search,
                    category,
                    priority,
                    tag,
                    sort,
                    json,
                },
            )
            .await
        }
        Commands::Add {
            title,
            content,
            category,
            priority,
            mood,
            tags,
            color,
        } => {
            notes::run_add(
                &context,
                notes::AddArgs {
                    title,
                    content,
                    category,
                    priority,
                    mood,
                    tags,
                    color,
                },
            )
            .await
        }
        Commands::Edit {
            id,
            title,
            content,
            category,
            priority,
            mood,
            tags,
            color,
            editor,
        } => {
            notes::run_edit(
                &context,
                notes::EditArgs {
                    id,
                    title,
                    content,
                    category,
                    priority,
                    mood,
                    tags,
                    color,
                    editor,
                },
            )
            .await
        }
        Commands::Delete { id } => notes::run_delete(&context, &id).await,
        Commands::Undo => notes::run_undo(&context).await,
        Commands::Archive { id, restore } => notes::run_archive(&context, &id, restore).await,
        Commands::Pin { id, unpin } => notes::run_pin(&context, &id, unpin).await,
        Commands::Stats { json } => insights::run_stats(&context, json).await,
        Commands::Tags => insights::run_tags(&context).await,
        Commands::Searches => insights::run_searches(&context),
        Commands::Config {
            sort,
            view,
            show_archived,
        } => insights::run_config(&context, sort, view, show_archived),
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    // A rejected token means the stored session is dead; clear it so the
    // next invocation starts clean. Auth commands report their own failures.
    if !is_auth_command {
        if let Err(CliError::Core(scribe_core::Error::Authentication(_))) = &result {
            if context.manager.handle_unauthorized().is_ok() {
                eprintln!("Your session is no longer valid. Run `scribe auth login` again.");
            }
        }
    }
    result
}

fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut command = Cli::command();
    let mut buffer = Vec::new();

    match shell {
        CompletionShell::Bash => generate_for_shell(shells::Bash, &mut command, &mut buffer),
        CompletionShell::Zsh => generate_for_shell(shells::Zsh, &mut command, &mut buffer),
        CompletionShell::Fish => generate_for_shell(shells::Fish, &mut command, &mut buffer),
    }

    if let Some(path) = output_path {
        std::fs::write(path, &buffer)?;
        println!("{}", path.display());
    } else {
        io::stdout().write_all(&buffer)?;
    }
    Ok(())
}

fn generate_for_shell<G: Generator>(
    generator: G,
    command: &mut clap::Command,
    buffer: &mut Vec<u8>,
) {
    generate(generator, command, "scribe", buffer);
}
