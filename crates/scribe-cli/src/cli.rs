use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use scribe_core::queries::{SortKey, ViewMode};
use scribe_core::Priority;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Notes from the command line, synced to a Scribe backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the authenticated session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List notes with filters and sorting
    List {
        /// Show archived notes instead of active ones
        #[arg(long)]
        archived: bool,
        /// Free-text search over title, content, and tags
        #[arg(short, long)]
        search: Option<String>,
        /// Filter by exact category
        #[arg(long)]
        category: Option<String>,
        /// Filter by priority
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        /// Filter by tag membership
        #[arg(long)]
        tag: Option<String>,
        /// Sort order (defaults to the stored preference)
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        #[arg(long)]
        title: String,
        /// Note content (opens $EDITOR when omitted)
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long)]
        mood: Option<String>,
        /// May be given multiple times
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Edit an existing note
    Edit {
        /// Note id or unique id prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long)]
        mood: Option<String>,
        /// Replaces the tag list when given
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        color: Option<String>,
        /// Open the content in $EDITOR
        #[arg(long)]
        editor: bool,
    },
    /// Delete a note (undoable via `scribe undo`)
    Delete {
        /// Note id or unique id prefix
        id: String,
    },
    /// Recreate the last deleted note under a new id
    Undo,
    /// Archive a note (or restore it with --restore)
    Archive {
        /// Note id or unique id prefix
        id: String,
        #[arg(long)]
        restore: bool,
    },
    /// Pin a note (or unpin it with --unpin)
    Pin {
        /// Note id or unique id prefix
        id: String,
        #[arg(long)]
        unpin: bool,
    },
    /// Collection statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every tag in use
    Tags,
    /// Show recent search queries
    Searches,
    /// Show or change persisted view preferences
    Config {
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        #[arg(long, value_enum)]
        view: Option<ViewArg>,
        #[arg(long)]
        show_archived: Option<bool>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email/password
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Keep the session for auto-login
        #[arg(long)]
        remember: bool,
    },
    /// Create an account and sign in
    Register {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        #[arg(long, value_name = "PASSWORD")]
        confirm_password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Keep the session for auto-login
        #[arg(long)]
        remember: bool,
    },
    /// Show stored credential and session state
    Status,
    /// Sign out and clear stored credentials
    Logout,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::High => Self::High,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::Low => Self::Low,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortArg {
    Created,
    Title,
    Priority,
    Updated,
    Category,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Created => Self::CreatedAt,
            SortArg::Title => Self::Title,
            SortArg::Priority => Self::Priority,
            SortArg::Updated => Self::UpdatedAt,
            SortArg::Category => Self::Category,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ViewArg {
    Grid,
    List,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Grid => Self::Grid,
            ViewArg::List => Self::List,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
