use clap::{Parser, Subcommand};
use std::path::PathBuf;

use filmix::types::{DEFAULT_NAME_SELECTOR, DEFAULT_QUALITY_SELECTOR};

/// Track films and scrape their quality and rating status
#[derive(Parser)]
#[command(name = "filmix", version)]
#[command(about = "Create a film list and check source pages for quality and rating updates", long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the config file and the film list
    Init {
        /// Film list location (defaults to the user data directory)
        #[arg(long = "db-path", short = 'd', value_name = "PATH")]
        db_path: Option<PathBuf>,
        /// Reset an existing film list to empty
        #[arg(short, long)]
        force: bool,
    },
    /// Add a film url
    Add {
        url: String,
        /// Selector for the film name
        #[arg(long, short = 'n', default_value = DEFAULT_NAME_SELECTOR)]
        name_selector: String,
        /// Selector for the quality tag
        #[arg(long, short = 'q', default_value = DEFAULT_QUALITY_SELECTOR)]
        quality_selector: String,
    },
    /// List all films
    List {
        /// Refresh films not checked today before listing
        #[arg(short, long)]
        fetch: bool,
        /// Print every stored field
        #[arg(short, long)]
        verbose: bool,
        /// Log request identities and responses
        #[arg(long)]
        debug: bool,
    },
    /// Refresh films not checked today
    Fetch {
        /// Log request identities and responses
        #[arg(long)]
        debug: bool,
    },
    /// Edit one or more films
    Change {
        #[arg(required = true)]
        ids: Vec<usize>,
        #[arg(long, short = 'u')]
        url: Option<String>,
        #[arg(long, short = 'n')]
        name: Option<String>,
        #[arg(long, short = 'N')]
        name_selector: Option<String>,
        #[arg(long, short = 'q')]
        quality_selector: Option<String>,
    },
    /// Remove a film by id
    Remove {
        id: usize,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Remove all films
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Open a film page in the default browser
    Open { id: usize },
}

impl Commands {
    pub fn debug(&self) -> bool {
        matches!(self, Commands::List { debug: true, .. } | Commands::Fetch { debug: true })
    }
}
