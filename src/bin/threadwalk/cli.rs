use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI для ThreadWalk: сервер, запись комментариев и постраничное чтение
#[derive(Parser, Debug)]
#[command(name = "threadwalk", version, about = "ThreadWalk comment forest CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// root, its direct replies, next root, ...
    Flat,
    /// roots with nested replies
    Tree,
    /// pre-order walk of the whole forest
    Dfs,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value = "0.0.0.0:8787")]
        addr: String,
        /// Worker threads (overrides TW_HTTP_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Append one comment (a reply if --parent is set)
    Post {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        comment: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Print one page in the given mode
    Page {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Flat)]
        mode: Mode,
        /// Token from a previous page's nextCursor
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long)]
        limit: Option<String>,
        /// Print the page as one JSON object
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Journal and metrics summary
    Status {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Fill the journal with a deterministic random forest
    Seed {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 10)]
        roots: u32,
        /// Max replies per node
        #[arg(long, default_value_t = 3)]
        fanout: u32,
        /// Max reply depth below a root
        #[arg(long, default_value_t = 3)]
        depth: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}
