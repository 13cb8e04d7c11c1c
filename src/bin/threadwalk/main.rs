use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod util;
mod cmd_serve;
mod cmd_post;
mod cmd_page;
mod cmd_status;
mod cmd_seed;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — info.
    // Пример: RUST_LOG=ThreadWalk=trace threadwalk page --mode dfs ...
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Serve { path, addr, workers } =>
            cmd_serve::exec(path, addr, workers),

        cli::Cmd::Post { path, comment, parent } =>
            cmd_post::exec(path, comment, parent),

        cli::Cmd::Page { path, mode, cursor, limit, json } =>
            cmd_page::exec(path, mode, cursor, limit, json),

        cli::Cmd::Status { path, json } =>
            cmd_status::exec(path, json),

        cli::Cmd::Seed { path, roots, fanout, depth, seed } =>
            cmd_seed::exec(path, roots, fanout, depth, seed),
    }
}
