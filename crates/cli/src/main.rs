use clap::Parser;
use config::Config;
use sentinelguard::{
    cli::{Cli, Command},
    commands::{self, QuarantineCommand},
};
use tracing::debug;
use tracing_log::AsTrace;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.log_level_filter().as_trace())
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    debug!(config = ?cli);

    let mut config = match &cli.conffile {
        Some(path) => Config::load(path)?,
        _ => Config::new(),
    };

    match cli.command {
        Command::Serve { socket } => {
            if let Some(socket) = socket {
                config.channel.socket_path = socket;
            }
            commands::serve(config).await?;
        }
        Command::Consume { socket, count } => {
            let path = socket.unwrap_or(config.channel.socket_path);
            commands::consume(path, count).await?;
        }
        Command::Suspend { pid } => commands::quarantine(&config, QuarantineCommand::Suspend, pid)?,
        Command::Resume { pid } => commands::quarantine(&config, QuarantineCommand::Resume, pid)?,
        Command::Kill { pid } => commands::quarantine(&config, QuarantineCommand::Kill, pid)?,
        Command::PrintConfig => commands::print_config(&config)?,
    }
    Ok(())
}
