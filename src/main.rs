use clap::Parser;
use tracing::info;

use maze_race_server::config::{Args, Config};
use maze_race_server::reactor::Reactor;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::from(args);
    info!(port = config.port, room_batch_size = config.room_batch_size, "starting maze-race-server");

    Reactor::new(config).run().await
}
