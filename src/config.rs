//! Runtime configuration for the server binary.
//!
//! Parsing argv is kept as an external collaborator: [`Config`] itself is
//! a plain value the core takes, and the `clap`-derived [`Args`] is what
//! the binary entry point uses to build one.

use std::time::Duration;

use clap::Parser;

use crate::room::RoomTemplate;

/// Default TCP listen port.
pub const DEFAULT_PORT: u16 = 12345;
/// Players required before a room is formed.
pub const DEFAULT_ROOM_BATCH_SIZE: usize = 5;
/// Starting value for the pre-game countdown.
pub const DEFAULT_COUNTDOWN_FROM: i32 = 5;

#[derive(Parser, Debug, Clone)]
#[command(name = "maze-race-server", about = "Multiplayer maze-race game server")]
pub struct Args {
    /// TCP port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of waiting players required to form a room.
    #[arg(long, default_value_t = DEFAULT_ROOM_BATCH_SIZE)]
    pub room_batch_size: usize,

    /// Seconds the pre-game countdown starts from.
    #[arg(long, default_value_t = DEFAULT_COUNTDOWN_FROM)]
    pub countdown_from: i32,

    /// Optional queue timeout in seconds: form a room with whoever is
    /// waiting once this many seconds pass, even below `room_batch_size`.
    /// Disabled (`None`) by default.
    #[arg(long)]
    pub queue_timeout_secs: Option<u64>,
}

/// The core's configuration surface. Built from [`Args`] by the binary
/// entry point, or directly by tests.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub room_batch_size: usize,
    pub countdown_from: i32,
    pub queue_timeout: Option<Duration>,
    pub room_template: RoomTemplate,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            room_batch_size: DEFAULT_ROOM_BATCH_SIZE,
            countdown_from: DEFAULT_COUNTDOWN_FROM,
            queue_timeout: None,
            room_template: RoomTemplate::default(),
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            port: args.port,
            room_batch_size: args.room_batch_size,
            countdown_from: args.countdown_from,
            queue_timeout: args.queue_timeout_secs.map(Duration::from_secs),
            room_template: RoomTemplate::default(),
        }
    }
}
