//! Owns the TCP acceptor and the event queue, and drives the single
//! logical dispatch loop that processes events one at a time.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::codec::{GameSubType, MainType};
use crate::config::Config;
use crate::connection;
use crate::event::Event;
use crate::handlers::{self, Context};
use crate::player::PlayerIdGenerator;
use crate::registry::Registry;
use crate::state::GameState;

pub struct Reactor {
    config: Config,
    state: GameState,
    registry: Registry,
    players: PlayerIdGenerator,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Reactor {
    pub fn new(config: Config) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Reactor {
            config,
            state: GameState::new(),
            registry: Registry::new(),
            players: PlayerIdGenerator::new(),
            tx,
            rx,
        }
    }

    /// A sender any caller (tests included) can use to push events onto this
    /// reactor's queue, same as an accepted connection would.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Bind the configured port and run the accept loop and the dispatch
    /// loop concurrently. Returns once the dispatch loop's queue is closed
    /// (every sender, including the acceptor's, has been dropped).
    pub async fn run(self) -> std::io::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Bind the configured listen port. Split out from [`Self::run`] so
    /// tests can bind an ephemeral port (`Config.port == 0`) and read back
    /// whatever the OS actually assigned before handing the listener to
    /// [`Self::serve`].
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.config.port).into();
        let listener = TcpListener::bind(addr).await?;
        info!(local_addr = ?listener.local_addr()?, "listening");
        Ok(listener)
    }

    /// Run the accept loop and the dispatch loop concurrently against an
    /// already-bound listener.
    pub async fn serve(mut self, listener: TcpListener) -> std::io::Result<()> {
        let accept_tx = self.tx.clone();
        let accept = tokio::spawn(accept_loop(listener, accept_tx));

        // Optional queue-timeout fallback: periodically retry room formation
        // with whoever is waiting, even below batch size. `pop_waiting`
        // already caps at however many are present, so the ROOM_CREATE
        // handler's own "empty queue is a no-op" check is all that is
        // needed to make this safe to fire on a schedule.
        if let Some(timeout) = self.config.queue_timeout {
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(timeout);
                ticker.tick().await; // interval's first tick fires immediately
                loop {
                    ticker.tick().await;
                    let _ = tx.send(Event::new(MainType::Game, GameSubType::RoomCreate as u16));
                }
            });
        }

        self.drain().await;
        accept.abort();
        Ok(())
    }

    /// The single logical dispatch loop: pop the next event and run it to
    /// completion before looking at the next one. This total ordering is
    /// what lets every broadcast observe a consistent room snapshot.
    pub async fn drain(&mut self) {
        while let Some(event) = self.rx.recv().await {
            let mut ctx = Context {
                state: &mut self.state,
                registry: &mut self.registry,
                players: &self.players,
                config: &self.config,
                reactor_tx: &self.tx,
            };

            match event.main_type {
                MainType::Network => handlers::net::handle(&mut ctx, event).await,
                MainType::Game => handlers::game::handle(&mut ctx, event).await,
                MainType::Error => {
                    error!(sub = event.sub_type, "unexpected inbound ERROR event, dropping");
                }
            }
        }
    }
}

async fn accept_loop(listener: TcpListener, tx: mpsc::UnboundedSender<Event>) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                connection::spawn(socket, peer, tx.clone());
            }
            Err(err) => {
                error!(%err, "accept failed");
            }
        }
    }
}
