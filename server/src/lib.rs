//! # Guessing Game Server Library
//!
//! This library provides the server side of the two-player word guessing
//! game. It authenticates connections with a shared password, tells every
//! idle player who they can challenge, and referees rounds in which one
//! player picks a secret word and the other tries to guess it.
//!
//! ## Core Responsibilities
//!
//! ### Authentication
//! Every new connection is challenged for the password before anything else
//! happens. The answer is compared byte for byte; a wrong answer or no answer
//! within the timeout closes the connection without consuming a session id.
//!
//! ### Opponent Announcement
//! Each time a player joins, every player who is neither finished nor in a
//! round receives the full list of such players. Nothing is sent while fewer
//! than two players are available.
//!
//! ### Refereeing
//! The server keeps the secret word of every round. Guesses are checked
//! against it and the outcome goes to both players; hints from the chooser are
//! forwarded to the guesser only.
//!
//! ## Architecture Design
//!
//! ### Single-Actor Event Loop
//! All session and round state is owned by one loop. Per-connection reader
//! tasks forward frames over a channel, and the loop processes them one at a
//! time, so no locks are needed and frames from one peer are handled in the
//! order they were sent.
//!
//! ### Fixed-Size Frames
//! Every message is one fixed-size frame over TCP or a Unix domain socket;
//! see the `shared` crate for the layout.
//!
//! ## Module Organization
//!
//! ### Sessions Module (`sessions`)
//! - Password verification and sequential id assignment
//! - Ownership of each session's write half
//! - Finished tracking and capacity enforcement
//!
//! ### Rounds Module (`rounds`)
//! - Round storage with sequential ids
//! - Lookup of a player's active round
//!
//! ### Dispatcher Module (`dispatcher`)
//! - Protocol state machine turning frames into outgoing frames
//! - No I/O, so every rule is unit tested directly
//!
//! ### Network Module (`network`)
//! - Listener, reader tasks and the main loop
//! - Write timeouts and graceful shutdown
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//! use shared::Endpoint;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         endpoint: Endpoint::tcp("127.0.0.1", 8080),
//!         password: "secret".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     // Runs until Ctrl+C, then tells every player to exit
//!     let mut server = Server::bind(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dispatcher;
pub mod network;
pub mod rounds;
pub mod sessions;
