//! # Guessing Game Client Library
//!
//! This library provides the console client for the two-player word guessing
//! game. It authenticates with the server, lets the player pick an opponent
//! and a secret word, and relays guesses and hints during a round.
//!
//! ## Architecture Overview
//!
//! ### Single Event Queue
//! Server frames, typed lines, end of input and Ctrl+C all land on one ordered
//! queue. The client handles them one at a time, so whichever source produces
//! something first is acted on first and nothing is polled.
//!
//! ### Pure State Machine
//! Game flow lives in a state machine that returns actions (send a frame,
//! print a line, exit) instead of performing them. The network loop carries
//! the actions out.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! - Opponent selection with local validation and re-prompting
//! - Secret word entry
//! - Round roles and the messages shown for each server reply
//!
//! ### Input Module (`input`)
//! - Blocking standard input reader on its own thread
//! - Line forwarding into the event queue
//!
//! ### Network Module (`network`)
//! - Connection and password handshake
//! - Frame listener task and the main event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::Endpoint;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = Endpoint::tcp("127.0.0.1", 8080);
//!     let client = Client::connect(&endpoint, "secret").await?;
//!     println!("Playing as {}", client.id());
//!
//!     client.run().await
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
