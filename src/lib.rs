//! # leaseline
//!
//! A minimal address-leasing server speaking a text-framed DHCP-style
//! protocol over UDP.
//!
//! ## Features
//!
//! - DISCOVER/OFFER and REQUEST/ACK/NAK exchanges as single-line text datagrams
//! - Monotone address pool: every address is handed out once and never reclaimed
//! - Sticky leases: a returning client is offered its recorded address
//! - Relay-style replies to the configured gateway for wildcard senders
//! - Bounded concurrency with a fixed number of in-flight handlers
//! - Async/await with Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use leaseline::{Config, LeaseServer};
//!
//! #[tokio::main]
//! async fn main() -> leaseline::Result<()> {
//!     let config = Config::load_or_create("config.json")?;
//!     let server = LeaseServer::new(config).await?;
//!     server.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`Config`] - Server configuration (pool shape, lease duration, reply parameters)
//! - [`LeaseServer`] - UDP dispatch loop with admission control
//! - [`LeaseTable`] - Thread-safe client-to-address table owning the pool
//! - [`Request`] / [`Reply`] - Text message parsing and encoding
//! - [`AddressPool`] - Monotone allocation cursor

pub mod admission;
pub mod config;
pub mod error;
pub mod handler;
pub mod lease;
pub mod message;
pub mod pool;
pub mod server;

pub use admission::{AdmissionControl, HandlerPermit};
pub use config::Config;
pub use error::{Error, Result};
pub use handler::RequestHandler;
pub use lease::{LeaseRecord, LeaseTable};
pub use message::{LeaseParams, Reply, Request};
pub use pool::AddressPool;
pub use server::LeaseServer;
