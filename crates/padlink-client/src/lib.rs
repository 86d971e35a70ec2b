//! PadLink Client
//!
//! The device-side role: browses for advertised hosts, connects to one, and
//! streams every change on its registered local controllers to the host in
//! real time.
//!
//! # Example
//!
//! ```ignore
//! use padlink_client::{Client, ClientEvent};
//! use padlink_core::{Controller, ControllerType};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> padlink_client::Result<()> {
//!     let client = Client::new("Phone", "padlink");
//!     let pad = Arc::new(Controller::new(0).with_name("Touch Pad"));
//!     client.add_controller(pad.clone(), ControllerType::Remote)?;
//!
//!     let mut events = client.start()?;
//!     while let Some(event) = events.recv().await {
//!         if let ClientEvent::ServiceFound(record) = event {
//!             client.connect(&record).await?;
//!             pad.button_a.set_value(1.0, true); // streamed to the host
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;

pub use client::{Client, ClientEvent};
pub use error::{ClientError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::{Client, ClientEvent};
    pub use crate::error::{ClientError, Result};
    pub use padlink_core::{ConnectionStatus, Controller, ControllerType, GamepadLayout};
    pub use padlink_discovery::ServiceRecord;
}
