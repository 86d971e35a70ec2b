//! PadLink Browser
//!
//! The host-side role: advertises a named service on the local network,
//! accepts inbound connections, and turns each connected peer's control
//! stream into [`Controller`] objects the application observes.
//!
//! # Example
//!
//! ```ignore
//! use padlink_browser::{BrowserConfig, BrowserEvent, ControllerBrowser};
//!
//! #[tokio::main]
//! async fn main() -> padlink_browser::Result<()> {
//!     let browser = ControllerBrowser::new(BrowserConfig::new("Living Room"));
//!     let mut events = browser.start().await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             BrowserEvent::ControllerConnected { controller, .. } => {
//!                 controller.button_a.on_change(|value, pressed| {
//!                     println!("A: {} ({})", value, pressed);
//!                 });
//!             }
//!             BrowserEvent::ControllerDisconnected(c) => println!("{:?} left", c),
//!             BrowserEvent::Error(e) => eprintln!("{}", e),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod error;
mod session;

pub use browser::{BrowserConfig, BrowserEvent, ControllerBrowser};
pub use error::{BrowserError, Result};
