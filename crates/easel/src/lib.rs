//! easel - a single drawing window driven by a thread-safe message loop.
//!
//! This is the main crate. It re-exports the core event types from
//! `easel-core` and adds the window host, its backends and the raster canvas.
//!
//! # Example
//!
//! ```no_run
//! use easel::{Color, EventKind, Host, HostConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut host = Host::new();
//!     host.init(HostConfig::new("Hello", 640, 480))?;
//!     host.fill_circle(320, 240, 50, Color::RED)?;
//!
//!     while let Some(event) = host.get_message()? {
//!         if event.kind() == EventKind::Close {
//!             break;
//!         }
//!     }
//!     Ok(host.close()?)
//! }
//! ```

pub mod backend;
mod canvas;
mod host;
pub mod prelude;
mod text;

pub use easel_core::*;

pub use backend::headless::{HeadlessBackend, HeadlessController, NativeInput};
#[cfg(feature = "native")]
pub use backend::native::WinitBackend;
pub use backend::{Backend, DrawOp, Session, UiCommand};
pub use canvas::Canvas;
pub use host::{Host, HostState};
pub use text::TextRenderer;
