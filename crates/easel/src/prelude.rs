//! Prelude module for easel.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use easel::prelude::*;
//! ```

// ============================================================================
// Host
// ============================================================================

pub use crate::{Host, HostConfig, HostError, HostState};

// ============================================================================
// Events
// ============================================================================

pub use crate::{Event, EventKind, KeyCode, Modifiers, MouseButton, TimerId, WindowId};

// ============================================================================
// Drawing
// ============================================================================

pub use crate::Color;
