//! Minimal actor runtime plus the actor that owns the analysis session.
//!
//! The TUI talks to [`analyst::AnalystActor`] through its [`actor::Addr`];
//! long calls run inside the actor so the UI loop never blocks.
pub mod actor;
pub mod analyst;
pub mod builder;
pub mod system;

pub use actor::{Actor, ActorHandle, Addr, Context};
pub use analyst::{AnalystActor, AnalystMsg};
pub use builder::Builder;
pub use system::{ActorSystem, ShutdownHandle};

/// Mailbox name of the session actor.
pub const ANALYST: &str = "analyst";
