mod command;
mod dispatch;
mod feeders;
mod input;
mod render;
mod styles;
mod transcript;
mod tui;
mod view;

pub use feeders::spawn_tui_feeders;
pub use tui::{TuiActor, TuiMsg, restore_terminal};
