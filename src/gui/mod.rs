//! Terminal front ends for the binaries.

mod error;
mod live_view;

pub use error::GuiError;
pub use live_view::watch_until_keypress;
