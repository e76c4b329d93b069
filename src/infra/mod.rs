mod catalog;
mod config;
mod dispatch;
mod host;
mod jobs;
mod logging;
mod tmux;

pub use catalog::*;
pub use config::*;
pub use dispatch::*;
pub use host::*;
pub use jobs::*;
pub use logging::*;
pub use tmux::*;
