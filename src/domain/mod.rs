mod command;
mod config;
mod job;
mod menu;
mod navigation;
mod outcome;
mod project;
mod session;
mod transition;

pub use command::*;
pub use config::*;
pub use job::*;
pub use menu::*;
pub use navigation::*;
pub use outcome::*;
pub use project::*;
pub use session::*;
pub use transition::*;
