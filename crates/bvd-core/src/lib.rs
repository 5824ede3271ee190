pub mod config;
pub mod logging;

pub mod cmdline;
pub mod error;
pub mod item;
pub mod progress;
pub mod queue;
pub mod tool;
pub mod url_expand;
pub mod worker;
