mod add;
mod fetch_tool;
mod run;

pub use add::run_add;
pub use fetch_tool::run_fetch_tool;
pub use run::run_batch;
