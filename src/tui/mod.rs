//! Reporters that render the running statistics

mod headless;
mod live_view;

pub use headless::log_progress;
pub use live_view::{stat_rows, LiveView};
