//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Live progress per collection
//! - Statistics reporting

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{
    print_banner, print_config_summary, print_error, print_info, print_success, print_warning,
};
pub use progress::{create_spinner, spawn_progress, ProgressBoard};
pub use stats::{print_global_stats, print_run_status};
