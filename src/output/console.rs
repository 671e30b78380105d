//! Console output utilities.

use std::path::Path;

use console::style;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     Feed Harvester                                    ║
║     Resumable tweet and media archiver                ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(
    collections: &[String],
    data_dir: &Path,
    max_downloads: usize,
    export_dir: Option<&Path>,
) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Collections: {}", collections.join(", "));
    println!("  Directory: {}", data_dir.display());
    println!("  Parallel downloads: {}", max_downloads);
    if let Some(dir) = export_dir {
        println!("  Export: {}", dir.display());
    }
    println!();
}
