//! Statistics reporting.

use console::style;

use crate::download::{GlobalState, RunStatus};

/// Print statistics for a single collection run.
pub fn print_run_status(status: &RunStatus) {
    println!();
    println!(
        "{}",
        style(format!("Statistics for @{}:", status.collection)).bold()
    );
    println!("  Tweets:     {}", status.items_found);
    if let Some(total) = status.estimated_total {
        println!("  Profile:    {} tweets reported", total);
    }
    println!("  Pages:      {}", status.pages_fetched);
    println!(
        "  Images:     {} found, {} downloaded",
        status.assets_found, status.assets_downloaded
    );
    if status.assets_failed > 0 {
        println!("  Failed:     {}", style(status.assets_failed).yellow());
    }
    if let Some(secs) = status.duration_secs() {
        println!("  Duration:   {:.1}s", secs);
    }
    if status.failed() {
        let error = status.last_error.as_deref().unwrap_or("unknown error");
        println!("  {}", style(format!("Failed: {}", error)).red());
    } else if status.complete {
        println!("  {}", style("Feed fully fetched").green());
    }
}

/// Print global statistics across all collections.
pub fn print_global_stats(state: &GlobalState) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Global Statistics:").bold());
    println!("  Collections processed: {}", state.collections_processed);
    if state.collections_failed > 0 {
        println!(
            "  Collections failed:    {}",
            style(state.collections_failed).red()
        );
    }
    println!("  Tweets:  {}", state.items_found);
    println!(
        "  Images:  {} found, {} downloaded",
        state.assets_found, state.assets_downloaded
    );
    if state.assets_failed > 0 {
        println!("  Failed download attempts: {}", style(state.assets_failed).yellow());
    }
    println!("{}", style("═".repeat(50)).dim());
}
