//! Terminal UI utilities

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use unistore_lib::StoreEvent;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print a section header
pub fn header(text: &str) {
    println!("\n{}", text.bold().underline());
}

/// Print a key-value pair
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Create a spinner progress indicator
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a separator line
pub fn separator() {
    println!("{}", "─".repeat(60).dimmed());
}

/// Print one store event
pub fn event(event: &StoreEvent) {
    match event {
        StoreEvent::Initialized { success: true } => success("initialized"),
        StoreEvent::Initialized { success: false } => error("initialization failed"),
        StoreEvent::PurchaseStarted { info: purchase } => {
            info(&format!("purchase started: {}", purchase.product_id()))
        }
        StoreEvent::PurchaseSucceeded { info, receipt } => {
            success(&format!("purchase succeeded: {}", info.product_id()));
            if !info.price().is_empty() {
                key_value("price", info.price());
            }
            if let Some(purchase_id) = info.purchase_id() {
                key_value("purchase id", purchase_id);
            }
            if !receipt.is_empty() {
                key_value("receipt", receipt);
            }
        }
        StoreEvent::PurchaseFailed { info, reason } => {
            error(&format!("purchase failed: {} ({})", info.product_id(), reason))
        }
        StoreEvent::Restored { success: true } => success("purchases restored"),
        StoreEvent::Restored { success: false } => warning("restore failed"),
    }
}
