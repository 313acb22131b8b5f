//! Structural output: headers, key-value pairs, step labels.

use colored::Colorize;

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// `[num/total]`, with `num` padded to the width of `total`.
pub fn step_label(num: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("[{num:>width$}/{total}]")
}
