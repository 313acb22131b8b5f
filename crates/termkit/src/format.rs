//! Small text formatting helpers.

/// `"1 bundle"`, `"2 bundles"`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
