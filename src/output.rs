//! CLI output formatting for every command.
//!
//! # Identity First
//!
//! Every image is shown by its key, `account/identifier`, as the header
//! line. Attributes follow as indented context lines, so the output of
//! `add`, `info` and `meta` reads the same for the same image.
//!
//! # Output Format
//!
//! ## add / info / meta
//!
//! ```text
//! christer/5d41402abc4b2a76b9719d911017c592
//!     Image: 800x600 image/png (1.2 KiB)
//!     Checksum: 5d41402abc4b2a76b9719d911017c592...
//!     Created: 2024-03-01 12:00:00 UTC
//!     Updated: 2024-03-01 12:00:00 UTC
//!     Metadata:
//!         title: dawn
//! ```
//!
//! ## get
//!
//! ```text
//! 300x225 image/jpeg (18.4 KiB) → thumb.jpg
//! Cache: 1 rendered
//! ```
//!
//! ## warm
//!
//! ```text
//! christer/5d41402abc4b2a76b9719d911017c592
//!     400px: 400x300 image/jpeg (31.0 KiB)
//!     800px: 800x600 image/jpeg (96.2 KiB)
//! Cache: 1 cached, 1 rendered (2 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::storage::{DeleteOutcome, ImageInfo};
use crate::transformation::Rendered;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count: `512 B`, `1.2 KiB`, `3.4 MiB`.
fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

/// `WxH mime (size)`, the one-line summary of any encoded image.
fn image_summary(width: u32, height: u32, mime: &str, bytes: u64) -> String {
    format!("{width}x{height} {mime} ({})", format_bytes(bytes))
}

fn image_key(account: &str, identifier: &str) -> String {
    format!("{account}/{identifier}")
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

// ============================================================================
// add / info / meta
// ============================================================================

/// Format an image record: key header, then attributes and metadata.
pub fn format_image_info(info: &ImageInfo) -> Vec<String> {
    let mut lines = vec![image_key(&info.account, &info.identifier)];
    let time = |t: &chrono::DateTime<chrono::Utc>| t.format("%Y-%m-%d %H:%M:%S UTC").to_string();

    lines.push(format!(
        "{}Image: {}",
        indent(1),
        image_summary(info.width, info.height, &info.mime, info.size)
    ));
    lines.push(format!("{}Checksum: {}", indent(1), info.checksum));
    lines.push(format!("{}Created: {}", indent(1), time(&info.created)));
    lines.push(format!("{}Updated: {}", indent(1), time(&info.updated)));
    if !info.metadata.is_empty() {
        lines.push(format!("{}Metadata:", indent(1)));
        for (key, value) in &info.metadata {
            lines.push(format!("{}{key}: {value}", indent(2)));
        }
    }
    lines
}

pub fn print_image_info(info: &ImageInfo) {
    print_lines(format_image_info(info));
}

// ============================================================================
// get / warm
// ============================================================================

/// Format a served variation and where it was written.
pub fn format_rendered(rendered: &Rendered, destination: &Path) -> Vec<String> {
    vec![format!(
        "{} → {}",
        image_summary(
            rendered.width,
            rendered.height,
            &rendered.mime,
            rendered.blob.len() as u64
        ),
        destination.display()
    )]
}

pub fn print_rendered(rendered: &Rendered, destination: &Path) {
    print_lines(format_rendered(rendered, destination));
}

/// Format the result of warming several widths of one image.
pub fn format_warm_output(
    account: &str,
    identifier: &str,
    widths: &[u32],
    rendered: &[Rendered],
) -> Vec<String> {
    let mut lines = vec![image_key(account, identifier)];
    for (width, r) in widths.iter().zip(rendered) {
        lines.push(format!(
            "{}{width}px: {}",
            indent(1),
            image_summary(r.width, r.height, &r.mime, r.blob.len() as u64)
        ));
    }
    lines
}

pub fn print_warm_output(account: &str, identifier: &str, widths: &[u32], rendered: &[Rendered]) {
    print_lines(format_warm_output(account, identifier, widths, rendered));
}

// ============================================================================
// delete / purge
// ============================================================================

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Format an image deletion with the number of cascaded variations.
pub fn format_delete_output(account: &str, identifier: &str, variations: usize) -> Vec<String> {
    vec![format!(
        "Deleted {} ({} removed)",
        image_key(account, identifier),
        plural(variations, "variation")
    )]
}

pub fn print_delete_output(account: &str, identifier: &str, variations: usize) {
    print_lines(format_delete_output(account, identifier, variations));
}

/// Format the outcome of a variation purge.
pub fn format_purge_output(
    account: &str,
    identifier: &str,
    width: Option<u32>,
    outcome: DeleteOutcome,
) -> Vec<String> {
    let scope = match width {
        Some(w) => format!("{w}px of {}", image_key(account, identifier)),
        None => image_key(account, identifier),
    };
    match outcome {
        DeleteOutcome::Deleted(n) => {
            vec![format!("Purged {} from {scope}", plural(n, "variation"))]
        }
        DeleteOutcome::NothingToDelete => vec![format!("Nothing to delete for {scope}")],
    }
}

pub fn print_purge_output(
    account: &str,
    identifier: &str,
    width: Option<u32>,
    outcome: DeleteOutcome,
) {
    print_lines(format_purge_output(account, identifier, width, outcome));
}
