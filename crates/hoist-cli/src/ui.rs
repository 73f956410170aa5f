//! UI utilities for the Hoist CLI.

use std::io::{self, Write};

use hoist_core::client::UploadProgress;

const BAR_WIDTH: usize = 28;

/// Render an in-place progress line for an upload.
pub fn print_progress(progress: &UploadProgress) {
    let percentage = progress.percentage();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);

    print!(
        "\r  [{}{}] {:>5.1}%  {}/{} chunks  {}",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        percentage,
        progress.sent_chunks,
        progress.total_chunks,
        format_size(progress.bytes_sent),
    );
    let _ = io::stdout().flush();
}

/// Finish the in-place progress line.
pub fn finish_progress() {
    println!();
}

/// Format a file size for display.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
