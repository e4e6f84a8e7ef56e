use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use console::style;

use crate::core::models::{Secret, TrashItem, TrashKind};

pub fn is_insecure_terminal() -> bool {
    !std::io::stdout().is_terminal()
}

pub fn print_header(title: &str) {
    println!("cofre {}", env!("CARGO_PKG_VERSION"));
    println!("---------------------------------------");
    println!("{}", title);
    println!("---------------------------------------");
}

pub fn system(message: &str) {
    println!("{}", message);
}

pub fn secure(message: &str) {
    println!("🔐 {}", message);
}

pub fn success(message: &str) {
    println!("✅ {}", style(message).green());
}

pub fn warning(message: &str) {
    println!("⚠️ {}", style(message).yellow());
}

pub fn error(message: &str) {
    eprintln!("⛔ {}", style(message).red());
}

pub fn clear_screen() {
    if is_insecure_terminal() {
        return;
    }
    print!("\x1B[2J\x1B[1;1H");
}

pub fn secret_row(secret: &Secret) -> String {
    let username = secret.username.as_deref().unwrap_or("-");
    let project = secret
        .project_id
        .map(|id| format!("#{id}"))
        .unwrap_or_else(|| "-".to_owned());
    format!(
        "{:>6}  {:<24}  {:<20}  {}",
        secret.id,
        truncate(&secret.title, 24),
        truncate(username, 20),
        project
    )
}

pub fn trash_row(item: &TrashItem) -> String {
    let kind = match item.kind() {
        TrashKind::Secret => "secret",
        TrashKind::Project => "project",
    };
    format!(
        "{:>6}  {:<8}  {:<24}  {}",
        item.id(),
        kind,
        truncate(item.label(), 24),
        format_timestamp(item.deleted_at())
    )
}

pub fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_owned())
}

/// Human readable byte size, base 1024.
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes <= 0 {
        return "0 B".to_owned();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_owned()
    } else {
        let kept: String = text.chars().take(max - 1).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::{format_size, truncate};

    #[test]
    fn formats_sizes_across_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn truncates_long_titles() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long secret title", 10), "a very lo…");
    }
}
