//! Human-readable byte sizes, shared by the status bar, progress dialogs,
//! and the column renderer.

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

pub fn format_size(bytes: u64) -> String {
    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Directories show a placeholder instead of a size in the file list --
/// computing a recursive size for every visible row would be one
/// `iterdir` per directory on every frame.
pub fn format_size_for_list(bytes: u64, is_dir: bool) -> String {
    if is_dir {
        "--".to_string()
    } else {
        format_size(bytes)
    }
}

pub fn parse_size(input: &str) -> Option<u64> {
    let parts: Vec<&str> = input.trim().split_whitespace().collect();
    let (value, unit) = match parts.as_slice() {
        [value, unit] => (*value, unit.to_uppercase()),
        [combined] => {
            let split_at = combined.find(|c: char| c.is_alphabetic())?;
            (&combined[..split_at], combined[split_at..].to_uppercase())
        }
        _ => return None,
    };
    let value: f64 = value.parse().ok()?;
    let multiplier = match unit.as_str() {
        "B" => 1,
        "KB" => KB,
        "MB" => MB,
        "GB" => GB,
        "TB" => TB,
        _ => return None,
    };
    Some((value * multiplier as f64) as u64)
}

/// True once free space drops under 5% of total -- the threshold the
/// status bar uses to switch the free-space indicator to a warning color.
pub fn is_space_critical(total: u64, free: u64) -> bool {
    if total == 0 {
        return false;
    }
    (free as f64 / total as f64) < 0.05
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_size_tier() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * MB), "5.0 MB");
        assert_eq!(format_size(3 * GB), "3.0 GB");
        assert_eq!(format_size(2 * TB), "2.0 TB");
    }

    #[test]
    fn directories_show_placeholder() {
        assert_eq!(format_size_for_list(1234, true), "--");
        assert_eq!(format_size_for_list(1234, false), "1.2 KB");
    }

    #[test]
    fn parse_size_accepts_spaced_and_joined_forms() {
        assert_eq!(parse_size("10 MB"), Some(10 * MB));
        assert_eq!(parse_size("10MB"), Some(10 * MB));
        assert_eq!(parse_size("garbage"), None);
    }

    #[test]
    fn space_critical_below_five_percent_free() {
        assert!(is_space_critical(1000, 40));
        assert!(!is_space_critical(1000, 60));
        assert!(!is_space_critical(0, 0));
    }
}
