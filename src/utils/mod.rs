use crate::errors::{BfsError, BfsResult};
use crate::storage::layout::MAX_NAME_LEN;

pub struct Utils;

impl Utils {
    /// Check a file name against what the flat root directory can store.
    pub fn validate_name(name: &str) -> BfsResult<()> {
        if name.is_empty() {
            return Err(BfsError::InvalidName("name cannot be empty".to_string()));
        }

        if name.len() > MAX_NAME_LEN {
            return Err(BfsError::InvalidName(format!(
                "{:?} is {} bytes, at most {MAX_NAME_LEN} allowed",
                Self::truncate_string(name, 40),
                name.len()
            )));
        }

        if name.contains('/') || name.contains('\0') {
            return Err(BfsError::InvalidName(format!(
                "{name:?} contains '/' or NUL"
            )));
        }

        Ok(())
    }

    pub fn format_file_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

        if size == 0 {
            return "0 B".to_string();
        }

        let base = 1024_f64;
        let log = (size as f64).log(base).floor() as usize;
        let unit_index = std::cmp::min(log, UNITS.len() - 1);
        let size_in_unit = size as f64 / base.powi(unit_index as i32);

        if unit_index == 0 {
            format!("{size} B")
        } else if size_in_unit >= 100.0 {
            format!("{:.0} {}", size_in_unit, UNITS[unit_index])
        } else if size_in_unit >= 10.0 {
            format!("{:.1} {}", size_in_unit, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size_in_unit, UNITS[unit_index])
        }
    }

    pub fn truncate_string(s: &str, max_length: usize) -> String {
        if s.len() <= max_length {
            return s.to_string();
        }
        let mut end = max_length.saturating_sub(3);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }

    /// Printable preview of file contents: text as-is, anything else as hex.
    pub fn preview_bytes(data: &[u8], max_length: usize) -> String {
        match std::str::from_utf8(data) {
            Ok(text) if !text.chars().any(|c| c.is_control() && c != '\n' && c != '\t') => {
                Self::truncate_string(text, max_length)
            }
            _ => {
                let hex: String = data
                    .iter()
                    .take(max_length / 2)
                    .map(|b| format!("{b:02x}"))
                    .collect();
                if data.len() * 2 > max_length {
                    format!("{hex}...")
                } else {
                    hex
                }
            }
        }
    }
}
