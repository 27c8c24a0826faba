// FormatSelector - turns backend formats into UI-friendly choices
//
// The backend already orders formats (best first), so the order is kept.
// Formats with a duplicate id are dropped; the first occurrence wins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::models::FormatOption;
use super::utils::format_size;

/// Format choice for UI display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatChoice {
    /// Display label (e.g., "1920x1080 (mp4) - 150.0 MB")
    pub label: String,

    /// Value for selection: the backend format id
    pub value: String,

    /// Estimated file size (e.g., "150.0 MB")
    pub estimated_size: Option<String>,
}

pub struct FormatSelector;

impl FormatSelector {
    pub fn build_options(formats: &[FormatOption]) -> Vec<FormatChoice> {
        let mut seen = HashSet::new();
        formats
            .iter()
            .filter(|f| !f.format_id.is_empty() && seen.insert(f.format_id.as_str()))
            .map(Self::choice_for)
            .collect()
    }

    fn choice_for(format: &FormatOption) -> FormatChoice {
        let resolution = if format.resolution.is_empty() {
            "unknown"
        } else {
            format.resolution.as_str()
        };
        let ext = if format.ext.is_empty() {
            "unknown"
        } else {
            format.ext.as_str()
        };
        let estimated_size = format.filesize.map(format_size);

        let label = match &estimated_size {
            Some(size) => format!("{} ({}) - {}", resolution, ext, size),
            None => format!("{} ({})", resolution, ext),
        };

        FormatChoice {
            label,
            value: format.format_id.clone(),
            estimated_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_format(id: &str, resolution: &str, ext: &str, size: Option<u64>) -> FormatOption {
        FormatOption {
            format_id: id.to_string(),
            resolution: resolution.to_string(),
            ext: ext.to_string(),
            filesize: size,
        }
    }

    #[test]
    fn test_labels() {
        let formats = vec![
            make_format("137", "1920x1080", "mp4", Some(150_000_000)),
            make_format("18", "640x360", "mp4", None),
        ];

        let options = FormatSelector::build_options(&formats);

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "1920x1080 (mp4) - 150.0 MB");
        assert_eq!(options[0].value, "137");
        assert_eq!(options[0].estimated_size.as_deref(), Some("150.0 MB"));
        assert_eq!(options[1].label, "640x360 (mp4)");
        assert_eq!(options[1].estimated_size, None);
    }

    #[test]
    fn test_order_kept_and_duplicates_dropped() {
        let formats = vec![
            make_format("22", "1280x720", "mp4", None),
            make_format("18", "640x360", "mp4", None),
            make_format("22", "1280x720", "webm", None),
            make_format("", "NAxNA", "mp4", None),
        ];

        let values: Vec<String> = FormatSelector::build_options(&formats)
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, vec!["22", "18"]);
    }

    #[test]
    fn test_missing_fields() {
        let options = FormatSelector::build_options(&[make_format("9gag_default", "", "", None)]);
        assert_eq!(options[0].label, "unknown (unknown)");
    }
}
