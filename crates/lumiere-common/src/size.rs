//! Bottle size labels such as `"50ml"`.

use std::sync::LazyLock;

use regex::Regex;

static ML_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*ml").expect("ml pattern is a valid regex")
});

/// Parse the volume in millilitres from a size label.
///
/// `"50ml"`, `"50 ML"` and `"Travel 10ml"` all parse; a label with no
/// `<digits>ml` part has no volume and returns `None`.
pub fn parse_ml(label: &str) -> Option<u32> {
    ML_PATTERN
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Normalize the comma separated size list typed into the admin form.
///
/// Parts are trimmed, empty parts dropped, and bare numbers get an `ml`
/// suffix: `"30, 50ml,,100"` becomes `["30ml", "50ml", "100ml"]`.
pub fn normalize_sizes(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part.parse::<f64>().is_ok_and(f64::is_finite) {
                format!("{}ml", part)
            } else {
                part.to_string()
            }
        })
        .collect()
}

/// Normalize an already split list of labels the same way as [`normalize_sizes`].
pub fn normalize_size_list(sizes: &[String]) -> Vec<String> {
    normalize_sizes(&sizes.join(","))
}

/// Sort labels by ascending volume. Labels without a volume sort first.
pub fn sort_by_volume(sizes: &mut [String]) {
    sizes.sort_by_key(|label| parse_ml(label).unwrap_or(0));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_volume_case_insensitively() {
        assert_eq!(parse_ml("50ml"), Some(50));
        assert_eq!(parse_ml("100 ML"), Some(100));
        assert_eq!(parse_ml("Travel 10ml"), Some(10));
        assert_eq!(parse_ml("large"), None);
    }

    #[test]
    fn normalizes_admin_input() {
        assert_eq!(
            normalize_sizes(" 30, 50ml,,100 "),
            vec!["30ml", "50ml", "100ml"]
        );
        assert!(normalize_sizes(" , ").is_empty());
    }

    #[test]
    fn keeps_non_numeric_labels() {
        assert_eq!(normalize_sizes("Gift Set, 75"), vec!["Gift Set", "75ml"]);
    }

    #[test]
    fn sorts_by_parsed_volume() {
        let mut sizes = vec!["100ml".to_string(), "30ml".to_string(), "50ml".to_string()];
        sort_by_volume(&mut sizes);
        assert_eq!(sizes, vec!["30ml", "50ml", "100ml"]);
    }
}
