use crate::config::KeyScope;
use std::time::Duration;

/// Normalise a label for comparison: lowercase, single spaces, trimmed.
pub fn normalize_label(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The item label shown on a menu card is the first non-empty line of its text;
/// later lines carry price and blurb.
pub fn primary_label(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}

/// Derive the render-independent key for an item
pub fn stable_key(scope: KeyScope, segment_id: &str, label: &str) -> String {
    match scope {
        KeyScope::Segment => format!("{}/{}", segment_id, normalize_label(label)),
        KeyScope::Page => normalize_label(label),
    }
}

/// Turn a section heading into an id usable in a stable key
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Delay before retry number `failures` (1 after the first failed attempt).
///
/// Doubles from `base_ms` and is capped at `max_ms`.
pub fn backoff_delay(failures: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponent = failures.saturating_sub(1).min(20);
    let delay = base_ms.saturating_mul(1u64 << exponent);
    Duration::from_millis(delay.min(max_ms))
}

/// Number of viewport-sized steps needed to sweep the whole document
pub fn sweep_steps(document_height: u64, viewport_height: u64) -> u64 {
    if viewport_height == 0 {
        return 1;
    }
    document_height.div_ceil(viewport_height).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Orange   Chicken\n"), "orange chicken");
        assert_eq!(normalize_label("ÉCLAIR"), "éclair");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn test_primary_label() {
        assert_eq!(
            primary_label("\n  Orange Chicken \n$5.99\nCrispy chicken"),
            Some("Orange Chicken".to_string())
        );
        assert_eq!(primary_label("   \n\t"), None);
    }

    #[test]
    fn test_stable_key_scopes() {
        assert_eq!(
            stable_key(KeyScope::Segment, "entrees", "Orange  Chicken"),
            "entrees/orange chicken"
        );
        assert_eq!(
            stable_key(KeyScope::Page, "entrees", "Orange Chicken"),
            "orange chicken"
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Most Ordered"), "most-ordered");
        assert_eq!(slugify("  A la Carte / Sides! "), "a-la-carte-sides");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1, 500, 8000), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, 500, 8000), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3, 500, 8000), Duration::from_millis(2000));
        assert_eq!(backoff_delay(10, 500, 8000), Duration::from_millis(8000));
        assert_eq!(backoff_delay(u32::MAX, 500, 8000), Duration::from_millis(8000));
    }

    #[test]
    fn test_sweep_steps() {
        assert_eq!(sweep_steps(4500, 1000), 5);
        assert_eq!(sweep_steps(1000, 1000), 1);
        assert_eq!(sweep_steps(0, 1000), 1);
        assert_eq!(sweep_steps(4500, 0), 1);
    }
}
