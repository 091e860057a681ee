use scraper::{Html, Selector};

/// Collapse markup to its visible text
pub fn plain_text(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    doc.root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first non-empty heading inside a section's outer HTML
pub fn heading_text(section_html: &str, heading_selector: &str) -> Option<String> {
    let selector = match Selector::parse(heading_selector) {
        Ok(selector) => selector,
        Err(e) => {
            ::log::debug!("Invalid heading selector {:?}: {}", heading_selector, e);
            return None;
        }
    };

    let doc = Html::parse_fragment(section_html);
    doc.select(&selector)
        .map(|heading| {
            heading
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .find(|text| !text.is_empty())
}

/// Check a CSS selector before handing it to the browser
pub fn is_valid_selector(selector: &str) -> bool {
    Selector::parse(selector).is_ok()
}
