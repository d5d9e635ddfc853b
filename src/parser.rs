use scraper::{ElementRef, Html, Node, Selector};

use crate::types::{DATE_NOT_SPECIFIED, Event, NO_DESCRIPTION};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Literals the extraction heuristic keys on.
#[derive(Debug, Clone)]
pub struct ExtractRules {
    pub heading_selector: String,
    pub date_marker_selector: String,
    pub excluded_titles: Vec<String>,
    pub non_date_prefixes: Vec<String>,
    pub max_sibling_scan: usize,
    pub description_paragraphs: usize,
    pub max_description_chars: usize,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            heading_selector: "h3".to_string(),
            date_marker_selector: r#"img[alt="Event Date"]"#.to_string(),
            excluded_titles: vec!["Event Gallery".to_string(), "Download Pics".to_string()],
            non_date_prefixes: vec!["Event Details".to_string()],
            max_sibling_scan: 10,
            description_paragraphs: 2,
            max_description_chars: 500,
        }
    }
}

impl ExtractRules {
    fn is_excluded(&self, title: &str) -> bool {
        self.excluded_titles.iter().any(|t| t == title)
    }
}

/// Accepts a node's text as an event date when it is longer than three
/// characters and does not open with one of the known non-date labels.
pub fn is_date_candidate(text: &str, non_date_prefixes: &[String]) -> bool {
    let text = text.trim();
    text.chars().count() > 3 && !non_date_prefixes.iter().any(|p| text.starts_with(p.as_str()))
}

/// Extracts events from the listing page, in document order.
///
/// Never fails: a broken rule set is logged and yields no events, which makes
/// the caller skip the cycle instead of overwriting history.
pub fn extract_events(html: &str, url: &str, rules: &ExtractRules) -> Vec<Event> {
    match try_extract_events(html, url, rules) {
        Ok(events) => {
            log::info!("Successfully extracted {} events", events.len());
            events
        }
        Err(e) => {
            log::warn!("Unexpected error parsing events: {}", e);
            Vec::new()
        }
    }
}

pub fn try_extract_events(
    html: &str,
    url: &str,
    rules: &ExtractRules,
) -> Result<Vec<Event>, ParseError> {
    let heading_selector = parse_selector(&rules.heading_selector)?;
    let marker_selector = parse_selector(&rules.date_marker_selector)?;
    let paragraph_selector = parse_selector("p")?;

    let document = Html::parse_document(html);

    // Each heading is paired with the first marker that follows it in
    // document order, descendants of the heading included.
    let mut headings: Vec<(ElementRef, Option<ElementRef>)> = Vec::new();
    let mut awaiting_marker = 0;
    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if marker_selector.matches(&element) {
            for entry in &mut headings[awaiting_marker..] {
                entry.1 = Some(element);
            }
            awaiting_marker = headings.len();
        }
        if heading_selector.matches(&element) {
            headings.push((element, None));
        }
    }

    let events = headings
        .into_iter()
        .filter_map(|(heading, marker)| {
            let title = stripped_text(heading);
            if title.is_empty() {
                return None;
            }
            if rules.is_excluded(&title) {
                log::debug!("Skipping non-event heading: {}", title);
                return None;
            }

            let date = match marker {
                Some(marker) => locate_date(marker, rules).unwrap_or_else(|| {
                    log::debug!("Date marker for '{}' has no usable text", title);
                    DATE_NOT_SPECIFIED.to_string()
                }),
                None => {
                    log::warn!("No date marker found for event: {}", title);
                    DATE_NOT_SPECIFIED.to_string()
                }
            };
            log::debug!("Date for '{}': {}", title, date);

            let description = describe(heading, &paragraph_selector, rules);

            Some(Event::new(title, date, description, url.to_string()))
        })
        .collect();

    Ok(events)
}

fn parse_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Concatenation of the element's trimmed, non-empty text fragments.
fn stripped_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn sibling_texts(element: ElementRef, limit: usize) -> Vec<String> {
    element
        .next_siblings()
        .take(limit)
        .map(|node| match node.value() {
            Node::Text(text) => text.trim().to_string(),
            Node::Element(_) => ElementRef::wrap(node)
                .map(stripped_text)
                .unwrap_or_default(),
            _ => String::new(),
        })
        .collect()
}

/// Scans the marker's following siblings for the date text. A marker with no
/// following siblings is usually wrapped alone, so its container's following
/// siblings are scanned instead.
fn locate_date(marker: ElementRef, rules: &ExtractRules) -> Option<String> {
    let anchor = if marker.next_sibling().is_some() {
        marker
    } else {
        marker.parent().and_then(ElementRef::wrap)?
    };

    sibling_texts(anchor, rules.max_sibling_scan)
        .into_iter()
        .find(|text| is_date_candidate(text, &rules.non_date_prefixes))
}

fn describe(heading: ElementRef, paragraphs: &Selector, rules: &ExtractRules) -> String {
    let Some(container) = heading.parent().and_then(ElementRef::wrap) else {
        return NO_DESCRIPTION.to_string();
    };

    let text = container
        .select(paragraphs)
        .take(rules.description_paragraphs)
        .map(stripped_text)
        .collect::<Vec<_>>()
        .join(" ");

    if text.trim().is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        text.chars().take(rules.max_description_chars).collect()
    }
}
