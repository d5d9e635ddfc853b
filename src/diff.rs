//! New-event detection between two snapshots.

use std::collections::HashSet;

use crate::types::Event;

/// Events in `current` whose id does not appear in `previous`, in the order
/// they were extracted.
pub fn find_new_events(current: &[Event], previous: &[Event]) -> Vec<Event> {
    let previous_ids: HashSet<&str> = previous.iter().map(|e| e.id.as_str()).collect();

    current
        .iter()
        .filter(|e| !previous_ids.contains(e.id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::event_id;

    fn make_event(title: &str) -> Event {
        Event::new(
            title.to_string(),
            "Date not specified".to_string(),
            "No description available".to_string(),
            "https://omswami.org/events".to_string(),
        )
    }

    fn titles(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn test_no_changes() {
        let events = vec![make_event("Satsang"), make_event("Holi")];

        assert!(find_new_events(&events, &events).is_empty());
    }

    #[test]
    fn test_additions_keep_current_order() {
        let previous = vec![make_event("Holi")];
        let current = vec![
            make_event("Diwali"),
            make_event("Holi"),
            make_event("Navratri"),
        ];

        let new_events = find_new_events(&current, &previous);

        assert_eq!(titles(&new_events), vec!["Diwali", "Navratri"]);
    }

    #[test]
    fn test_empty_to_full() {
        let current = vec![make_event("Satsang")];

        assert_eq!(find_new_events(&current, &[]), current);
    }

    #[test]
    fn test_full_to_empty() {
        let previous = vec![make_event("Satsang")];

        assert!(find_new_events(&[], &previous).is_empty());
    }

    #[test]
    fn test_same_title_is_same_event() {
        let mut previous = make_event("Satsang");
        previous.date = "Last year".to_string();
        previous.description = "Old text".to_string();

        let current = vec![make_event("Satsang")];

        assert!(find_new_events(&current, &[previous]).is_empty());
    }

    #[test]
    fn test_repeated_diff_is_identical() {
        let previous = vec![make_event("Satsang")];
        let current = vec![make_event("Satsang"), make_event("Meditation Retreat")];

        let first = find_new_events(&current, &previous);
        let second = find_new_events(&current, &previous);

        assert_eq!(first, second);
        assert_eq!(first[0].id, event_id("Meditation Retreat"));
    }
}
