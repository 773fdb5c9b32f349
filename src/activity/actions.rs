//! Transformations applied to the analyses list after a successful mutation.
//!
//! Each function takes the current list by value and returns the new one.

use crate::models::{Analysis, Event};

/// Append an event to the analysis it was created on.
pub fn add_custom_event(
    analyses: Vec<Analysis>,
    analysis_key: &str,
    event: Event,
) -> Vec<Analysis> {
    analyses
        .into_iter()
        .map(|mut analysis| {
            if analysis.key == analysis_key {
                analysis.events.push(event.clone());
            }
            analysis
        })
        .collect()
}

/// Merge a changed event into whichever analysis owns it.
pub fn change_event(analyses: Vec<Analysis>, event: &Event) -> Vec<Analysis> {
    analyses
        .into_iter()
        .map(|mut analysis| {
            for existing in analysis.events.iter_mut().filter(|e| e.key == event.key) {
                existing.name = event.name.clone();
                if event.category.is_some() {
                    existing.category = event.category;
                }
                if event.description.is_some() {
                    existing.description = event.description.clone();
                }
            }
            analysis
        })
        .collect()
}

pub fn delete_analysis(analyses: Vec<Analysis>, analysis_key: &str) -> Vec<Analysis> {
    analyses
        .into_iter()
        .filter(|analysis| analysis.key != analysis_key)
        .collect()
}

/// Remove an event from one analysis; the analysis itself stays.
pub fn delete_event(analyses: Vec<Analysis>, analysis_key: &str, event_key: &str) -> Vec<Analysis> {
    analyses
        .into_iter()
        .map(|mut analysis| {
            if analysis.key == analysis_key {
                analysis.events.retain(|e| e.key != event_key);
            }
            analysis
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{analysis, event};
    use crate::models::EventCategory;

    fn sample() -> Vec<Analysis> {
        let mut first = analysis(1);
        first.events = vec![
            event("E1", "1.0", Some(EventCategory::Version)),
            event("E2", "Custom", Some(EventCategory::Other)),
        ];
        let mut second = analysis(2);
        second.events = vec![event("E3", "0.9", Some(EventCategory::Version))];
        vec![first, second, analysis(3)]
    }

    #[test]
    fn test_add_custom_event() {
        let result = add_custom_event(sample(), "A3", event("E4", "Hotfix", None));
        assert_eq!(result[2].events.len(), 1);
        assert_eq!(result[2].events[0].name, "Hotfix");
        assert_eq!(result[0].events.len(), 2);
    }

    #[test]
    fn test_add_custom_event_unknown_analysis() {
        let result = add_custom_event(sample(), "missing", event("E4", "x", None));
        assert_eq!(result, sample());
    }

    #[test]
    fn test_change_event() {
        let result = change_event(sample(), &event("E2", "Renamed", None));
        assert_eq!(result[0].events[1].name, "Renamed");
        assert_eq!(result[0].events[1].category, Some(EventCategory::Other));
        assert_eq!(result[0].events[0].name, "1.0");
        assert_eq!(result[1].events[0].name, "0.9");
    }

    #[test]
    fn test_delete_analysis() {
        let analyses = vec![analysis(1), analysis(2)];
        let result = delete_analysis(analyses, "A1");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].key, "A2");
    }

    #[test]
    fn test_delete_event_only_touches_one_analysis() {
        let before = sample();
        let after = delete_event(before.clone(), "A1", "E1");

        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].events.len(), before[0].events.len() - 1);
        assert_eq!(after[0].events[0].key, "E2");
        for (b, a) in before.iter().zip(after.iter()).skip(1) {
            assert_eq!(a.events.len(), b.events.len());
        }
    }

    #[test]
    fn test_delete_event_wrong_analysis_is_noop() {
        let after = delete_event(sample(), "A2", "E1");
        assert_eq!(after, sample());
    }
}
