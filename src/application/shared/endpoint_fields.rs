use crate::domain::entities::event_type::EventType;
use std::collections::BTreeSet;

pub const MAX_NAME_CHARS: usize = 100;

/// Trimmed endpoint label, 1 to 100 characters.
pub fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name is required".to_string());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("name must be at most {MAX_NAME_CHARS} characters"));
    }
    Ok(name.to_string())
}

/// Parse a non-empty list of event identifiers into a subscription set.
pub fn parse_event_types(events: &[String]) -> Result<BTreeSet<EventType>, String> {
    if events.is_empty() {
        return Err("at least one event type is required".to_string());
    }
    events
        .iter()
        .map(|e| EventType::parse(e.trim()).map_err(|err| err.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_blank_or_long_name_when_validated_should_fail() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
        assert_eq!(validate_name("  crm  "), Ok("crm".to_string()));
    }

    #[test]
    fn given_duplicate_events_when_parsed_should_collapse_into_set() {
        let set = parse_event_types(&[
            "application.created".to_string(),
            "application.created".to_string(),
        ])
        .unwrap();

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn given_empty_or_unknown_events_when_parsed_should_fail() {
        assert!(parse_event_types(&[]).is_err());
        assert!(parse_event_types(&["job.created".to_string()]).is_err());
    }
}
