//! `<defined_events>` rendering for planner prompts.
//!
//! The list always starts with the synthetic "All Events" entry. When the team has
//! more than 25 events, events seen three times or fewer are left out. Well-known
//! events get a `<description>` from the core definitions table unless they are
//! flagged as system or ignored.

use super::provider::EventCount;

/// Above this many events, rarely used ones are elided.
pub const EVENT_ELISION_THRESHOLD: usize = 25;
/// Events with a count at or below this are elided (when above the threshold).
pub const RARE_EVENT_MAX_COUNT: u64 = 3;

pub const ALL_EVENTS: &str = "All Events";

/// Core definition of a well-known event.
#[derive(Debug, Clone, Copy)]
pub struct CoreEventDefinition {
    pub name: &'static str,
    pub label: Option<&'static str>,
    pub description: Option<&'static str>,
    pub system: bool,
    pub ignored_in_assistant: bool,
}

const fn def(name: &'static str, label: &'static str, description: &'static str) -> CoreEventDefinition {
    CoreEventDefinition {
        name,
        label: Some(label),
        description: Some(description),
        system: false,
        ignored_in_assistant: false,
    }
}

const fn hidden(name: &'static str, label: &'static str, system: bool) -> CoreEventDefinition {
    CoreEventDefinition {
        name,
        label: Some(label),
        description: None,
        system,
        ignored_in_assistant: !system,
    }
}

pub const CORE_EVENT_DEFINITIONS: &[CoreEventDefinition] = &[
    def(ALL_EVENTS, "All events", "This is a wildcard that matches all events."),
    def("$pageview", "Pageview", "When a user loads (or reloads) a page."),
    def("$pageleave", "Pageleave", "When a user leaves a page."),
    def("$autocapture", "Autocapture", "User interactions that were automatically captured."),
    def("$screen", "Screen", "When a user loads a screen in a mobile app."),
    def("$identify", "Identify", "A user has been identified with properties."),
    def("$rageclick", "Rageclick", "A user has rapidly and repeatedly clicked in a single place."),
    def("$exception", "Exception", "Exceptions - an error or unexpected event in your application."),
    def(
        "$create_alias",
        "Alias",
        "An alias ID has been added to a user.\nThis event is only used in the identification process.",
    ),
    def("$groupidentify", "Group identify", "A group has been identified with properties."),
    def("$web_vitals", "Web vitals", "Automatically captured web vitals data."),
    hidden("$feature_flag_called", "Feature flag called", true),
    hidden("$set", "Set person properties", true),
    hidden("$snapshot", "Session recording snapshot", true),
    hidden("$opt_in", "Opt in", false),
    hidden("$copy_autocapture", "Clipboard autocapture", false),
];

pub fn core_event_definition(name: &str) -> Option<&'static CoreEventDefinition> {
    CORE_EVENT_DEFINITIONS.iter().find(|d| d.name == name)
}

/// Replaces line breaks with spaces.
pub fn remove_line_breaks(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Event names that go into the prompt, in order: "All Events" then the kept events.
pub fn prompt_event_names(events: &[EventCount]) -> Vec<&str> {
    let elide = events.len() > EVENT_ELISION_THRESHOLD;
    std::iter::once(ALL_EVENTS)
        .chain(
            events
                .iter()
                .filter(|e| !(elide && e.count <= RARE_EVENT_MAX_COUNT))
                .map(|e| e.event.as_str()),
        )
        .collect()
}

/// Renders the `<defined_events>` block.
pub fn render_events_prompt(events: &[EventCount]) -> String {
    let mut out = String::from("<defined_events>");
    for name in prompt_event_names(events) {
        out.push_str("<event><name>");
        out.push_str(&escape_xml(name));
        out.push_str("</name>");
        if let Some(def) = core_event_definition(name) {
            if !def.system && !def.ignored_in_assistant {
                if let Some(description) = def.description {
                    let text = match def.label {
                        Some(label) => format!("{}. {}", label, description),
                        None => description.to_string(),
                    };
                    out.push_str("<description>");
                    out.push_str(&escape_xml(&remove_line_breaks(&text)));
                    out.push_str("</description>");
                }
            }
        }
        out.push_str("</event>");
    }
    out.push_str("</defined_events>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(n: usize, rare: usize) -> Vec<EventCount> {
        (0..n)
            .map(|i| EventCount {
                event: format!("event_{}", i),
                count: if i < rare { 2 } else { 100 },
            })
            .collect()
    }

    /// **Scenario**: 30 events with 10 rare ones render 21 entries (20 kept + "All Events").
    #[test]
    fn thirty_events_ten_rare_render_twenty_one() {
        let events = events(30, 10);
        assert_eq!(prompt_event_names(&events).len(), 21);
        let xml = render_events_prompt(&events);
        assert_eq!(xml.matches("<event>").count(), 21);
        assert!(xml.starts_with("<defined_events><event><name>All Events</name>"));
        assert!(!xml.contains("<name>event_0</name>"));
        assert!(xml.contains("<name>event_10</name>"));
    }

    /// **Scenario**: At or below 25 events nothing is elided, even rare ones.
    #[test]
    fn small_taxonomy_keeps_rare_events() {
        let events = events(25, 25);
        assert_eq!(prompt_event_names(&events).len(), 26);
    }

    /// **Scenario**: Core events get "label. description" without line breaks; system and ignored events get no description.
    #[test]
    fn core_definitions_add_descriptions() {
        let events = vec![
            EventCount { event: "$pageview".into(), count: 10 },
            EventCount { event: "$create_alias".into(), count: 10 },
            EventCount { event: "$feature_flag_called".into(), count: 10 },
            EventCount { event: "$opt_in".into(), count: 10 },
        ];
        let xml = render_events_prompt(&events);
        assert!(xml.contains(
            "<event><name>$pageview</name><description>Pageview. When a user loads (or reloads) a page.</description></event>"
        ));
        assert!(xml.contains("Alias. An alias ID has been added to a user. This event"));
        assert!(xml.contains("<event><name>$feature_flag_called</name></event>"));
        assert!(xml.contains("<event><name>$opt_in</name></event>"));
    }

    /// **Scenario**: Event names are XML-escaped.
    #[test]
    fn event_names_are_escaped() {
        let xml = render_events_prompt(&[EventCount { event: "a<b&c".into(), count: 5 }]);
        assert!(xml.contains("<name>a&lt;b&amp;c</name>"));
    }
}
