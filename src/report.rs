use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{EventCategory, TimelineResult, Urgency};

/// Renders a computed result as a markdown briefing.
pub fn build_report(result: &TimelineResult, reference_date: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Immigration Timeline Report");
    let _ = writeln!(
        output,
        "Generated for a {} holder (as of {})",
        result.current_status.visa, reference_date
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Current Status");
    let _ = writeln!(output, "- Visa: {}", result.current_status.visa);
    let _ = writeln!(
        output,
        "- Work authorization: {}",
        result.current_status.work_auth
    );
    match (
        &result.current_status.next_deadline,
        result.current_status.days_until_next_deadline,
    ) {
        (Some(title), Some(days)) => {
            let _ = writeln!(output, "- Next up: {title} in {days} days");
        }
        _ => {
            let _ = writeln!(output, "- No upcoming deadlines");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Alerts");
    if result.risk_alerts.is_empty() {
        let _ = writeln!(output, "No risks detected for this profile.");
    } else {
        for alert in &result.risk_alerts {
            let _ = writeln!(
                output,
                "- [{}] {}",
                alert.severity.label().to_uppercase(),
                alert.message
            );
            if let Some(recommendation) = &alert.recommendation {
                let _ = writeln!(output, "  - Recommended: {recommendation}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Deadlines");
    let upcoming: Vec<_> = result
        .timeline_events
        .iter()
        .filter(|e| !e.is_past && e.category == EventCategory::Deadline)
        .collect();
    if upcoming.is_empty() {
        let _ = writeln!(output, "No upcoming deadlines in this timeline.");
    } else {
        for event in upcoming {
            let _ = writeln!(
                output,
                "- {} — {} ({})",
                event.date,
                event.title,
                urgency_label(event.urgency)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Full Timeline");
    for event in &result.timeline_events {
        let marker = if event.is_past { "x" } else { " " };
        let _ = writeln!(output, "- [{marker}] {} — {}", event.date, event.title);
        let _ = writeln!(output, "  {}", event.description);
        for item in &event.action_items {
            let _ = writeln!(output, "  - {item}");
        }
    }

    output
}

fn urgency_label(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Critical => "critical",
        Urgency::High => "high",
        Urgency::Medium => "medium",
        Urgency::Low => "low",
        Urgency::None => "informational",
        Urgency::Passed => "passed",
    }
}
