use shared_protocol::{SecurityEvent, Severity};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Plain-text security report: one row per event, then totals per severity.
pub fn render_report(events: &[SecurityEvent]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Security Events Report");
    let _ = writeln!(out, "{:<24} {:<9} {:<19} DETAILS", "TIMESTAMP", "SEVERITY", "EVENT TYPE");

    for ev in events {
        let details = ev
            .details
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            out,
            "{:<24} {:<9} {:<19} {}",
            ev.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            ev.severity.as_str(),
            ev.event_type.as_str(),
            details
        );
    }

    let totals = severity_totals(events);
    let summary = totals
        .iter()
        .rev()
        .map(|(sev, n)| format!("{sev}: {n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "Report contains {} events ({summary})", events.len());
    out
}

pub fn severity_totals(events: &[SecurityEvent]) -> BTreeMap<Severity, usize> {
    let mut totals = BTreeMap::new();
    for ev in events {
        *totals.entry(ev.severity).or_insert(0) += 1;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_protocol::EventType;

    #[test]
    fn renders_rows_and_totals() {
        let events = vec![
            SecurityEvent::new(EventType::CommandExecuted, Severity::Info).with_detail("command", "PING"),
            SecurityEvent::new(EventType::SecurityViolation, Severity::Critical)
                .with_detail("reason", "INVALID_SIGNATURE"),
            SecurityEvent::new(EventType::PacketRejected, Severity::High).with_detail("reason", "PACKET_TOO_SHORT"),
        ];
        let text = render_report(&events);

        assert!(text.contains("COMMAND_EXECUTED"));
        assert!(text.contains("command=PING"));
        assert!(text.contains("reason=INVALID_SIGNATURE"));
        assert!(text.contains("Report contains 3 events (CRITICAL: 1, HIGH: 1, INFO: 1)"));
    }

    #[test]
    fn empty_report() {
        let text = render_report(&[]);
        assert!(text.contains("Report contains 0 events ()"));
        assert!(severity_totals(&[]).is_empty());
    }
}
