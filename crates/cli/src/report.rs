use std::fmt::Write;

use donor_sched::scenario::ThreadSnapshot;
use donor_sched::ScenarioReport;

fn priorities(threads: &[ThreadSnapshot]) -> String {
    threads
        .iter()
        .map(|t| {
            if t.effective == t.base {
                format!("{}={}", t.name, t.effective)
            } else {
                format!("{}={}(base {})", t.name, t.effective, t.base)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable report: one line per step, then final priorities and counters.
pub fn render_text(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let title = if report.name.is_empty() { "(unnamed)" } else { report.name.as_str() };
    let _ = writeln!(out, "scenario {title}: {} step(s)", report.steps.len());

    let width = report
        .steps
        .iter()
        .map(|s| s.description.len())
        .max()
        .unwrap_or(0);
    for step in &report.steps {
        let mut line = format!("{:>3}. {:<width$}  ", step.index, step.description);
        if let Some(selected) = &step.selected {
            let _ = write!(line, "-> {selected}  ");
        }
        if !step.applied {
            line.push_str("(saturated)  ");
        }
        line.push_str(&priorities(&step.threads));
        let _ = writeln!(out, "{}", line.trim_end());
    }

    let _ = writeln!(out, "final: {}", priorities(&report.threads));
    let m = &report.metrics;
    let _ = writeln!(
        out,
        "metrics: enqueues={} selections={} handoffs={} priority_changes={} \
         propagation_runs={} propagation_steps={} longest_propagation={}",
        m.enqueues,
        m.selections,
        m.handoffs,
        m.priority_changes,
        m.propagation_runs,
        m.propagation_steps,
        m.longest_propagation
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use donor_sched::Scenario;

    const SCENARIO: &str = r#"
name = "demo"

[[threads]]
name = "o"

[[threads]]
name = "w"
priority = 5

[[queues]]
name = "q"

[[steps]]
op = "acquire"
thread = "o"
queue = "q"

[[steps]]
op = "wait"
thread = "w"
queue = "q"

[[steps]]
op = "next"
queue = "q"
"#;

    #[test]
    fn text_report_lists_steps_and_donations() {
        let report = Scenario::from_toml(SCENARIO).unwrap().run().unwrap();
        let text = render_text(&report);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "scenario demo: 3 step(s)");
        assert!(lines[2].contains("w waits on q"), "{text}");
        assert!(lines[2].ends_with("o=5(base 1) w=5"), "{text}");
        assert!(lines[3].contains("-> w"), "{text}");
        assert_eq!(lines[4], "final: o=1 w=5");
        assert!(lines[5].starts_with("metrics: enqueues=1 selections=1 handoffs=1"), "{text}");
    }
}
