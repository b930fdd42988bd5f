use crate::metrics::StatsSnapshot;

use super::STOP_MARKER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Header,
    Good,
    Bad,
}

/// One summary line plus how it should be emphasised on a terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub tone: Tone,
}

impl Line {
    const fn plain(text: String) -> Self {
        Self {
            text,
            tone: Tone::Plain,
        }
    }

    const fn header(text: String) -> Self {
        Self {
            text,
            tone: Tone::Header,
        }
    }
}

/// Render a x100 fixed-point value with two decimals.
#[must_use]
pub fn fixed_x100(value: u64) -> String {
    format!("{}.{:02}", value / 100, value % 100)
}

fn endpoint_row(
    method: &str,
    name: &str,
    counts: (u64, u64),
    latencies: [u64; 6],
) -> String {
    let [avg, min, max, p50, p90, p99] = latencies;
    format!(
        "{:<6} {:<42} {:>8} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
        method, name, counts.0, counts.1, avg, min, max, p50, p90, p99
    )
}

/// The stop summary: aggregate counters first, then per-endpoint rows and
/// grouped failures.
#[must_use]
pub fn summary_lines(snapshot: &StatsSnapshot) -> Vec<Line> {
    let mut lines = vec![
        Line::plain(STOP_MARKER.to_owned()),
        Line::plain(format!("Total requests: {}", snapshot.total_requests)),
        Line {
            text: format!("Failed requests: {}", snapshot.total_failures),
            tone: if snapshot.total_failures > 0 {
                Tone::Bad
            } else {
                Tone::Good
            },
        },
        Line::plain(format!(
            "Average response time: {}ms",
            snapshot.avg_response_ms
        )),
        Line::plain(format!("RPS: {}", fixed_x100(snapshot.current_rps_x100))),
    ];

    if snapshot.endpoints.is_empty() {
        return lines;
    }

    lines.push(Line::plain(String::new()));
    lines.push(Line::header(format!(
        "{:<6} {:<42} {:>8} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "Type", "Name", "Reqs", "Fails", "Avg", "Min", "Max", "P50", "P90", "P99"
    )));
    for endpoint in &snapshot.endpoints {
        let text = endpoint_row(
            endpoint.method.as_str(),
            &endpoint.name,
            (endpoint.requests, endpoint.failures),
            [
                endpoint.avg_response_ms,
                endpoint.min_response_ms,
                endpoint.max_response_ms,
                endpoint.p50_ms,
                endpoint.p90_ms,
                endpoint.p99_ms,
            ],
        );
        let tone = if endpoint.failures > 0 {
            Tone::Bad
        } else {
            Tone::Plain
        };
        lines.push(Line { text, tone });
    }
    lines.push(Line::plain(endpoint_row(
        "",
        "Aggregated",
        (snapshot.total_requests, snapshot.total_failures),
        [
            snapshot.avg_response_ms,
            snapshot.min_response_ms,
            snapshot.max_response_ms,
            snapshot.p50_ms,
            snapshot.p90_ms,
            snapshot.p99_ms,
        ],
    )));

    if !snapshot.failures.is_empty() {
        lines.push(Line::plain(String::new()));
        lines.push(Line::header(format!(
            "{:>11}  {}",
            "Occurrences", "Error"
        )));
        for failure in &snapshot.failures {
            lines.push(Line {
                text: format!(
                    "{:>11}  {} {}: {}",
                    failure.occurrences, failure.method, failure.name, failure.reason
                ),
                tone: Tone::Bad,
            });
        }
    }
    lines
}
