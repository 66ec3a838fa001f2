use std::time::Duration;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::hop::HopVerdict;
use crate::trace::{HopRecord, TraceOutcome};

pub fn verdict_label(verdict: &HopVerdict) -> &'static str {
    match verdict {
        HopVerdict::EchoReply => "Reached",
        HopVerdict::TimeExceeded => "TTLExc at",
        HopVerdict::Error(_) => "ERROR",
    }
}

pub fn format_durations(durations: &[Duration]) -> String {
    let parts: Vec<String> = durations.iter().map(|d| format!("{d:.2?}")).collect();
    format!("[{}]", parts.join(" "))
}

/// One output line per hop.
pub fn hop_line(record: &HopRecord) -> String {
    let result = &record.result;
    match &result.verdict {
        HopVerdict::Error(cause) => format!("{:3} ERROR  ({})", result.hop_limit, cause),
        verdict => format!(
            "{:3} {:>13}  {:>9}  {}",
            result.hop_limit,
            format_durations(&result.durations),
            verdict_label(verdict),
            record.presented
        ),
    }
}

/// Table of every hop, printed after the trace when requested.
pub fn summary_table(outcome: &TraceOutcome) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Hop", "Status", "Responders", "RTT"]);

    for record in &outcome.hops {
        let result = &record.result;
        let responders = match &result.verdict {
            HopVerdict::Error(cause) => cause.to_string(),
            _ => record.presented.clone(),
        };
        table.add_row(vec![
            result.hop_limit.to_string(),
            verdict_label(&result.verdict).to_string(),
            responders,
            format_durations(&result.durations),
        ]);
    }
    table
}
