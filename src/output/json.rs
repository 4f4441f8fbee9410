//! JSON output formatter for machine processing

use crate::output::OutputFormatter;
use crate::pipeline::{PullReport, PushOutcome, PushReport};
use crate::repository::LocalRepository;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct JsonPushSummary {
    applied: usize,
    skipped: usize,
    invalid: usize,
    failed: usize,
}

#[derive(Serialize)]
struct JsonPushOutput<'a> {
    command: &'static str,
    summary: JsonPushSummary,
    #[serde(flatten)]
    report: &'a PushReport,
}

#[derive(Serialize)]
struct JsonPullOutput<'a> {
    command: &'static str,
    #[serde(flatten)]
    report: &'a PullReport,
}

fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(std::io::Error::other)?;
    writeln!(writer)
}

impl OutputFormatter for JsonFormatter {
    fn format_push(&self, report: &PushReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonPushOutput {
            command: "push",
            summary: JsonPushSummary {
                applied: report.count(PushOutcome::Applied),
                skipped: report.count(PushOutcome::Skipped),
                invalid: report.count(PushOutcome::Invalid),
                failed: report.count(PushOutcome::Failed),
            },
            report,
        };
        write_json(&output, writer)
    }

    fn format_pull(&self, report: &PullReport, writer: &mut dyn Write) -> std::io::Result<()> {
        write_json(
            &JsonPullOutput {
                command: "pull",
                report,
            },
            writer,
        )
    }

    fn format_repositories(
        &self,
        repositories: &[LocalRepository],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        write_json(&repositories, writer)
    }
}
