use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ExportResult, ListResult, ProgressEvent, ProgressSink, RelinkReport, ValidateResult};
use crate::archive::{BulkReport, SingleReport};
use crate::patch::PatchReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Machine-readable reports on stdout. Progress events are dropped; the
/// report carries everything a caller needs.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_patch(reports: &[PatchReport]) -> io::Result<()> {
        Self::print_json(reports)
    }

    pub fn print_relink(report: &RelinkReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_validate(result: &ValidateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_bulk(report: &BulkReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_single(report: &SingleReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
