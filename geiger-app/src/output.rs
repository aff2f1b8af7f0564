//! Event printing. stdout carries detection output only; logs go to stderr.

use std::io::{self, Write};

use geiger_core::{EventSink, PeakEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `time<TAB>amplitude`, time in seconds with four decimals.
    Text,
    /// One JSON object per line.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub fn format_event(event: &PeakEvent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{:.4}\t{:6}", event.time, event.amplitude),
        OutputFormat::Json => serde_json::to_string(event).unwrap_or_default(),
    }
}

/// Writes events as they arrive. The first write error is kept and further
/// output is skipped; callers check it with [`EventPrinter::finish`].
pub struct EventPrinter<W: Write> {
    out: W,
    format: OutputFormat,
    error: Option<io::Error>,
    printed: u64,
}

impl<W: Write> EventPrinter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            error: None,
            printed: 0,
        }
    }

    /// Flush and return the number of events printed.
    pub fn finish(mut self) -> io::Result<u64> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.printed)
    }
}

impl<W: Write> EventSink for EventPrinter<W> {
    fn on_event(&mut self, event: PeakEvent) {
        if self.error.is_some() {
            return;
        }
        let line = format_event(&event, self.format);
        match writeln!(self.out, "{line}") {
            Ok(()) => self.printed += 1,
            Err(e) => self.error = Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> PeakEvent {
        PeakEvent {
            time: 0.2,
            amplitude: 20,
            sample_index: 2,
        }
    }

    #[test]
    fn text_line_matches_column_layout() {
        assert_eq!(format_event(&event(), OutputFormat::Text), "0.2000\t    20");
        let negative = PeakEvent {
            time: 12.34567,
            amplitude: -1234,
            sample_index: 0,
        };
        assert_eq!(format_event(&negative, OutputFormat::Text), "12.3457\t -1234");
    }

    #[test]
    fn json_line_uses_camel_case() {
        let line = format_event(&event(), OutputFormat::Json);
        assert!(line.contains("\"sampleIndex\":2"), "{line}");
    }

    #[test]
    fn printer_counts_lines() {
        let mut buf = Vec::new();
        let mut printer = EventPrinter::new(&mut buf, OutputFormat::Text);
        printer.on_event(event());
        printer.on_event(event());
        assert_eq!(printer.finish().unwrap(), 2);
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 2);
    }
}
