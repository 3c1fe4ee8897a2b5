//! Single-threaded service loop.
//!
//! Each iteration reads at most one chunk from the link, frames it, and
//! fully processes every complete line in arrival order before the next
//! read. Link trouble never ends the loop; only a stop request, the end of
//! a finite stream, or the record limit does.

use std::fmt;

use irrigation_traits::Connector;

use crate::config::LinkCfg;
use crate::controller::Controller;
use crate::error::LinkError;
use crate::framer::LineFramer;
use crate::link::LinkManager;
use crate::stop::StopSignal;

const READ_CHUNK: usize = 256;

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitReason {
    #[default]
    Stopped,
    EndOfStream,
    RecordLimit,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Stopped => "stopped",
            ExitReason::EndOfStream => "end_of_stream",
            ExitReason::RecordLimit => "record_limit",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Complete lines produced by the framer.
    pub lines: u64,
    /// Lines that parsed into a reading.
    pub records: u64,
    /// Lines dropped by the prefilter or parser.
    pub dropped: u64,
    pub commands_written: u64,
    pub write_failures: u64,
    pub link_failures: u64,
    pub reconnects: u64,
    pub framing_overflows: u64,
    pub exit: ExitReason,
}

pub struct Service<C: Connector> {
    link: LinkManager<C>,
    framer: LineFramer,
    controller: Controller,
    stop: StopSignal,
    max_records: Option<u64>,
    on_command: Option<Box<dyn FnMut(&str)>>,
}

impl<C: Connector> Service<C> {
    pub fn new(link: LinkManager<C>, cfg: &LinkCfg, controller: Controller, stop: StopSignal) -> Self {
        Self {
            link,
            framer: LineFramer::new(cfg.max_line_bytes),
            controller,
            stop,
            max_records: None,
            on_command: None,
        }
    }

    /// Return after this many parsed records.
    pub fn with_max_records(mut self, limit: Option<u64>) -> Self {
        self.max_records = limit;
        self
    }

    /// Observe every command line that was written successfully.
    pub fn on_command(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_command = Some(Box::new(f));
        self
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Run until stopped. The link is closed on every exit path.
    pub fn run(mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut buf = [0u8; READ_CHUNK];
        tracing::info!(endpoint = %self.link.endpoint(), "service loop starting");

        summary.exit = loop {
            if self.stop.is_stopped() {
                break ExitReason::Stopped;
            }

            match self.link.ensure_connected() {
                Ok(()) => {}
                Err(LinkError::BackingOff { remaining }) => {
                    if self.stop.wait(remaining) {
                        break ExitReason::Stopped;
                    }
                    continue;
                }
                Err(e) if e.is_terminal() => break ExitReason::EndOfStream,
                Err(e) => {
                    tracing::warn!(error = %e, "could not open link");
                    continue;
                }
            }

            let n = match self.link.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => n,
                Err(e) if e.is_terminal() => {
                    tracing::info!("link reached end of stream");
                    break ExitReason::EndOfStream;
                }
                Err(_) => continue,
            };

            let mut limit_hit = false;
            for item in self.framer.feed(&buf[..n]) {
                let line = match item {
                    Ok(line) => line,
                    Err(e) => {
                        summary.framing_overflows += 1;
                        tracing::warn!(error = %e, "framing overflow");
                        continue;
                    }
                };
                summary.lines += 1;
                let Some(cycle) = self.controller.process_line(&line) else {
                    summary.dropped += 1;
                    continue;
                };
                summary.records += 1;

                let wire = cycle.command.to_line();
                match self.link.write(wire.as_bytes()) {
                    Ok(()) => {
                        summary.commands_written += 1;
                        tracing::debug!(
                            command = wire.trim_end(),
                            soil_avg = cycle.reading.soil_avg(),
                            "command sent"
                        );
                        if let Some(f) = self.on_command.as_mut() {
                            f(&wire);
                        }
                    }
                    Err(e) => {
                        summary.write_failures += 1;
                        tracing::warn!(
                            error = %e,
                            command = wire.trim_end(),
                            "command not delivered"
                        );
                    }
                }

                if self.max_records.is_some_and(|max| summary.records >= max) {
                    limit_hit = true;
                    break;
                }
            }
            if limit_hit {
                break ExitReason::RecordLimit;
            }
        };

        self.link.close();
        summary.link_failures = self.link.failures();
        summary.reconnects = self.link.reconnects();
        tracing::info!(
            exit = %summary.exit,
            lines = summary.lines,
            records = summary.records,
            dropped = summary.dropped,
            commands = summary.commands_written,
            write_failures = summary.write_failures,
            reconnects = summary.reconnects,
            overflows = summary.framing_overflows,
            "service loop finished"
        );
        summary
    }
}
