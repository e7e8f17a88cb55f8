//! The directory polling driver.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use classcast_core::{DispatchContext, DispatchError};
use tracing::{error, info, warn};

use crate::spool::FsSpool;

/// Tuning for the polling loop.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between scans.
    pub interval: Duration,
    /// Failed attempts per file before it is quarantined.
    pub max_failures: u32,
    /// Delete inputs after success instead of moving them to the output dir.
    pub delete_input: bool,
    /// Pretty-print result JSON.
    pub pretty: bool,
    /// Exit once the input backlog is drained.
    pub drain: bool,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_failures: 3,
            delete_input: false,
            pretty: false,
            drain: false,
        }
    }
}

/// What one tick did, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub processed: usize,
    pub failed: usize,
    pub quarantined: usize,
}

/// Watches an input directory and classifies every image that settles
/// there.
///
/// Files are processed one at a time. A failed file stays in the input
/// directory and is retried on later ticks until it exhausts its attempts
/// and is quarantined; no per-item error ends the loop.
pub struct PollDriver<'a> {
    ctx: &'a DispatchContext,
    spool: FsSpool,
    options: PollOptions,
}

impl<'a> PollDriver<'a> {
    #[must_use]
    pub fn new(ctx: &'a DispatchContext, spool: FsSpool, options: PollOptions) -> Self {
        Self {
            ctx,
            spool,
            options,
        }
    }

    /// Runs the polling loop.
    ///
    /// Returns only in drain mode, once nothing is left to defer, retry, or
    /// process.
    pub fn run(&mut self) {
        info!(
            "Watching {} every {:.1}s (results to {})",
            self.spool.input_dir().display(),
            self.options.interval.as_secs_f64(),
            self.spool.output_dir().display()
        );

        loop {
            let report = self.tick();
            if report.processed > 0 || report.quarantined > 0 {
                info!(
                    "Tick done: {} processed, {} failed, {} quarantined",
                    report.processed, report.failed, report.quarantined
                );
            }
            if self.options.drain && !self.spool.has_work() {
                info!("Input directory drained");
                return;
            }
            thread::sleep(self.options.interval);
        }
    }

    /// One scan-and-process pass over the input directory.
    ///
    /// A failed scan (say, the input directory got unmounted) is logged and
    /// produces an empty tick; the directory may well be back next time.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let ready = match self.spool.scan() {
            Ok(ready) => ready,
            Err(e) => {
                warn!("Scan failed: {e:#}");
                return report;
            }
        };

        for path in ready {
            match self.process(&path) {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    let failures = self.spool.record_failure(&path);
                    let err = DispatchError::transient(path.display().to_string(), e);
                    if failures >= self.options.max_failures {
                        report.quarantined += 1;
                        match self.spool.quarantine(&path) {
                            Ok(target) => error!(
                                "{err}; giving up after {failures} attempts, moved to {}",
                                target.display()
                            ),
                            Err(move_err) => error!(
                                "{err}; giving up after {failures} attempts, \
                                 quarantine failed: {move_err:#}"
                            ),
                        }
                    } else {
                        report.failed += 1;
                        warn!("{err}; attempt {failures}/{}", self.options.max_failures);
                    }
                }
            }
        }

        report
    }

    fn process(&mut self, path: &Path) -> Result<()> {
        let prediction = self.ctx.predict_path(path)?;
        let json = prediction.to_json(self.options.pretty)?;
        let result_path = self.spool.write_result(path, &json)?;
        self.spool.retire(path, self.options.delete_input)?;

        if let Some((label, score)) = prediction.best() {
            info!(
                "{} -> {} (best: {label} {score:.3})",
                path.display(),
                result_path.display()
            );
        }
        Ok(())
    }
}
