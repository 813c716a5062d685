//! Bounded-concurrency task pipeline with ordered output.
//!
//! Tasks are admitted in submission order once their weight fits the
//! semaphore budget, run concurrently on the blocking pool, and hand their
//! output sinks down a chain of oneshot channels. A task's first access to
//! its `Reporter` blocks until the predecessor has passed the baton, so
//! writes appear strictly in submission order no matter when tasks finish.
//! A weight outside `[0, max]` makes the task exclusive.

use std::io::{self, Write};
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{oneshot, Semaphore};

use crate::errors::print_error;

struct ReporterState {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    exit_code: i32,
}

/// Per-task handle to the shared output sinks and sticky exit code.
pub struct Reporter {
    prev: Option<oneshot::Receiver<ReporterState>>,
    state: Option<ReporterState>,
}

impl Reporter {
    fn state(&mut self) -> &mut ReporterState {
        if self.state.is_none() {
            // First access: wait for the predecessor to finish reporting.
            let rx = self.prev.take().expect("reporter state requested twice");
            let state = rx
                .blocking_recv()
                .expect("predecessor dropped the reporter chain");
            self.state = Some(state);
        }
        self.state.as_mut().expect("state just installed")
    }

    /// The exit code as of this task's slot in the pipeline.
    pub fn exit_code(&mut self) -> i32 {
        self.state().exit_code
    }

    /// Prints `err` to the error sink (one line per diagnostic for error
    /// lists) and marks the run failed.
    pub fn report(&mut self, err: &anyhow::Error) {
        let state = self.state();
        let _ = print_error(&mut state.err, err);
        state.exit_code = 2;
    }
}

impl Write for Reporter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state().out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state().out.flush()
    }
}

pub struct Sequencer {
    max_weight: u32,
    sem: Arc<Semaphore>,
    prev: oneshot::Receiver<ReporterState>,
    runtime: Runtime,
}

impl Sequencer {
    /// Creates a sequencer with a concurrency budget of `max_weight` and the
    /// given output and error sinks.
    pub fn new(
        max_weight: i64,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Result<Sequencer> {
        let runtime = Builder::new_multi_thread().build()?;
        let max_weight = max_weight.clamp(1, u32::MAX as i64) as u32;
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(ReporterState { out, err, exit_code: 0 });
        Ok(Sequencer {
            max_weight,
            sem: Arc::new(Semaphore::new(max_weight as usize)),
            prev: rx,
            runtime,
        })
    }

    /// Schedules `f`. The call blocks until `weight` permits are free, so
    /// admission is first-come-first-served; negative or over-budget
    /// weights claim the whole budget and run exclusively.
    pub fn add<F>(&mut self, weight: i64, f: F)
    where
        F: FnOnce(&mut Reporter) -> Result<()> + Send + 'static,
    {
        let weight = if weight < 0 || weight > i64::from(self.max_weight) {
            self.max_weight
        } else {
            weight as u32
        };
        let permit = self
            .runtime
            .block_on(self.sem.clone().acquire_many_owned(weight));

        let (tx, rx) = oneshot::channel();
        let prev = std::mem::replace(&mut self.prev, rx);
        self.runtime.spawn_blocking(move || {
            let mut reporter = Reporter { prev: Some(prev), state: None };
            match permit {
                Ok(_permit) => {
                    if let Err(err) = f(&mut reporter) {
                        reporter.report(&err);
                    }
                }
                Err(err) => reporter.report(&anyhow::Error::new(err)),
            }
            // Force the baton into our hands so it always moves on, even if
            // the task never touched its reporter.
            let _ = reporter.exit_code();
            let state = reporter.state.take().expect("state resolved above");
            // The receiver may be gone if the sequencer was dropped.
            let _ = tx.send(state);
        });
    }

    /// Enqueues an error into the pipeline at the current position.
    pub fn add_report(&mut self, err: anyhow::Error) {
        self.add(0, move |r| {
            r.report(&err);
            Ok(())
        });
    }

    /// Waits for all previously added tasks and returns the final exit
    /// code: 2 if any task reported an error, 0 otherwise.
    pub fn get_exit_code(&mut self) -> i32 {
        let (tx, rx) = mpsc::sync_channel(1);
        self.add(0, move |r| {
            let _ = tx.send(r.exit_code());
            Ok(())
        });
        rx.recv().unwrap_or(2)
    }
}
