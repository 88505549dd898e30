//! benchmark — run a body N times and emit one timing summary.
//!
//! Each cycle feeds the body a null sink (the body's rows are not the
//! point), measures wall-clock, and accumulates into per-statement
//! state. After the final cycle a single summary row comes out:
//! `{runs, total, mean, fastest, slowest}`.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use rill_types::{ExitStatus, Key, Record, Value};

use crate::channel::{OutChannel, SendError};
use crate::error::CommandError;

use super::command::{ExecContext, Wrapper, WrapperResource};

pub struct Benchmark {
    plan: Mutex<Plan>,
}

#[derive(Default)]
struct Plan {
    /// Cycles still to run. `None` until the first `before` parses args.
    remaining: Option<u64>,
    timings: Vec<Duration>,
    body_failed: bool,
}

/// Per-cycle resource: the running timer.
struct Cycle {
    started: Instant,
}

impl Benchmark {
    pub fn new() -> Benchmark {
        Benchmark {
            plan: Mutex::new(Plan::default()),
        }
    }

    fn plan(&self) -> std::sync::MutexGuard<'_, Plan> {
        self.plan.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Benchmark {
    fn default() -> Self {
        Benchmark::new()
    }
}

#[async_trait]
impl Wrapper for Benchmark {
    fn name(&self) -> &str {
        "benchmark"
    }

    async fn before(
        &self,
        args: &[String],
        _ctx: &ExecContext,
    ) -> Result<WrapperResource, CommandError> {
        let mut plan = self.plan();
        if plan.remaining.is_none() {
            let runs = match args.first() {
                Some(arg) => arg.parse::<u64>().map_err(|_| {
                    CommandError::msg(format!("benchmark: invalid run count '{arg}'"))
                })?,
                None => 1,
            };
            if runs == 0 {
                return Err(CommandError::msg("benchmark: run count must be at least 1"));
            }
            plan.remaining = Some(runs);
        }
        Ok(Box::new(Cycle {
            started: Instant::now(),
        }))
    }

    fn body_output(&self, _resource: &mut WrapperResource, out: &OutChannel) -> OutChannel {
        OutChannel::null(out.interrupt().clone())
    }

    async fn after(
        &self,
        resource: &mut WrapperResource,
        body_status: ExitStatus,
        output: &OutChannel,
        _errors: &OutChannel,
        _ctx: &ExecContext,
    ) -> Result<ExitStatus, CommandError> {
        let cycle = resource
            .downcast_ref::<Cycle>()
            .ok_or_else(|| CommandError::msg("benchmark: cycle resource missing"))?;
        let elapsed = cycle.started.elapsed();

        let summary = {
            let mut plan = self.plan();
            plan.timings.push(elapsed);
            if body_status.is_error() {
                plan.body_failed = true;
            }
            let remaining = plan.remaining.unwrap_or(0).saturating_sub(1);
            plan.remaining = Some(remaining);

            // Summary only once every requested cycle has run cleanly.
            (remaining == 0 && !plan.body_failed).then(|| summarize(&plan.timings))
        };

        if let Some(summary) = summary {
            match output.send(summary?).await {
                Ok(()) | Err(SendError::Closed) => {}
                Err(SendError::Interrupted) => return Err(CommandError::Interrupted),
            }
        }
        Ok(body_status)
    }

    fn retry(&self, _resource: &WrapperResource) -> bool {
        let plan = self.plan();
        !plan.body_failed && plan.remaining.unwrap_or(0) > 0
    }
}

fn summarize(timings: &[Duration]) -> Result<Record, CommandError> {
    let runs = timings.len() as u32;
    let total: Duration = timings.iter().sum();
    let mean = if runs > 0 { total / runs } else { Duration::ZERO };
    let fastest = timings.iter().min().copied().unwrap_or_default();
    let slowest = timings.iter().max().copied().unwrap_or_default();

    let mut record = Record::new();
    record.push(key("runs")?, Value::Numeric(i64::from(runs)))?;
    record.push(key("total")?, Value::Duration(total))?;
    record.push(key("mean")?, Value::Duration(mean))?;
    record.push(key("fastest")?, Value::Duration(fastest))?;
    record.push(key("slowest")?, Value::Duration(slowest))?;
    Ok(record)
}

fn key(name: &str) -> Result<Key, CommandError> {
    Key::new(name).map_err(|e| CommandError::Record(e.into()))
}
