// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::store::StoreError;

use super::cycle::PollCycle;
use super::{CycleContext, CycleId, CycleReport, RuntimeEvent, RuntimeOptions};

type CycleResult = (CycleId, std::result::Result<CycleReport, StoreError>);

/// Async shell that acts as the scheduler.
///
/// Each tick or run request starts a new [`PollCycle`] as its own task, so
/// cycles may overlap; the store's compare-and-set keeps that safe. On
/// shutdown no new cycles are started and in-flight ones are awaited.
pub struct Runtime {
    cycle: PollCycle,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    options: RuntimeOptions,
    next_cycle_id: CycleId,
    in_flight: JoinSet<CycleResult>,
    reports: Vec<CycleReport>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .field("next_cycle_id", &self.next_cycle_id)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(cycle: PollCycle, event_rx: mpsc::Receiver<RuntimeEvent>, options: RuntimeOptions) -> Self {
        Self {
            cycle,
            event_rx,
            options,
            next_cycle_id: 1,
            in_flight: JoinSet::new(),
            reports: Vec::new(),
        }
    }

    /// Main event loop. Returns the reports of every cycle that finished.
    pub async fn run(mut self) -> Result<Vec<CycleReport>> {
        info!("watchhook runtime started");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        info!("runtime event channel closed; exiting");
                        break;
                    };
                    debug!(?event, "runtime received event");

                    match event {
                        RuntimeEvent::Tick => self.start_cycle(false),
                        RuntimeEvent::RunRequested { force } => self.start_cycle(force),
                        RuntimeEvent::ShutdownRequested => {
                            info!(in_flight = self.in_flight.len(), "shutdown requested");
                            break;
                        }
                    }
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.record(joined);
                    if self.options.exit_when_idle && self.in_flight.is_empty() {
                        info!("no cycles in flight; exiting");
                        break;
                    }
                }
            }
        }

        while let Some(joined) = self.in_flight.join_next().await {
            self.record(joined);
        }

        info!(cycles = self.reports.len(), "runtime exiting");
        Ok(self.reports)
    }

    fn start_cycle(&mut self, force: bool) {
        let ctx = CycleContext::new(self.next_cycle_id, force);
        self.next_cycle_id += 1;

        debug!(cycle = ctx.cycle_id, force, in_flight = self.in_flight.len(), "starting poll cycle");

        let cycle = self.cycle.clone();
        self.in_flight.spawn(async move {
            let id = ctx.cycle_id;
            (id, cycle.run(ctx).await)
        });
    }

    fn record(&mut self, joined: std::result::Result<CycleResult, tokio::task::JoinError>) {
        match joined {
            Ok((_, Ok(report))) => self.reports.push(report),
            Ok((id, Err(e))) => {
                error!(cycle = id, error = %e, "poll cycle could not list watch entries");
            }
            Err(e) => {
                error!(error = %e, "poll cycle task aborted");
            }
        }
    }
}

/// Send a [`RuntimeEvent::Tick`] every `period` until the receiver is gone.
///
/// With `skip_first` the first tick fires one period from now instead of
/// immediately.
pub fn spawn_ticker(period: Duration, tx: mpsc::Sender<RuntimeEvent>, skip_first: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = if skip_first {
            Instant::now() + period
        } else {
            Instant::now()
        };
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if tx.send(RuntimeEvent::Tick).await.is_err() {
                debug!("runtime gone; ticker stopping");
                break;
            }
        }
    })
}
