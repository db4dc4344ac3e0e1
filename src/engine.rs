//! Tick-driven engine sequencing sampling, aggregation, persistence and
//! delivery.
//!
//! Single cooperative task, no shared state: the engine exclusively owns
//! the channels, scheduler, link, sink and delivery agent. Every operation
//! is a sequential await, so one flush cycle runs to completion before the
//! next tick is processed.

use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::channel::{Aggregate, Channel};
use crate::delivery::{DeliveryAgent, DeliveryOutcome};
use crate::link::NetworkLink;
use crate::scheduler::Scheduler;
use crate::sink::{RecordSink, Row};

/// Owns all channels and drives the sample/flush cycle.
pub struct Engine {
    channels: Vec<Channel>,
    scheduler: Scheduler,
    link: Box<dyn NetworkLink>,
    sink: Box<dyn RecordSink>,
    agent: DeliveryAgent,
    tick_period: Duration,
}

impl Engine {
    pub fn new(
        channels: Vec<Channel>,
        scheduler: Scheduler,
        link: Box<dyn NetworkLink>,
        sink: Box<dyn RecordSink>,
        agent: DeliveryAgent,
        tick_period: Duration,
    ) -> Self {
        Self {
            channels,
            scheduler,
            link,
            sink,
            agent,
            tick_period,
        }
    }

    /// Drive the tick loop until the surrounding task is cancelled.
    pub async fn run(&mut self) {
        let mut ticker = interval(self.tick_period);
        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.tick(Instant::now()).await;
        }
    }

    /// Process one tick.
    ///
    /// Sampling runs before flushing, so a reading taken on the same tick
    /// is included in the flushed window.
    pub async fn tick(&mut self, now: Instant) {
        let events = self.scheduler.tick(now);

        if events.sample_due {
            self.sample_all().await;
        }
        if events.flush_due {
            self.flush_all().await;
        }
    }

    /// Sample every channel. One failing sensor never blocks the others.
    async fn sample_all(&mut self) {
        for channel in &mut self.channels {
            let pin = channel.pin();
            match channel.sample().await {
                Ok(reading) => {
                    debug!(%pin, temperature = reading.degrees(), "reading recorded");
                }
                Err(e) => {
                    warn!(%pin, error = %e, "reading discarded");
                }
            }
        }
    }

    /// Run one flush cycle: aggregate every channel, persist the row, then
    /// deliver each non-empty aggregate.
    ///
    /// Persistence happens before delivery, so a delivery failure never
    /// loses the local record.
    async fn flush_all(&mut self) {
        // One timestamp for the whole cycle; 0 when the link is down and
        // no synchronized clock can be assumed.
        let value_date = if self.link.is_connected() {
            Utc::now().timestamp_millis().max(0) as u64
        } else {
            0
        };

        let mut aggregates: Vec<Aggregate> = Vec::with_capacity(self.channels.len());
        for channel in &mut self.channels {
            let aggregate = channel.take_aggregate();
            match aggregate.mean {
                Some(mean) => {
                    info!(
                        pin = %channel.pin(),
                        mean,
                        samples = aggregate.sample_count,
                        "window aggregated"
                    );
                }
                None => {
                    info!(pin = %channel.pin(), "no new readings since last flush");
                }
            }
            aggregates.push(aggregate);
        }

        let row = Row::new(
            Local::now().naive_local(),
            aggregates.iter().map(|a| a.mean).collect(),
        );
        match self.sink.append_row(&row) {
            Ok(()) => debug!("row persisted"),
            Err(e) => warn!(error = %e, "failed to persist row, aggregate lost from local log"),
        }

        for (channel, aggregate) in self.channels.iter().zip(&aggregates) {
            // Channels with no new readings are not delivered
            let Some(mean) = aggregate.mean else {
                continue;
            };

            let outcome = self
                .agent
                .deliver(channel.remote_id(), mean, value_date, self.link.as_mut())
                .await;

            match outcome {
                DeliveryOutcome::Delivered { attempts } => {
                    debug!(pin = %channel.pin(), attempts, "delivery complete");
                }
                DeliveryOutcome::ExhaustedRetries { attempts } => {
                    warn!(pin = %channel.pin(), attempts, "delivery failed this cycle");
                }
                DeliveryOutcome::SkippedNoRemoteId | DeliveryOutcome::SkippedNoEndpoint => {
                    debug!(pin = %channel.pin(), "aggregate kept local only");
                }
            }
        }
    }
}
