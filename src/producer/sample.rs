//! Sample data generator
//!
//! Emits `data` events carrying one of a few synthetic payloads (metrics, log
//! lines, alerts) at random intervals.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use super::{EventSource, ProducerContext};
use crate::registry::{Event, TOPIC_DATA};

const SEVERITIES: [&str; 3] = ["low", "medium", "high"];

/// Source of synthetic `data` events
#[derive(Debug)]
pub struct SampleSource {
    rng: StdRng,
    min_delay: Duration,
    max_delay: Duration,
}

impl SampleSource {
    /// Create a source waiting a random time within `delay` between events
    pub fn new(delay: RangeInclusive<Duration>) -> Self {
        Self::with_rng(delay, StdRng::from_entropy())
    }

    /// Create a source with a fixed seed, for reproducible output
    pub fn seeded(delay: RangeInclusive<Duration>, seed: u64) -> Self {
        Self::with_rng(delay, StdRng::seed_from_u64(seed))
    }

    fn with_rng(delay: RangeInclusive<Duration>, rng: StdRng) -> Self {
        let (a, b) = delay.into_inner();
        Self {
            rng,
            min_delay: a.min(b),
            max_delay: a.max(b),
        }
    }

    fn sample_payload(&mut self) -> Value {
        match self.rng.gen_range(0..4) {
            0 => json!({
                "type": "metric",
                "name": "cpu_usage",
                "value": self.rng.gen_range(0.0..100.0),
            }),
            1 => json!({
                "type": "metric",
                "name": "memory_usage",
                "value": self.rng.gen_range(0.0..100.0),
            }),
            2 => json!({
                "type": "log",
                "level": "INFO",
                "message": format!("Process {}", uuid::Uuid::new_v4()),
            }),
            _ => json!({
                "type": "alert",
                "severity": SEVERITIES[self.rng.gen_range(0..SEVERITIES.len())],
            }),
        }
    }
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(500)..=Duration::from_millis(2000))
    }
}

impl EventSource for SampleSource {
    fn name(&self) -> &'static str {
        "sample"
    }

    fn next_event(&mut self, ctx: &ProducerContext) -> Event {
        let payload = self.sample_payload();
        Event::from_json(TOPIC_DATA, payload).with_retry_hint(ctx.retry_hint)
    }

    fn next_delay(&mut self) -> Duration {
        let secs = self
            .rng
            .gen_range(self.min_delay.as_secs_f64()..=self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}
