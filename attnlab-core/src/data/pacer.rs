//! Request pacing.
//!
//! The source rate-limits bursts, so the pipeline pauses before each batch
//! request and again before each new window. Pacing lives behind a trait so
//! tests and offline sources can skip the sleeps.

use std::thread;
use std::time::Duration;

use rand::Rng;

/// Where in the fetch loop a pause is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    /// Before a batch request inside a window.
    Batch,
    /// Before moving on to the next window.
    Window,
    /// Before a benchmark-selection probe request.
    Probe,
}

pub trait Pacer: Send + Sync {
    fn pause(&self, site: CallSite);
}

/// Never sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacer;

impl Pacer for NoPacer {
    fn pause(&self, _site: CallSite) {}
}

/// Half-open range of pause lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl PauseRange {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    fn sample(&self, rng: &mut impl Rng) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs_f64(self.min_secs.max(0.0));
        }
        Duration::from_secs_f64(rng.gen_range(self.min_secs..self.max_secs))
    }
}

/// Sleeps for a uniformly random duration at every call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomPacer {
    pub batch: PauseRange,
    pub window: PauseRange,
    pub probe: PauseRange,
}

impl Default for RandomPacer {
    fn default() -> Self {
        Self {
            batch: PauseRange::new(2.0, 6.0),
            window: PauseRange::new(2.0, 8.0),
            probe: PauseRange::new(2.0, 6.0),
        }
    }
}

impl RandomPacer {
    pub fn range_for(&self, site: CallSite) -> PauseRange {
        match site {
            CallSite::Batch => self.batch,
            CallSite::Window => self.window,
            CallSite::Probe => self.probe,
        }
    }

    /// Draw the pause length for `site` without sleeping.
    pub fn draw(&self, site: CallSite) -> Duration {
        self.range_for(site).sample(&mut rand::thread_rng())
    }
}

impl Pacer for RandomPacer {
    fn pause(&self, site: CallSite) {
        let delay = self.draw(site);
        tracing::debug!(?site, delay_ms = delay.as_millis() as u64, "pacing request");
        thread::sleep(delay);
    }
}
