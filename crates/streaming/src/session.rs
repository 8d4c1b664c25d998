use std::sync::Arc;

use crate::config::{EngineConfig, WorldConfig};
use crate::driver::{FrameDriver, FrameReport};
use crate::error::ConfigError;
use crate::fetch::{AssetFetcher, FetchCompletion, FetchPool};

/// A [`FrameDriver`] wired to a [`FetchPool`].
///
/// All engine mutation happens on the task that owns the session; workers
/// only run fetches. Dispatched jobs are forwarded to the pool after every
/// operation that can dispatch, and completions are applied one at a time.
pub struct StreamingSession<F: AssetFetcher> {
    driver: FrameDriver<F::Asset>,
    pool: FetchPool<F::Asset>,
}

impl<F: AssetFetcher> StreamingSession<F> {
    /// Must be called inside a tokio runtime.
    pub fn new(
        fetcher: Arc<F>,
        world: WorldConfig,
        config: EngineConfig,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Result<Self, ConfigError> {
        let workers = config.max_inflight;
        let driver = FrameDriver::new(world, config, viewport_width, viewport_height)?;
        let mut session = Self {
            driver,
            pool: FetchPool::spawn(fetcher, workers),
        };
        session.submit_dispatched();
        Ok(session)
    }

    pub fn driver(&self) -> &FrameDriver<F::Asset> {
        &self.driver
    }

    /// Input events (pan, zoom, resize) go through here. Jobs they cause are
    /// submitted on the next tick.
    pub fn driver_mut(&mut self) -> &mut FrameDriver<F::Asset> {
        &mut self.driver
    }

    /// No fetch is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.driver.queue().inflight() == 0 && self.driver.queue().queued() == 0
    }

    /// Applies every completion that has already arrived. Returns how many.
    pub fn pump_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(done) = self.pool.try_completion() {
            self.apply(done);
            applied += 1;
        }
        applied
    }

    /// Waits for one completion and applies it. `false` if the workers are
    /// gone.
    pub async fn wait_for_completion(&mut self) -> bool {
        match self.pool.next_completion().await {
            Some(done) => {
                self.apply(done);
                true
            }
            None => false,
        }
    }

    /// Applies pending completions, then runs a frame if one was requested.
    pub fn tick(&mut self) -> Option<FrameReport<F::Asset>> {
        self.pump_completions();
        let report = self.driver.tick_if_needed();
        self.submit_dispatched();
        report
    }

    /// Like [`StreamingSession::tick`] but always runs the frame.
    pub fn force_tick(&mut self) -> FrameReport<F::Asset> {
        self.pump_completions();
        let report = self.driver.tick();
        self.submit_dispatched();
        report
    }

    pub fn force_load_all(&mut self) -> usize {
        let attempts = self.driver.force_load_all();
        self.submit_dispatched();
        attempts
    }

    fn apply(&mut self, done: FetchCompletion<F::Asset>) {
        self.driver.complete(&done.job, done.result);
        self.submit_dispatched();
    }

    fn submit_dispatched(&mut self) {
        loop {
            let jobs = self.driver.drain_dispatched();
            if jobs.is_empty() {
                break;
            }
            for job in jobs {
                // A closed pool fails the job at once; completing it may
                // dispatch more, hence the outer loop.
                if let Some(failed) = self.pool.submit(job) {
                    self.driver.complete(&failed.job, failed.result);
                }
            }
        }
    }
}
