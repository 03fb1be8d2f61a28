// Synthetic progress for requests that report none.
//
// The simulator only publishes numbers on a watch channel. It never
// reaches 100: completion is signalled by whoever owns the real request.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    /// Interval between increments.
    pub tick: Duration,
    /// Upper bound of a single random increment.
    pub max_step: f64,
    /// Value the simulation never exceeds.
    pub ceiling: f64,
    /// Fixed RNG seed for reproducible sequences.
    pub seed: Option<u64>,
}

impl Default for ProgressSimulator {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(200),
            max_step: 10.0,
            ceiling: 90.0,
            seed: None,
        }
    }
}

type SharedSender = Arc<Mutex<Option<watch::Sender<f64>>>>;

impl ProgressSimulator {
    /// Begin ticking from 0. Must be called inside a tokio runtime.
    pub fn start(&self) -> ProgressHandle {
        let (tx, rx) = watch::channel(0.0);
        let sender: SharedSender = Arc::new(Mutex::new(Some(tx)));
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let settings = self.clone();
        // A negative or NaN step would make the range empty; treat it as no movement.
        let max_step = if settings.max_step.is_finite() {
            settings.max_step.max(0.0)
        } else {
            0.0
        };
        let task_sender = sender.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + settings.tick, settings.tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut value = 0.0_f64;
            loop {
                ticker.tick().await;
                if value < settings.ceiling {
                    let step = rng.gen_range(0.0..=max_step);
                    value = (value + step).min(settings.ceiling);
                }
                let published = {
                    let guard = task_sender.lock().unwrap_or_else(PoisonError::into_inner);
                    match guard.as_ref() {
                        Some(tx) => {
                            tx.send_replace(value);
                            true
                        }
                        None => false,
                    }
                };
                if !published {
                    break;
                }
            }
        });

        log::debug!("Progress simulation started");
        ProgressHandle { rx, sender, task }
    }
}

/// A running simulation. Dropping the handle stops it too.
pub struct ProgressHandle {
    rx: watch::Receiver<f64>,
    sender: SharedSender,
    task: JoinHandle<()>,
}

impl ProgressHandle {
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.rx.clone()
    }

    pub fn current(&self) -> f64 {
        *self.rx.borrow()
    }

    /// Cancel ticking. Once this returns no value is published again, even
    /// if a tick was already due.
    pub fn stop(self) -> f64 {
        // Drop runs the actual teardown.
        self.current()
    }

    fn halt(&mut self) {
        // Ticks publish while holding this lock, so taking the sender here
        // excludes any in-flight emission.
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.task.abort();
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.halt();
        log::debug!("Progress simulation stopped at {:.1}", *self.rx.borrow());
    }
}
