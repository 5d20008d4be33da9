//! Request and error counters for the control link.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of request counters for a running [ControlLink](crate::ControlLink).
///
/// - `runtime`: time since the link was created.
/// - `error_count`: failed requests and failed connection attempts.
/// - `frequency`: control cycles per second, `exchange_count / runtime`.
/// - `request_count`: requests delivered to the simulator. Wraps after `u32::MAX`.
/// - `exchange_count`: completed `ExchangeData` cycles.
///
/// ```no_run
/// use realflight_link::{ControlLink, LinkError, MotionIntent};
///
/// fn main() -> Result<(), LinkError> {
///     let mut link = ControlLink::new()?;
///     link.connect()?;
///     link.set_motion(&MotionIntent::hover())?;
///
///     let stats = link.statistics();
///     println!("Frequency: {:.2} Hz", stats.frequency);
///     println!("Errors so far: {}", stats.error_count);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub runtime: Duration,
    pub error_count: u32,
    pub frequency: f32,
    pub request_count: u32,
    pub exchange_count: u32,
}

/// Shared counters updated by the transport and the connection pool.
pub(crate) struct StatisticsEngine {
    start_time: Instant,
    error_count: AtomicU32,
    request_count: AtomicU32,
    exchange_count: AtomicU32,
}

impl StatisticsEngine {
    pub fn new() -> Self {
        StatisticsEngine {
            start_time: Instant::now(),
            error_count: AtomicU32::new(0),
            request_count: AtomicU32::new(0),
            exchange_count: AtomicU32::new(0),
        }
    }

    pub fn snapshot(&self) -> Statistics {
        let runtime = self.start_time.elapsed();
        let exchange_count = self.exchange_count.load(Ordering::Relaxed);
        Statistics {
            runtime,
            error_count: self.error_count.load(Ordering::Relaxed),
            frequency: cycle_rate(exchange_count, runtime),
            request_count: self.request_count.load(Ordering::Relaxed),
            exchange_count,
        }
    }

    pub(crate) fn increment_request_count(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_error_count(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_exchange_count(&self) {
        self.exchange_count.fetch_add(1, Ordering::Relaxed);
    }
}

fn cycle_rate(cycles: u32, runtime: Duration) -> f32 {
    let seconds = runtime.as_secs_f32();
    if seconds > 0.0 {
        cycles as f32 / seconds
    } else {
        0.0
    }
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new()
    }
}
