//! Runtime options shared by decode and encode, and progress reporting.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Receives progress reports from a running decode or encode.
///
/// Reports carry a percentage in `0..=100` that never decreases within one
/// call, and at most one report is in flight at a time. The worker thread
/// that delivers a report is unspecified.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, message: Option<&str>);
}

impl<F> ProgressSink for F
where
    F: Fn(u8, Option<&str>) + Send + Sync,
{
    fn report(&self, percent: u8, message: Option<&str>) {
        self(percent, message)
    }
}

/// Options for [`decode`](crate::decode) and [`encode`](crate::encode).
#[derive(Clone)]
pub struct CodecOptions {
    /// Requested degree of parallelism. `0` and `1` run serially; larger
    /// values are capped at the hardware concurrency.
    pub parallelism: usize,
    /// Optional progress receiver.
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl Default for CodecOptions {
    /// Serial, no progress reporting.
    fn default() -> Self {
        Self {
            parallelism: 1,
            progress: None,
        }
    }
}

impl fmt::Debug for CodecOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecOptions")
            .field("parallelism", &self.parallelism)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl CodecOptions {
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Use every available hardware thread.
    pub fn with_all_threads(self) -> Self {
        self.with_parallelism(hardware_threads())
    }

    pub fn with_progress<P: ProgressSink + 'static>(mut self, sink: P) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// The degree of parallelism actually used.
    pub fn effective_parallelism(&self) -> usize {
        if self.parallelism <= 1 {
            1
        } else {
            self.parallelism.min(hardware_threads())
        }
    }
}

fn hardware_threads() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Counts finished work units and forwards percentages to a sink.
///
/// Workers bump an atomic counter; whichever worker wins the `try_lock`
/// publishes the new percentage, the others skip reporting this time.
pub(crate) struct ProgressTracker<'a> {
    sink: Option<&'a dyn ProgressSink>,
    message: &'static str,
    total: usize,
    done: AtomicUsize,
    last: Mutex<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(options: &'a CodecOptions, message: &'static str, total: usize) -> Self {
        Self {
            sink: options.progress.as_deref(),
            message,
            total,
            done: AtomicUsize::new(0),
            last: Mutex::new(0),
        }
    }

    pub(crate) fn start(&self) {
        if let Some(sink) = self.sink {
            sink.report(0, Some(self.message));
        }
    }

    /// Record `units` more finished units of work.
    pub(crate) fn advance(&self, units: usize) {
        let Some(sink) = self.sink else {
            return;
        };
        let done = self.done.fetch_add(units, Ordering::Relaxed) + units;
        let percent = percent_of(done, self.total);
        if let Ok(mut last) = self.last.try_lock() {
            if percent > *last {
                *last = percent;
                sink.report(percent, Some(self.message));
            }
        }
    }

    /// Report 100% if it has not been reported yet.
    pub(crate) fn finish(&self) {
        let Some(sink) = self.sink else {
            return;
        };
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *last < 100 {
            *last = 100;
            sink.report(100, Some(self.message));
        }
    }
}

fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u128 * 100) / total as u128) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_parallelism_serial() {
        assert_eq!(CodecOptions::default().effective_parallelism(), 1);
        assert_eq!(
            CodecOptions::default()
                .with_parallelism(0)
                .effective_parallelism(),
            1
        );
    }

    #[test]
    fn effective_parallelism_is_capped() {
        let opts = CodecOptions::default().with_parallelism(usize::MAX);
        assert_eq!(opts.effective_parallelism(), hardware_threads());
    }

    #[test]
    fn all_threads_uses_the_hardware() {
        let opts = CodecOptions::default().with_all_threads();
        assert_eq!(opts.parallelism, hardware_threads());
        assert_eq!(opts.effective_parallelism(), hardware_threads());
    }

    #[test]
    fn percent_of_bounds() {
        assert_eq!(percent_of(0, 10), 0);
        assert_eq!(percent_of(5, 10), 50);
        assert_eq!(percent_of(20, 10), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn tracker_reports_are_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let opts = CodecOptions::default().with_progress(move |p: u8, _: Option<&str>| {
            sink_seen.lock().unwrap().push(p);
        });
        let tracker = ProgressTracker::new(&opts, "decoding", 4);
        tracker.start();
        for _ in 0..4 {
            tracker.advance(1);
        }
        tracker.finish();
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn tracker_without_sink_is_silent() {
        let opts = CodecOptions::default();
        let tracker = ProgressTracker::new(&opts, "encoding", 10);
        tracker.advance(3);
        tracker.finish();
    }

    #[test]
    fn debug_hides_sink() {
        let opts = CodecOptions::default().with_progress(|_: u8, _: Option<&str>| {});
        let text = format!("{opts:?}");
        assert!(text.contains("progress: true"));
    }
}
