//! Progress reporting and cancellation for the optimiser loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Snapshot of one optimiser iteration.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Zero-based iteration number.
    pub iteration: usize,
    /// Iteration budget.
    pub total_iterations: Option<usize>,
    /// Metric value (negative mutual information).
    pub metric_value: f64,
    /// Convergence value once the window is full.
    pub convergence_value: Option<f64>,
    /// Learning rate applied in this iteration.
    pub learning_rate: f64,
    /// Time since the optimiser started.
    pub elapsed: Duration,
    /// Linear extrapolation of the remaining time.
    pub estimated_remaining: Option<Duration>,
}

impl ProgressInfo {
    pub fn new(
        iteration: usize,
        total_iterations: Option<usize>,
        metric_value: f64,
        elapsed: Duration,
        learning_rate: f64,
    ) -> Self {
        Self {
            iteration,
            total_iterations,
            metric_value,
            convergence_value: None,
            learning_rate,
            elapsed,
            estimated_remaining: None,
        }
    }

    pub fn with_convergence_value(mut self, value: Option<f64>) -> Self {
        self.convergence_value = value;
        self
    }

    /// Progress as a percentage of the iteration budget.
    pub fn progress_percent(&self) -> Option<f64> {
        self.total_iterations
            .filter(|&total| total > 0)
            .map(|total| (self.iteration as f64 / total as f64) * 100.0)
    }

    /// Fill in `estimated_remaining` from the average iteration time.
    pub fn calculate_remaining(&mut self) {
        if let Some(total) = self.total_iterations {
            let done = self.iteration + 1;
            let per_iter = self.elapsed.as_secs_f64() / done as f64;
            let remaining = total.saturating_sub(done);
            self.estimated_remaining = Some(Duration::from_secs_f64(per_iter * remaining as f64));
        }
    }
}

/// Hooks invoked by the optimiser.
pub trait ProgressCallback: Send + Sync {
    /// Called after the metric of each iteration is evaluated.
    fn on_progress(&self, info: &ProgressInfo);

    fn on_start(&self) {}

    fn on_complete(&self, _info: &ProgressInfo) {}

    fn on_error(&self, _error: &str) {}
}

/// Logs progress through `tracing` every `log_interval` iterations.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 50 }
    }
}

impl ConsoleProgressCallback {
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.iteration % self.log_interval != 0 {
            return;
        }
        let total = info
            .total_iterations
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        let eta = info
            .estimated_remaining
            .map(|d| format!("{:.1}s", d.as_secs_f64()))
            .unwrap_or_else(|| "N/A".to_string());
        tracing::info!(
            "Iter {}/{} ({:.1}%) | Metric: {:.6} | Convergence: {} | LR: {:.3e} | ETA: {}",
            info.iteration,
            total,
            info.progress_percent().unwrap_or(0.0),
            info.metric_value,
            info.convergence_value
                .map(|c| format!("{:.3e}", c))
                .unwrap_or_else(|| "-".to_string()),
            info.learning_rate,
            eta
        );
    }

    fn on_start(&self) {
        tracing::info!("Registration started");
    }

    fn on_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "Registration finished after {} iterations in {:.2}s, metric {:.6}",
            info.iteration,
            info.elapsed.as_secs_f64(),
            info.metric_value
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Registration failed: {}", error);
    }
}

/// Records every progress snapshot.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_history(&self) -> Vec<ProgressInfo> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Metric values in iteration order.
    pub fn metric_values(&self) -> Vec<f64> {
        self.get_history().iter().map(|i| i.metric_value).collect()
    }

    pub fn clear(&self) {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(info.clone());
    }
}

/// Cooperative cancellation flag, polled once per iteration.
///
/// Clones share the flag, so a token handed to another thread can stop a
/// running registration.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Fans events out to registered callbacks and keeps the clock.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    start_time: Option<Instant>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        for callback in &self.callbacks {
            callback.on_start();
        }
    }

    fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    pub fn update(
        &self,
        iteration: usize,
        total_iterations: Option<usize>,
        metric_value: f64,
        convergence_value: Option<f64>,
        learning_rate: f64,
    ) {
        let mut info = ProgressInfo::new(iteration, total_iterations, metric_value, self.elapsed(), learning_rate)
            .with_convergence_value(convergence_value);
        info.calculate_remaining();
        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    pub fn complete(&self, iterations: usize, final_metric: f64, learning_rate: f64) {
        let info = ProgressInfo::new(iterations, Some(iterations), final_metric, self.elapsed(), learning_rate);
        for callback in &self.callbacks {
            callback.on_complete(&info);
        }
    }

    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}
