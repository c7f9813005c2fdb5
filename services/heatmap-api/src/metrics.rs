//! Application metrics collection and reporting.

use heatmap_common::RenderMode;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;

/// Metrics collector for the heatmap API.
#[derive(Debug)]
pub struct MetricsCollector {
    /// Request counts
    pub requests: AtomicU64,
    pub rejected_requests: AtomicU64,

    /// Render stats
    pub renders_total: AtomicU64,
    pub render_errors: AtomicU64,
    pub precise_renders: AtomicU64,
    pub smoothed_renders: AtomicU64,

    /// Upload stats
    pub uploads_total: AtomicU64,
    pub upload_errors: AtomicU64,

    /// Timing stats (stored as microseconds)
    render_times: RwLock<TimingStats>,
    upload_times: RwLock<TimingStats>,

    /// Start time for uptime calculation
    start_time: Instant,
}

#[derive(Debug, Default)]
struct TimingStats {
    count: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
    last_us: u64,
}

impl TimingStats {
    fn record(&mut self, duration_us: u64) {
        self.count += 1;
        self.total_us += duration_us;
        self.last_us = duration_us;
        if self.min_us == 0 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
    }

    fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.total_us as f64 / self.count as f64) / 1000.0
        }
    }

    fn last_ms(&self) -> f64 {
        self.last_us as f64 / 1000.0
    }

    fn min_ms(&self) -> f64 {
        self.min_us as f64 / 1000.0
    }

    fn max_ms(&self) -> f64 {
        self.max_us as f64 / 1000.0
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
            renders_total: AtomicU64::new(0),
            render_errors: AtomicU64::new(0),
            precise_renders: AtomicU64::new(0),
            smoothed_renders: AtomicU64::new(0),
            uploads_total: AtomicU64::new(0),
            upload_errors: AtomicU64::new(0),
            render_times: RwLock::new(TimingStats::default()),
            upload_times: RwLock::new(TimingStats::default()),
            start_time: Instant::now(),
        }
    }

    /// Record an incoming heatmap request
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        counter!("heatmap_requests_total").increment(1);
    }

    /// Record a request refused before rendering (bad body, bad values)
    pub fn record_rejected(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
        counter!("heatmap_rejected_requests_total").increment(1);
    }

    /// Record a render operation
    pub async fn record_render(&self, duration_us: u64, mode: RenderMode, success: bool) {
        self.renders_total.fetch_add(1, Ordering::Relaxed);
        let mode_label = mode.suffix();
        counter!("heatmap_renders_total", "mode" => mode_label).increment(1);

        if !success {
            self.render_errors.fetch_add(1, Ordering::Relaxed);
            counter!("heatmap_render_errors_total", "mode" => mode_label).increment(1);
            return;
        }

        match mode {
            RenderMode::Precise => self.precise_renders.fetch_add(1, Ordering::Relaxed),
            RenderMode::Smoothed => self.smoothed_renders.fetch_add(1, Ordering::Relaxed),
        };
        histogram!("heatmap_render_duration_ms", "mode" => mode_label)
            .record(duration_us as f64 / 1000.0);

        let mut times = self.render_times.write().await;
        times.record(duration_us);
    }

    /// Record an upload to object storage
    pub async fn record_upload(&self, duration_us: u64, success: bool) {
        self.uploads_total.fetch_add(1, Ordering::Relaxed);
        let status = if success { "ok" } else { "error" };
        counter!("heatmap_uploads_total", "status" => status).increment(1);

        if !success {
            self.upload_errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
        histogram!("heatmap_upload_duration_ms").record(duration_us as f64 / 1000.0);

        let mut times = self.upload_times.write().await;
        times.record(duration_us);
    }

    /// Get current metrics snapshot
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let render_times = self.render_times.read().await;
        let upload_times = self.upload_times.read().await;

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),

            requests: self.requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),

            renders_total: self.renders_total.load(Ordering::Relaxed),
            render_errors: self.render_errors.load(Ordering::Relaxed),
            precise_renders: self.precise_renders.load(Ordering::Relaxed),
            smoothed_renders: self.smoothed_renders.load(Ordering::Relaxed),
            render_avg_ms: render_times.avg_ms(),
            render_last_ms: render_times.last_ms(),
            render_min_ms: render_times.min_ms(),
            render_max_ms: render_times.max_ms(),

            uploads_total: self.uploads_total.load(Ordering::Relaxed),
            upload_errors: self.upload_errors.load(Ordering::Relaxed),
            upload_avg_ms: upload_times.avg_ms(),
            upload_last_ms: upload_times.last_ms(),
        }
    }

    /// Render the counters in Prometheus text format.
    ///
    /// Used for `/metrics` when no global recorder is installed.
    pub fn to_prometheus_text(&self) -> String {
        let entries = [
            ("heatmap_requests_total", "Total heatmap requests", &self.requests),
            ("heatmap_rejected_requests_total", "Requests refused before rendering", &self.rejected_requests),
            ("heatmap_renders_total", "Total render attempts", &self.renders_total),
            ("heatmap_render_errors_total", "Failed renders", &self.render_errors),
            ("heatmap_uploads_total", "Total upload attempts", &self.uploads_total),
            ("heatmap_upload_errors_total", "Failed uploads", &self.upload_errors),
        ];

        let mut output = String::new();
        for (name, help, value) in entries {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n",
                value.load(Ordering::Relaxed)
            ));
        }
        output
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics for JSON serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,

    // Request counts
    pub requests: u64,
    pub rejected_requests: u64,

    // Render stats
    pub renders_total: u64,
    pub render_errors: u64,
    pub precise_renders: u64,
    pub smoothed_renders: u64,
    pub render_avg_ms: f64,
    pub render_last_ms: f64,
    pub render_min_ms: f64,
    pub render_max_ms: f64,

    // Upload stats
    pub uploads_total: u64,
    pub upload_errors: u64,
    pub upload_avg_ms: f64,
    pub upload_last_ms: f64,
}

/// Timer guard for measuring operation duration.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_micros() as f64 / 1000.0
    }
}
