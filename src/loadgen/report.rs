//! Load test counters and the final report.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;

use crate::coordinator::Source;

/// Shared counters updated by every client task.
#[derive(Debug, Default)]
pub struct LoadCounters {
    attempted: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    latency_nanos: AtomicU64,
    successful_gets: AtomicU64,
    cache_hits: AtomicU64,
}

#[derive(Deserialize)]
struct SourceField {
    source: Option<Source>,
}

/// Statuses below 500 are the server doing its job, 4xx included.
pub fn is_success(status: u16) -> bool {
    (200..500).contains(&status)
}

/// True when a GET body reports it was served from the cache.
pub fn is_cache_hit(body: &str) -> bool {
    serde_json::from_str::<SourceField>(body)
        .map(|field| field.source == Some(Source::Cache))
        .unwrap_or(false)
}

impl LoadCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request that received a response.
    pub fn record_response(&self, method: &Method, status: u16, body: &str, latency: Duration) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        if !is_success(status) {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.successful.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.latency_nanos.fetch_add(nanos, Ordering::Relaxed);

        if *method == Method::GET && status == 200 {
            self.successful_gets.fetch_add(1, Ordering::Relaxed);
            if is_cache_hit(body) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Records a request that never got a response.
    pub fn record_transport_failure(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self, clients: usize, duration: Duration) -> LoadReport {
        LoadReport {
            duration,
            clients,
            attempted: self.attempted.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            latency_nanos: self.latency_nanos.load(Ordering::Relaxed),
            successful_gets: self.successful_gets.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// Totals for a finished load test.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Wall time from first spawn to last join
    pub duration: Duration,
    pub clients: usize,
    pub attempted: u64,
    /// Responses with status 200-499
    pub successful: u64,
    /// 5xx responses and transport errors
    pub failed: u64,
    /// Summed latency of successful requests
    pub latency_nanos: u64,
    /// GETs answered with 200
    pub successful_gets: u64,
    pub cache_hits: u64,
}

impl LoadReport {
    /// Successful requests per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.successful as f64 / secs
        }
    }

    /// Mean latency of successful requests in milliseconds.
    pub fn average_latency_ms(&self) -> f64 {
        if self.successful == 0 {
            0.0
        } else {
            self.latency_nanos as f64 / (self.successful as f64 * 1e6)
        }
    }

    /// Percentage of 200 GETs served from the cache.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.successful_gets == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.successful_gets as f64 * 100.0
        }
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Load Test Results ---")?;
        writeln!(f, "Test Duration (actual):    {:.3} seconds", self.duration.as_secs_f64())?;
        writeln!(f, "Number of Clients:         {}", self.clients)?;
        writeln!(f, "Total Requests Attempted:  {}", self.attempted)?;
        writeln!(f, "Successful Requests:       {} (includes 4xx)", self.successful)?;
        writeln!(f, "Failed Requests:           {} (includes 5xx)", self.failed)?;

        if self.successful == 0 {
            return writeln!(f, "No successful requests to calculate average metrics.");
        }

        writeln!(f, "---------------------------------")?;
        writeln!(f, "Average Throughput:        {:.2} req/s", self.throughput())?;
        writeln!(f, "Average Response Time:     {:.3} ms", self.average_latency_ms())?;
        writeln!(
            f,
            "Cache Hit Rate (for GETs): {:.2} % ({}/{})",
            self.cache_hit_rate(),
            self.cache_hits,
            self.successful_gets
        )?;
        write!(f, "---------------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(is_success(200));
        assert!(is_success(404));
        assert!(is_success(409));
        assert!(!is_success(500));
        assert!(!is_success(503));
    }

    #[test]
    fn test_cache_hit_detection() {
        assert!(is_cache_hit(r#"{"key":"k","value":"v","source":"cache"}"#));
        assert!(!is_cache_hit(r#"{"key":"k","value":"v","source":"database"}"#));
        assert!(!is_cache_hit(r#"{"error":"Key not found"}"#));
        assert!(!is_cache_hit("not json"));
    }

    #[test]
    fn test_counters() {
        let counters = LoadCounters::new();
        let ms = Duration::from_millis(2);
        let hit = r#"{"key":"k","value":"v","source":"cache"}"#;
        let miss = r#"{"key":"k","value":"v","source":"database"}"#;

        counters.record_response(&Method::GET, 200, hit, ms);
        counters.record_response(&Method::GET, 200, miss, ms);
        counters.record_response(&Method::GET, 404, r#"{"error":"Key not found"}"#, ms);
        counters.record_response(&Method::POST, 201, "", ms);
        counters.record_response(&Method::PUT, 500, "", ms);
        counters.record_transport_failure();

        let report = counters.report(4, Duration::from_secs(2));
        assert_eq!(report.attempted, 6);
        assert_eq!(report.successful, 4);
        assert_eq!(report.failed, 2);
        assert_eq!(report.successful_gets, 2);
        assert_eq!(report.cache_hits, 1);
        assert!((report.throughput() - 2.0).abs() < 1e-9);
        assert!((report.average_latency_ms() - 2.0).abs() < 1e-9);
        assert!((report.cache_hit_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report() {
        let report = LoadCounters::new().report(1, Duration::ZERO);
        assert_eq!(report.throughput(), 0.0);
        assert_eq!(report.average_latency_ms(), 0.0);
        assert_eq!(report.cache_hit_rate(), 0.0);
        assert!(report.to_string().contains("No successful requests"));
    }

    #[test]
    fn test_display() {
        let counters = LoadCounters::new();
        counters.record_response(&Method::GET, 200, r#"{"source":"cache"}"#, Duration::from_millis(1));
        let text = counters.report(1, Duration::from_secs(1)).to_string();
        assert!(text.contains("Number of Clients:         1"));
        assert!(text.contains("Cache Hit Rate (for GETs): 100.00 % (1/1)"));
    }
}
