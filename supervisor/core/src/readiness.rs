//! Readiness Gate
//!
//! Turns "the process has been spawned" into "the transport is accepting
//! connections" by polling the listen address until a connection succeeds
//! or the deadline passes.
//!
//! Polling is driven by `tokio::time::interval`, one probe per tick. Each
//! probe is bounded by the poll interval, so the total wait overshoots the
//! timeout by at most one interval.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::probe::{LivenessProber, TcpProber};
use crate::transport::config::DEFAULT_POLL_INTERVAL_MS;

/// Polls an address until it accepts connections
#[derive(Clone)]
pub struct ReadinessGate {
    prober: Arc<dyn LivenessProber>,
    poll_interval: Duration,
}

impl ReadinessGate {
    /// Create a gate that probes with plain TCP connects
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self::with_prober(Arc::new(TcpProber), poll_interval)
    }

    /// Create a gate with a custom prober
    pub fn with_prober(prober: Arc<dyn LivenessProber>, poll_interval: Duration) -> Self {
        Self {
            prober,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Wait until `addr` accepts a connection
    ///
    /// Returns `true` as soon as a probe succeeds, `false` once `timeout`
    /// has elapsed without success. The first probe happens immediately.
    pub async fn wait_until_ready(&self, addr: SocketAddr, timeout: Duration) -> bool {
        let started = Instant::now();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts: u32 = 0;

        loop {
            interval.tick().await;
            attempts += 1;

            if self.prober.is_listening(addr, self.poll_interval).await {
                tracing::debug!(
                    addr = %addr,
                    attempts,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Transport accepting connections"
                );
                return true;
            }

            if started.elapsed() >= timeout {
                tracing::warn!(
                    addr = %addr,
                    attempts,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Transport did not accept connections before timeout"
                );
                return false;
            }
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    /// Prober that starts succeeding on a given attempt (0 = never)
    struct CountingProber {
        succeed_on: u32,
        attempts: AtomicU32,
    }

    impl CountingProber {
        fn new(succeed_on: u32) -> Arc<Self> {
            Arc::new(Self {
                succeed_on,
                attempts: AtomicU32::new(0),
            })
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LivenessProber for CountingProber {
        async fn is_listening(&self, _addr: SocketAddr, _timeout: Duration) -> bool {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            self.succeed_on != 0 && attempt >= self.succeed_on
        }
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:10080".parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_probe() {
        let prober = CountingProber::new(1);
        let gate = ReadinessGate::with_prober(prober.clone(), Duration::from_millis(100));

        assert!(gate.wait_until_ready(addr(), Duration::from_secs(60)).await);
        assert_eq!(prober.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_several_probes() {
        let prober = CountingProber::new(5);
        let gate = ReadinessGate::with_prober(prober.clone(), Duration::from_millis(100));

        let started = Instant::now();
        assert!(gate.wait_until_ready(addr(), Duration::from_secs(60)).await);
        assert_eq!(prober.attempts(), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let prober = CountingProber::new(0);
        let gate = ReadinessGate::with_prober(prober.clone(), Duration::from_millis(100));

        let started = Instant::now();
        assert!(!gate.wait_until_ready(addr(), Duration::from_secs(1)).await);

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed <= Duration::from_millis(1100));
        assert_eq!(prober.attempts(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_probes_once() {
        let prober = CountingProber::new(0);
        let gate = ReadinessGate::with_prober(prober.clone(), Duration::from_millis(100));

        assert!(!gate.wait_until_ready(addr(), Duration::ZERO).await);
        assert_eq!(prober.attempts(), 1);
    }

    #[tokio::test]
    async fn test_real_listener_is_ready() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let gate = ReadinessGate::new(Duration::from_millis(20));

        assert!(gate.wait_until_ready(addr, Duration::from_secs(5)).await);
    }
}
