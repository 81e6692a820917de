//! The health prober: timed sampling and the baseline state machine.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use anteroom_state::AdmissionStore;

use crate::stats::{sample_stats, within_limit};

/// Outcome of one prober cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// First run: baseline captured, no health evaluation this cycle.
    BaselineCaptured,
    /// Fresh sample mean is under the three-sigma limit.
    Pass,
    /// Fresh sample mean is at or over the three-sigma limit.
    Fail,
    /// Too few successful probes to evaluate; nothing persisted.
    Skipped,
}

impl ProbeVerdict {
    /// The boolean handed to the rate controller, when one exists.
    pub fn passed(self) -> Option<bool> {
        match self {
            ProbeVerdict::Pass => Some(true),
            ProbeVerdict::Fail => Some(false),
            ProbeVerdict::BaselineCaptured | ProbeVerdict::Skipped => None,
        }
    }
}

/// Samples end-to-end latency against the protected endpoint.
pub struct HealthProber {
    store: AdmissionStore,
    /// Probe target as `host:port`.
    target: String,
    path: String,
    sample_size: usize,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(
        store: AdmissionStore,
        target: String,
        path: String,
        sample_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            target,
            path,
            sample_size,
            timeout,
        }
    }

    /// Run one prober cycle.
    ///
    /// Without a stored baseline, the sample becomes the baseline and no
    /// verdict is produced. With one, the fresh sample is classified
    /// against the three-sigma limit.
    pub async fn run_cycle(&self) -> anyhow::Result<ProbeVerdict> {
        let samples = self.sample().await;
        let fresh = match sample_stats(&samples) {
            Some(stats) => stats,
            None => {
                warn!(
                    collected = samples.len(),
                    target = %self.target,
                    "too few successful probes, skipping health cycle"
                );
                return Ok(ProbeVerdict::Skipped);
            }
        };

        match self.store.get_baseline()? {
            None => {
                self.store.put_baseline(&fresh.into())?;
                info!(
                    mean_ms = fresh.mean,
                    std_dev_ms = fresh.std_dev,
                    "latency baseline captured"
                );
                Ok(ProbeVerdict::BaselineCaptured)
            }
            Some(baseline) => {
                let passed = within_limit(&baseline, fresh.mean);
                info!(
                    fresh_mean_ms = fresh.mean,
                    baseline_mean_ms = baseline.mean,
                    limit_ms = baseline.mean + 3.0 * baseline.std_dev,
                    passed,
                    "health check evaluated"
                );
                Ok(if passed {
                    ProbeVerdict::Pass
                } else {
                    ProbeVerdict::Fail
                })
            }
        }
    }

    /// Run up to `sample_size` sequential timed requests. A failed probe
    /// aborts the run, keeping whatever was collected so far.
    async fn sample(&self) -> Vec<f64> {
        let mut samples = Vec::with_capacity(self.sample_size);
        for _ in 0..self.sample_size {
            match timed_get(&self.target, &self.path, self.timeout).await {
                Some(elapsed_ms) => samples.push(elapsed_ms),
                None => break,
            }
        }
        debug!(collected = samples.len(), "latency sample finished");
        samples
    }
}

/// Perform one timed GET. Returns elapsed milliseconds for a 2xx
/// response, `None` for anything else (connect failure, non-2xx,
/// timeout).
async fn timed_get(address: &str, path: &str, timeout: Duration) -> Option<f64> {
    let uri = format!("http://{address}{path}");
    let started = Instant::now();

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %uri, "probe connection failed");
                return None;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %uri, "probe handshake failed");
                return None;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", address)
            .header("user-agent", "anteroom-health/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .ok()?;

        match sender.send_request(req).await {
            Ok(resp) if resp.status().is_success() => Some(()),
            Ok(resp) => {
                debug!(status = %resp.status(), %uri, "probe got non-2xx");
                None
            }
            Err(e) => {
                debug!(error = %e, %uri, "probe request failed");
                None
            }
        }
    })
    .await;

    match result {
        Ok(Some(())) => Some(started.elapsed().as_secs_f64() * 1000.0),
        Ok(None) => None,
        Err(_) => {
            debug!(%uri, "probe timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use http_body_util::Full;
    use hyper::service::service_fn;
    use hyper::{Response, StatusCode};

    /// Spawn a local HTTP server answering every request with `status`.
    async fn spawn_server(status: StatusCode) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let io = hyper_util::rt::TokioIo::new(stream);
                    let svc = service_fn(move |_req| async move {
                        Ok::<_, std::convert::Infallible>(
                            Response::builder()
                                .status(status)
                                .body(Full::new(bytes::Bytes::from("ok")))
                                .unwrap(),
                        )
                    });
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, svc)
                        .await;
                });
            }
        });
        addr
    }

    fn prober(store: AdmissionStore, addr: SocketAddr, sample_size: usize) -> HealthProber {
        HealthProber::new(
            store,
            addr.to_string(),
            "/".to_string(),
            sample_size,
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn first_cycle_captures_baseline_without_verdict() {
        let store = AdmissionStore::open_in_memory().unwrap();
        let addr = spawn_server(StatusCode::OK).await;
        let prober = prober(store.clone(), addr, 5);

        let verdict = prober.run_cycle().await.unwrap();

        assert_eq!(verdict, ProbeVerdict::BaselineCaptured);
        assert_eq!(verdict.passed(), None);
        let baseline = store.get_baseline().unwrap().unwrap();
        assert!(baseline.mean > 0.0);
    }

    #[tokio::test]
    async fn second_cycle_evaluates_against_stored_baseline() {
        let store = AdmissionStore::open_in_memory().unwrap();
        let addr = spawn_server(StatusCode::OK).await;
        let prober = prober(store.clone(), addr, 5);

        prober.run_cycle().await.unwrap();
        let baseline = store.get_baseline().unwrap().unwrap();

        let verdict = prober.run_cycle().await.unwrap();

        // A local loopback sample against its own baseline passes.
        assert_eq!(verdict, ProbeVerdict::Pass);
        assert_eq!(verdict.passed(), Some(true));
        // The baseline is never recomputed.
        assert_eq!(store.get_baseline().unwrap().unwrap(), baseline);
    }

    #[tokio::test]
    async fn unhealthy_endpoint_skips_cycle() {
        let store = AdmissionStore::open_in_memory().unwrap();
        let addr = spawn_server(StatusCode::INTERNAL_SERVER_ERROR).await;
        let prober = prober(store.clone(), addr, 5);

        let verdict = prober.run_cycle().await.unwrap();

        assert_eq!(verdict, ProbeVerdict::Skipped);
        assert!(store.get_baseline().unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoint_skips_cycle() {
        let store = AdmissionStore::open_in_memory().unwrap();
        // Bind-then-drop to get a port nobody is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = prober(store.clone(), addr, 3);
        let verdict = prober.run_cycle().await.unwrap();

        assert_eq!(verdict, ProbeVerdict::Skipped);
    }

    #[tokio::test]
    async fn cleared_baseline_is_recaptured() {
        let store = AdmissionStore::open_in_memory().unwrap();
        let addr = spawn_server(StatusCode::OK).await;
        let prober = prober(store.clone(), addr, 5);

        prober.run_cycle().await.unwrap();
        store.clear_baseline().unwrap();

        let verdict = prober.run_cycle().await.unwrap();
        assert_eq!(verdict, ProbeVerdict::BaselineCaptured);
    }
}
