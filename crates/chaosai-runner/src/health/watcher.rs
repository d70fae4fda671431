//! Concurrent health check watcher
//!
//! One tokio task polls each application. A poller owns its samples until
//! it is joined; pollers share only the stop signal, which is one-shot and
//! never cleared. Every application is polled at least once.
//!
//! ```text
//! Idle --run()--> Running --stop()--> Stopped
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chaosai_common::{
    HealthCheckApplicationConfig, HealthCheckConfig, HealthCheckResult, Result, WatcherError,
};
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Stopped,
}

impl WatcherState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatcherState::Idle => "idle",
            WatcherState::Running => "running",
            WatcherState::Stopped => "stopped",
        }
    }
}

#[derive(Clone)]
struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    fn trigger(&self) {
        self.tx.send_replace(true);
    }

    fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

pub struct HealthCheckWatcher {
    config: HealthCheckConfig,
    client: reqwest::Client,
    state: WatcherState,
    stop: StopSignal,
    pollers: Vec<(String, JoinHandle<Vec<HealthCheckResult>>)>,
    results: BTreeMap<String, Vec<HealthCheckResult>>,
}

impl HealthCheckWatcher {
    pub fn new(config: HealthCheckConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            state: WatcherState::Idle,
            stop: StopSignal::new(),
            pollers: Vec::new(),
            results: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Whether stop was requested, by `stop()` or by a failing poller
    pub fn stop_requested(&self) -> bool {
        self.stop.is_set()
    }

    /// Spawn one poller per application; requires a tokio runtime
    pub fn run(&mut self) -> Result<()> {
        self.expect_state(WatcherState::Idle)?;
        debug!(
            applications = self.config.applications.len(),
            "Starting health check watcher"
        );

        for app in &self.config.applications {
            let handle = tokio::spawn(poll_application(
                app.clone(),
                self.client.clone(),
                self.stop.clone(),
                self.config.stop_watcher_on_failure,
            ));
            self.pollers.push((app.name.clone(), handle));
        }

        self.state = WatcherState::Running;
        Ok(())
    }

    /// Signal every poller and wait for all of them to exit
    pub async fn stop(&mut self) -> Result<()> {
        match self.state {
            WatcherState::Stopped => return Ok(()),
            WatcherState::Idle => {
                return Err(WatcherError::InvalidState {
                    expected: WatcherState::Running.as_str(),
                    actual: self.state.as_str(),
                }
                .into())
            }
            WatcherState::Running => {}
        }

        info!("Stopping health check watcher");
        self.stop.trigger();
        self.state = WatcherState::Stopped;

        let pollers = std::mem::take(&mut self.pollers);
        let mut failure = None;
        for (name, handle) in pollers {
            match handle.await {
                Ok(samples) => self.results.entry(name).or_default().extend(samples),
                Err(e) => {
                    warn!(application = %name, error = %e, "Health check poller failed");
                    failure.get_or_insert(WatcherError::PollerFailed {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Samples per application name; only valid once stopped
    pub fn get_results(&self) -> Result<BTreeMap<String, Vec<HealthCheckResult>>> {
        self.expect_state(WatcherState::Stopped)?;
        Ok(self.results.clone())
    }

    fn expect_state(&self, expected: WatcherState) -> Result<()> {
        if self.state != expected {
            return Err(WatcherError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            }
            .into());
        }
        Ok(())
    }
}

async fn poll_application(
    app: HealthCheckApplicationConfig,
    client: reqwest::Client,
    stop: StopSignal,
    stop_on_failure: bool,
) -> Vec<HealthCheckResult> {
    let mut stop_rx = stop.subscribe();
    let interval = Duration::from_secs(app.interval);
    let mut samples = Vec::new();

    loop {
        let sample = poll_once(&client, &app).await;
        let failed = !sample.success;
        samples.push(sample);

        if failed && stop_on_failure {
            warn!(application = %app.name, "Health check failed, stopping watcher");
            stop.trigger();
            break;
        }
        if *stop_rx.borrow_and_update() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop_rx.changed() => break,
        }
    }

    samples
}

async fn poll_once(
    client: &reqwest::Client,
    app: &HealthCheckApplicationConfig,
) -> HealthCheckResult {
    let timestamp = Utc::now();
    let started = Instant::now();

    match client
        .get(&app.url)
        .timeout(Duration::from_secs(app.timeout))
        .send()
        .await
    {
        Ok(response) => {
            let status = response.status().as_u16();
            HealthCheckResult {
                name: app.name.clone(),
                timestamp,
                response_time: started.elapsed().as_secs_f64(),
                status_code: i32::from(status),
                success: status == app.status_code,
                error: None,
            }
        }
        Err(e) => HealthCheckResult {
            name: app.name.clone(),
            timestamp,
            response_time: -1.0,
            status_code: -1,
            success: false,
            error: Some(e.to_string()),
        },
    }
}
