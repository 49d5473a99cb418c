//! Daemon lifecycle: startup, the running service and shutdown

use crate::config::ServiceConfig;
use crate::http::{self, AppState};
use crate::ntfy::NtfyNotifier;
use anyhow::{Context, Result};
use chargewatch_engine::{
    Backoff, ChargerLink, DeviceConnector, HidApiConnector, NotifierGate, Poller, SnapshotReader,
};
use chargewatch_errors::ChargeWatchError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Startup behaviour that is not part of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonFlags {
    /// Keep retrying when the charger is absent at startup instead of
    /// refusing to start.
    pub wait_for_device: bool,
    /// Delay schedule for those retries.
    pub startup_backoff: Backoff,
}

impl Default for DaemonFlags {
    fn default() -> Self {
        Self {
            wait_for_device: false,
            startup_backoff: Backoff::new(Duration::from_secs(1), Backoff::DEFAULT_MAX),
        }
    }
}

pub struct ServiceDaemon {
    config: ServiceConfig,
    flags: DaemonFlags,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

/// Poll loop and status server, both running.
pub struct RunningService {
    local_addr: SocketAddr,
    reader: SnapshotReader,
    poll_task: JoinHandle<()>,
    http_task: JoinHandle<Result<()>>,
}

impl RunningService {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Wait for both tasks to stop.
    pub async fn join(self) -> Result<()> {
        let (poll, http) = tokio::join!(self.poll_task, self.http_task);
        poll.context("Poll loop task failed")?;
        http.context("Status server task failed")??;
        Ok(())
    }
}

impl ServiceDaemon {
    pub fn new(config: ServiceConfig, flags: DaemonFlags) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        Self {
            config,
            flags,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Sending on this stops the daemon.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run against the real hardware until SIGINT/SIGTERM.
    pub async fn run(mut self) -> Result<()> {
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            if let Err(e) = shutdown_tx.send(()) {
                debug!(error = %e, "No task left to stop");
            }
        });

        let connector = HidApiConnector::new(self.config.serial.clone(), self.config.bus_speed_hz);
        match self.start(Box::new(connector)).await? {
            Some(service) => service.join().await?,
            None => info!("Shutdown requested before the charger was found"),
        }

        info!("chargewatchd stopped");
        Ok(())
    }

    /// Connect to the charger, then spawn the poll loop and status server.
    /// `None` means shutdown was requested while waiting for the device.
    pub async fn start(
        &mut self,
        connector: Box<dyn DeviceConnector>,
    ) -> Result<Option<RunningService>> {
        let Some(link) = self.connect_at_startup(connector).await? else {
            return Ok(None);
        };

        let gate = self.notifier_gate()?;
        let notifications_enabled = gate.is_enabled();
        let (poller, reader) = Poller::new(link, self.config.poller_config(), gate);

        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind status server to {}:{}",
                    self.config.host, self.config.port
                )
            })?;
        let local_addr = listener
            .local_addr()
            .context("Listener has no local address")?;

        let poll_task = tokio::spawn(poller.run(self.shutdown_tx.subscribe()));
        let http_task = tokio::spawn(http::serve(
            listener,
            AppState::new(reader.clone(), notifications_enabled),
            self.shutdown_tx.subscribe(),
        ));

        info!(
            %local_addr,
            interval_ms = self.config.poll_interval_ms,
            debounce_cycles = self.config.debounce_cycles,
            notifications_enabled,
            "chargewatchd running"
        );

        Ok(Some(RunningService {
            local_addr,
            reader,
            poll_task,
            http_task,
        }))
    }

    fn notifier_gate(&self) -> Result<NotifierGate> {
        match self.config.notification_url() {
            Some(url) => {
                info!(url, "Notifications enabled");
                let notifier = NtfyNotifier::new(url)?;
                Ok(NotifierGate::new(Arc::new(notifier)))
            }
            None => {
                info!("Notifications disabled");
                Ok(NotifierGate::disabled())
            }
        }
    }

    /// Open and initialise the charger. Without `wait_for_device` the
    /// first failure is fatal; with it, an absent or unready device is
    /// retried and anything else is still fatal.
    async fn connect_at_startup(
        &mut self,
        mut connector: Box<dyn DeviceConnector>,
    ) -> Result<Option<ChargerLink>> {
        let mut backoff = self.flags.startup_backoff;
        let link_backoff = Backoff::new(self.config.poll_interval(), Backoff::DEFAULT_MAX);

        loop {
            let (returned, result) = tokio::task::spawn_blocking(move || {
                let result = connector.connect();
                (connector, result)
            })
            .await
            .context("Device open task failed")?;
            connector = returned;

            match result {
                Ok(source) => {
                    info!(device = %connector.describe(), "Charger connected");
                    return Ok(Some(ChargerLink::connected(connector, source, link_backoff)));
                }
                Err(e) if self.flags.wait_for_device && worth_waiting_for(&e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        device = %connector.describe(),
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Charger not available, waiting"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.shutdown_rx.recv() => return Ok(None),
                    }
                }
                Err(e) => {
                    error!(
                        device = %connector.describe(),
                        error = %e,
                        severity = %e.severity(),
                        "Charger not available"
                    );
                    let hint = if self.flags.wait_for_device {
                        ""
                    } else {
                        "; use --wait-for-device to keep retrying"
                    };
                    return Err(anyhow::Error::new(e).context(format!(
                        "Cannot start without the charger ({}){hint}",
                        connector.describe()
                    )));
                }
            }
        }
    }
}

/// Failures that plugging in or powering up the charger can clear.
/// Programming errors such as a wrong report size are never waited out.
fn worth_waiting_for(err: &ChargeWatchError) -> bool {
    match err {
        ChargeWatchError::Device(e) => e.is_fatal_at_startup() || e.is_device_unavailable(),
        _ => false,
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargewatch_errors::{BusError, DeviceError};

    #[test]
    fn test_only_absent_or_unready_devices_are_waited_for() {
        assert!(worth_waiting_for(&DeviceError::not_found("cp2112").into()));
        assert!(worth_waiting_for(&DeviceError::disconnected("cp2112").into()));
        assert!(worth_waiting_for(
            &DeviceError::init_failed("mcp23017", "no ack").into()
        ));
        assert!(!worth_waiting_for(
            &DeviceError::InvalidReportSize {
                expected: 64,
                actual: 63
            }
            .into()
        ));
        assert!(!worth_waiting_for(&BusError::nack(0x20).into()));
    }
}
