//! # Session Module
//!
//! The session controller orchestrates a telemetry run.
//!
//! ## State Machine
//!
//! ```text
//!          start()               stop()
//!   Idle ───────────▶ Sampling ──────────▶ Idle
//! ```
//!
//! While sampling, a tokio task ticks once per configured interval. Each
//! tick, under the engine lock:
//!
//! 1. Asks the sample source for packet `N = log.len() + 1`
//! 2. Stamps the last sent command as the echo field
//! 3. Appends the sample to the session log
//! 4. Updates the chart feed
//! 5. Narrates the sample in the event log
//! 6. Publishes [`SessionEvent::SampleAdded`] and [`SessionEvent::LogAppended`]
//!
//! A tick runs to completion before the next one can start, and `stop()`
//! takes the same lock, so no sample is appended once `stop()` returns.
//!
//! ## Usage
//!
//! ```no_run
//! use cansat_ground::config::Config;
//! use cansat_ground::session::SessionController;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let controller = SessionController::from_config(&Config::default())?;
//!     let mut events = controller.subscribe();
//!
//!     controller.start()?;
//!     controller.send_command("CMD,1000,CX,ON")?;
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::command::{CommandChannel, CommandRecord, CommandTemplate};
use crate::config::Config;
use crate::error::{GroundStationError, Result};
use crate::event_log::{EventLog, LogEntry};
use crate::export::Exporter;
use crate::telemetry::{ChartFeed, Sample, SampleSource, SessionLog, SyntheticSource};

/// Capacity of the notification channel before slow subscribers lag.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Whether the sampling timer is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sampling,
}

/// Notifications pushed to the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A sample was appended to the session log
    SampleAdded(Sample),
    /// A line was appended to the event log
    LogAppended(LogEntry),
}

/// Engine state guarded by one lock.
struct SessionCore {
    state: SessionState,
    /// Bumped on every start and stop so a late timer wake-up can tell it is stale
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
    source: Box<dyn SampleSource>,
    log: SessionLog,
    chart: ChartFeed,
    commands: CommandChannel,
    events: EventLog,
}

/// Orchestrates sampling, command recording and export for one session.
pub struct SessionController {
    team_id: String,
    interval: Duration,
    exporter: Exporter,
    core: Arc<Mutex<SessionCore>>,
    notifier: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("team_id", &self.team_id)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller around an explicit sample source.
    ///
    /// # Arguments
    ///
    /// * `team_id` - Team identifier used for quick commands and export names
    /// * `interval` - Sampling period
    /// * `source` - Producer of samples
    /// * `chart` - Chart feed to update on each sample
    /// * `exporter` - Writer used by [`export_session`](Self::export_session)
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `team_id` is blank or `interval`
    /// is zero.
    pub fn new(
        team_id: impl Into<String>,
        interval: Duration,
        source: Box<dyn SampleSource>,
        chart: ChartFeed,
        exporter: Exporter,
    ) -> Result<Self> {
        let team_id = team_id.into();
        if team_id.trim().is_empty() {
            return Err(GroundStationError::InvalidConfiguration(
                "team_id cannot be empty".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(GroundStationError::InvalidConfiguration(
                "sampling interval must be positive".to_string(),
            ));
        }

        let (notifier, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            team_id,
            interval,
            exporter,
            core: Arc::new(Mutex::new(SessionCore {
                state: SessionState::Idle,
                epoch: 0,
                ticker: None,
                source,
                log: SessionLog::new(),
                chart,
                commands: CommandChannel::new(),
                events: EventLog::new(),
            })),
            notifier,
        })
    }

    /// Create a controller with a synthetic source from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the configuration fails validation.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let team_id = config.session.team_id.clone();
        let bounds = config.simulation.bounds();
        let source = match config.simulation.seed {
            Some(seed) => SyntheticSource::seeded(team_id.clone(), bounds, seed)?,
            None => SyntheticSource::new(team_id.clone(), bounds)?,
        };
        let chart = ChartFeed::new(config.chart.field, config.chart_max_points());
        let exporter = Exporter::new(
            config.export.format,
            &config.export.dir,
            config.export.filename.clone(),
        );

        Self::new(team_id, config.sampling_interval(), Box::new(source), chart, exporter)
    }

    #[must_use]
    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Subscribe to sample and log notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.notifier.subscribe()
    }

    /// Start sampling.
    ///
    /// Spawns the sampling task on the current tokio runtime. The first
    /// tick fires one interval after this call.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if the session was already sampling; nothing changes then
    /// (no packet count reset, no second timer).
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` if called outside a tokio runtime. The session
    /// stays idle and nothing is narrated.
    pub fn start(&self) -> Result<bool> {
        let mut core = self.lock();
        if core.state == SessionState::Sampling {
            debug!("start() ignored: already sampling");
            return Ok(false);
        }
        self.start_locked(&mut core)?;
        Ok(true)
    }

    /// Stop sampling.
    ///
    /// # Returns
    ///
    /// `false` if the session was already idle.
    pub fn stop(&self) -> bool {
        let mut core = self.lock();
        if core.state == SessionState::Idle {
            debug!("stop() ignored: already idle");
            return false;
        }
        self.stop_locked(&mut core);
        true
    }

    /// Flip between idle and sampling, returning the new state.
    ///
    /// The state is read and changed under a single lock, so concurrent
    /// toggles alternate instead of both starting.
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` when starting outside a tokio runtime.
    pub fn toggle(&self) -> Result<SessionState> {
        let mut core = self.lock();
        match core.state {
            SessionState::Idle => self.start_locked(&mut core)?,
            SessionState::Sampling => self.stop_locked(&mut core),
        }
        Ok(core.state)
    }

    fn start_locked(&self, core: &mut SessionCore) -> Result<()> {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot start sampling: {}", e);
                return Err(GroundStationError::NoRuntime);
            }
        };

        core.state = SessionState::Sampling;
        core.epoch += 1;
        let epoch = core.epoch;
        core.ticker = Some(runtime.spawn(run_ticker(
            Arc::clone(&self.core),
            self.notifier.clone(),
            Instant::now() + self.interval,
            self.interval,
            epoch,
        )));
        core.narrate(&self.notifier, "Simulation started.");

        info!(
            "Sampling started (team {}, every {} ms)",
            self.team_id,
            self.interval.as_millis()
        );
        Ok(())
    }

    fn stop_locked(&self, core: &mut SessionCore) {
        core.state = SessionState::Idle;
        core.epoch += 1;
        if let Some(ticker) = core.ticker.take() {
            ticker.abort();
        }
        core.narrate(&self.notifier, "Simulation stopped.");

        info!("Sampling stopped after {} packets", core.log.len());
    }

    /// Run one sampling step now.
    ///
    /// Used by the sampling task and by hosts that drive the engine
    /// cooperatively instead of through the timer.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(sample))` - the sample that was appended
    /// * `Ok(None)` - the session is idle, nothing happened
    ///
    /// # Errors
    ///
    /// Returns the source's error when it fails to produce a sample. The
    /// failure is narrated and the packet count is not consumed.
    pub fn tick(&self) -> Result<Option<Sample>> {
        let mut core = self.lock();
        if core.state != SessionState::Sampling {
            return Ok(None);
        }
        core.step(&self.notifier).map(Some)
    }

    /// Record an operator command.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCommand` for blank input; nothing is recorded or
    /// narrated in that case.
    pub fn send_command(&self, text: &str) -> Result<CommandRecord> {
        let mut core = self.lock();
        let record = match core.commands.record(text) {
            Ok(record) => record,
            Err(e) => {
                warn!("Rejected command: {}", e);
                return Err(e);
            }
        };

        // Commands are recorded only; there is no uplink to write to.
        core.narrate(&self.notifier, format!("[SENT] {}", record.text));
        info!("Command recorded: {}", record.text);
        Ok(record)
    }

    /// Record one of the predefined quick commands for this team.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in templates; shares the error type of
    /// [`send_command`](Self::send_command).
    pub fn send_template(&self, template: CommandTemplate) -> Result<CommandRecord> {
        self.send_command(&template.render(&self.team_id))
    }

    /// Default export destination for this session.
    #[must_use]
    pub fn export_destination(&self) -> PathBuf {
        self.exporter.destination(&self.team_id)
    }

    /// Export the session log to the configured destination.
    ///
    /// # Returns
    ///
    /// The path that was written.
    ///
    /// # Errors
    ///
    /// Returns `IoFailure` if the destination cannot be written. Sampling
    /// state and the session log are unaffected.
    pub fn export_session(&self) -> Result<PathBuf> {
        let destination = self.export_destination();
        self.export_session_to(&destination)?;
        Ok(destination)
    }

    /// Export the session log to an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `IoFailure` if `destination` cannot be written.
    pub fn export_session_to(&self, destination: &Path) -> Result<()> {
        // Snapshot under the lock, write outside it so ticks are not held up by disk I/O.
        let samples = self.lock().log.snapshot();

        match self.exporter.export(&samples, destination) {
            Ok(()) => {
                info!("Exported {} samples to {}", samples.len(), destination.display());
                self.lock().narrate(
                    &self.notifier,
                    format!("[SAVED] Data saved to {}", destination.display()),
                );
                Ok(())
            }
            Err(e) => {
                error!("Export failed: {}", e);
                self.lock()
                    .narrate(&self.notifier, format!("[ERROR] Export failed: {}", e));
                Err(e)
            }
        }
    }

    /// Copy of every sample recorded so far, in packet order.
    #[must_use]
    pub fn samples(&self) -> Vec<Sample> {
        self.lock().log.snapshot()
    }

    /// Number of samples recorded so far.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.lock().log.len()
    }

    /// Chart values in arrival order.
    #[must_use]
    pub fn chart_series(&self) -> Vec<f64> {
        self.lock().chart.series()
    }

    /// Chart `(packet_count, value)` pairs in arrival order.
    #[must_use]
    pub fn chart_points(&self) -> Vec<(u32, f64)> {
        self.lock().chart.points()
    }

    #[must_use]
    pub fn commands(&self) -> Vec<CommandRecord> {
        self.lock().commands.records().to_vec()
    }

    #[must_use]
    pub fn last_command(&self) -> Option<CommandRecord> {
        self.lock().commands.last().cloned()
    }

    #[must_use]
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.lock().events.entries().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, SessionCore> {
        lock_core(&self.core)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(ticker) = self.lock().ticker.take() {
            ticker.abort();
        }
    }
}

impl SessionCore {
    /// Produce, record and announce one sample.
    fn step(&mut self, notifier: &broadcast::Sender<SessionEvent>) -> Result<Sample> {
        let packet_count = self.log.next_packet_count();

        let sample = match self.source.next_sample(packet_count) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Skipping tick for packet {}: {}", packet_count, e);
                self.narrate(notifier, format!("[ERROR] Packet {} skipped: {}", packet_count, e));
                return Err(e);
            }
        };

        if sample.packet_count != packet_count {
            let e = GroundStationError::PacketOutOfSequence {
                expected: packet_count,
                actual: sample.packet_count,
            };
            warn!("Skipping tick: {}", e);
            self.narrate(notifier, format!("[ERROR] Packet {} skipped: {}", packet_count, e));
            return Err(e);
        }

        let echo = self.commands.last().map(|r| r.text.as_str());
        let sample = sample.with_command_echo(echo);
        let sample = self.log.append(sample)?.clone();
        self.chart.on_sample(&sample);

        let summary = format!(
            "[{}] Packet {}: Alt={}m, Temp={}°C",
            sample.mission_time_str(),
            sample.packet_count,
            sample.altitude,
            sample.temperature
        );
        debug!("{}", summary);

        // No receivers is fine: the presentation layer may not be attached.
        let _ = notifier.send(SessionEvent::SampleAdded(sample.clone()));
        self.narrate(notifier, summary);

        Ok(sample)
    }

    /// Append a line to the event log and announce it.
    fn narrate(&mut self, notifier: &broadcast::Sender<SessionEvent>, message: impl Into<String>) {
        let entry = self.events.append(message);
        let _ = notifier.send(SessionEvent::LogAppended(entry));
    }
}

fn lock_core(core: &Mutex<SessionCore>) -> MutexGuard<'_, SessionCore> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sampling loop for one start/stop epoch.
async fn run_ticker(
    core: Arc<Mutex<SessionCore>>,
    notifier: broadcast::Sender<SessionEvent>,
    first_tick: Instant,
    period: Duration,
    epoch: u64,
) {
    let mut ticks = interval_at(first_tick, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;

        let mut guard = lock_core(&core);
        if guard.epoch != epoch || guard.state != SessionState::Sampling {
            debug!("Sampling task for epoch {} exiting", epoch);
            return;
        }
        // Failures are already narrated; the next tick retries the same packet count.
        let _ = guard.step(&notifier);
    }
}
