//! Calibration session state machine
//!
//! One session at a time, Idle or Running. Start resets the device counter
//! and opens the valve; stop (manual or automatic) closes the valve and
//! produces the result. The automatic stop check runs once per broadcast
//! tick, so the tick period bounds how late an automatic stop can fire.

use std::sync::Arc;
use std::time::Instant;

use flowbridge_device::{DeviceControl, Result as DeviceResult};
use flowbridge_protocol::{BridgeEvent, CalResult, SensorMode, StartParams};
use tokio::sync::Mutex;
use tracing::info;

use crate::telemetry::{SharedTelemetry, Telemetry};

#[derive(Debug, Default)]
struct Session {
    running: bool,
    sensor: SensorMode,
    start_pulses: u64,
    start_weight: f64,
    started_at: Option<Instant>,
    volume_litres: f64,
    target_pulses: Option<u64>,
    target_weight_grams: Option<f64>,
    target_seconds: Option<f64>,
}

impl Session {
    fn elapsed(&self) -> f64 {
        self.started_at
            .map(|t0| t0.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Close out the session against the given snapshot: compute the result,
    /// clear the armed targets, return to Idle.
    fn finish(&mut self, telemetry: &Telemetry) -> CalResult {
        let elapsed = round2(self.elapsed());

        let result = match self.sensor {
            SensorMode::Flow => {
                let delta = telemetry.pulses.saturating_sub(self.start_pulses);
                // A run armed on pulses or seconds is a rate measurement;
                // otherwise the requested volume defines the result.
                if self.target_pulses.is_some() || self.target_seconds.is_some() {
                    flow_rate_result(delta, elapsed)
                } else {
                    flow_volume_result(delta, elapsed, self.volume_litres)
                }
            }
            SensorMode::Scale => {
                let weight = telemetry.weight.unwrap_or(0.0);
                scale_result(weight - self.start_weight, elapsed)
            }
        };

        self.running = false;
        self.target_pulses = None;
        self.target_weight_grams = None;
        self.target_seconds = None;

        result
    }

    /// Has any armed target been reached for this snapshot?
    fn target_hit(&self, telemetry: &Telemetry) -> bool {
        let metric_hit = match self.sensor {
            SensorMode::Flow => self
                .target_pulses
                .map(|target| telemetry.pulses.saturating_sub(self.start_pulses) >= target)
                .unwrap_or(false),
            // An absent scale reading never satisfies a weight target.
            SensorMode::Scale => match (self.target_weight_grams, telemetry.weight) {
                (Some(target), Some(weight)) => weight - self.start_weight >= target,
                _ => false,
            },
        };

        let time_hit = self
            .target_seconds
            .map(|target| self.elapsed() >= target)
            .unwrap_or(false);

        metric_hit || time_hit
    }
}

/// Pulses-per-litre projection for a volume-style run. A zero volume yields
/// a zero rate rather than a division fault.
fn flow_volume_result(delta: u64, elapsed: f64, volume: f64) -> CalResult {
    let ppl = if volume != 0.0 {
        delta as f64 / volume
    } else {
        0.0
    };
    CalResult::Volume {
        delta,
        elapsed,
        volume,
        ppl,
    }
}

/// Pulses-per-second projection for a pulse- or time-armed run. Zero elapsed
/// (stopped in the same tick as started) yields a zero rate.
fn flow_rate_result(delta: u64, elapsed: f64) -> CalResult {
    let pps = if elapsed > 0.0 {
        delta as f64 / elapsed
    } else {
        0.0
    };
    CalResult::Rate {
        delta,
        elapsed,
        pps,
    }
}

/// Grams-per-second for a scale run, with the same zero-elapsed guard.
fn scale_result(delta: f64, elapsed: f64) -> CalResult {
    let rate = if elapsed > 0.0 { delta / elapsed } else { 0.0 };
    CalResult::Scale {
        delta,
        elapsed,
        rate,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Drives calibration sessions against the device and the shared telemetry.
pub struct CalibrationEngine {
    device: Arc<dyn DeviceControl>,
    telemetry: SharedTelemetry,
    session: Mutex<Session>,
}

impl CalibrationEngine {
    pub fn new(device: Arc<dyn DeviceControl>, telemetry: SharedTelemetry) -> Self {
        Self {
            device,
            telemetry,
            session: Mutex::new(Session::default()),
        }
    }

    /// Start a session. Resets the device counter, opens the valve, captures
    /// baselines and arms the supplied targets.
    ///
    /// Returns the acknowledgement to unicast, or `None` when a session is
    /// already running - in which case nothing is sent to the device and the
    /// existing baselines stay untouched.
    pub async fn start(&self, params: StartParams) -> DeviceResult<Option<BridgeEvent>> {
        let mut session = self.session.lock().await;
        if session.running {
            return Ok(None);
        }

        self.device.send_reset()?;
        self.device.open_valve()?;

        // The device counter was just reset; drop the in-memory counters to
        // match so a stale pulse count cannot trip an armed target before
        // the first fresh frame lands.
        let start_weight = {
            let mut telemetry = self.telemetry.write().await;
            telemetry.millis = 0;
            telemetry.pulses = 0;
            telemetry.weight.unwrap_or(0.0)
        };

        *session = Session {
            running: true,
            sensor: params.sensor,
            start_pulses: 0,
            start_weight,
            started_at: Some(Instant::now()),
            volume_litres: params.volume_litres,
            target_pulses: params.target_pulses,
            target_weight_grams: params.target_weight_grams,
            target_seconds: params.target_seconds,
        };

        info!("Calibration started ({:?} mode)", params.sensor);
        Ok(Some(BridgeEvent::ack("started")))
    }

    /// Stop the running session: close the valve and compute the result.
    ///
    /// Returns `None` when no session is running (no device command is sent,
    /// nothing is broadcast).
    pub async fn stop(&self) -> DeviceResult<Option<CalResult>> {
        let mut session = self.session.lock().await;
        if !session.running {
            return Ok(None);
        }

        self.device.close_valve()?;
        let telemetry = *self.telemetry.read().await;
        let result = session.finish(&telemetry);

        info!("Calibration stopped: {:?}", result);
        Ok(Some(result))
    }

    /// Reset the device counter and the in-memory snapshot. Valid in either
    /// state and does not touch the session.
    pub async fn reset(&self) -> DeviceResult<BridgeEvent> {
        self.device.send_reset()?;
        self.telemetry.write().await.zero();
        info!("Counter reset requested");
        Ok(BridgeEvent::ack("reset-sent"))
    }

    /// Automatic stop check, run once per broadcast tick.
    ///
    /// Fires at most once per session: finishing clears the targets and
    /// leaves the session Idle, so subsequent ticks see nothing to do.
    pub async fn evaluate(&self) -> DeviceResult<Option<CalResult>> {
        let mut session = self.session.lock().await;
        if !session.running {
            return Ok(None);
        }

        let telemetry = *self.telemetry.read().await;
        if !session.target_hit(&telemetry) {
            return Ok(None);
        }

        self.device.close_valve()?;
        let result = session.finish(&telemetry);

        info!("Calibration auto-stopped: {:?}", result);
        Ok(Some(result))
    }

    /// Whether a session is currently running.
    pub async fn is_running(&self) -> bool {
        self.session.lock().await.running
    }
}
