//! The probe sequence run against one device.

use gigecam_core::{CameraError, Connector, Device, PropertyId, ThroughputMonitor, ThroughputReport};
use tracing::{info, warn};

use crate::config::RunConfig;

/// Outcome of a completed probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeSummary {
    /// Frames grabbed successfully.
    pub frames: u32,
    /// Properties whose read-back differed from the requested value.
    pub rejected_properties: Vec<u32>,
    /// Statistics of the last closed monitor window.
    pub last_report: Option<ThroughputReport>,
    /// Whether the camera acknowledged the final release.
    pub released: bool,
}

/// Ping, open, configure, grab and release.
///
/// Fails only if the camera cannot be reached or opened. A failed grab
/// ends the loop early and is reflected in [`ProbeSummary::frames`].
pub async fn run<C: Connector>(
    device: &mut Device<C>,
    run: &RunConfig,
    cycle_count: u32,
) -> Result<ProbeSummary, CameraError> {
    let keep_alive = run.keep_alive;
    let mut summary = ProbeSummary::default();
    let mut monitor = ThroughputMonitor::new(cycle_count)?;

    device.try_ping(keep_alive).await?;
    info!(endpoint = %device.endpoint(), "camera replied");

    if device.try_is_opened(keep_alive).await? {
        info!("camera already open");
    } else {
        device.try_open(keep_alive).await?;
        info!("camera opened");
    }

    for setting in &run.properties {
        let property = PropertyId(setting.id);
        if !device.set(property, setting.value, keep_alive).await {
            warn!(%property, value = setting.value, "set refused");
        }
        match device.get(property, keep_alive).await {
            Some(actual) if actual == setting.value => {
                info!(%property, value = actual, "property applied");
            }
            actual => {
                warn!(%property, requested = setting.value, ?actual, "property not applied");
                summary.rejected_properties.push(setting.id);
            }
        }
    }

    for i in 0..run.frames {
        let Some(image) = device.read(keep_alive).await else {
            warn!(frame = i, "grab failed; stopping");
            break;
        };
        summary.frames += 1;
        if monitor.record_sample(image.byte_len()) {
            info!(
                fps = monitor.current_fps(),
                mean_size = monitor.current_mean_size(),
                "throughput"
            );
        }
    }
    summary.last_report = monitor.report();

    summary.released = device.release(false).await;
    if summary.released {
        info!("camera released");
    } else {
        warn!("camera release failed");
    }
    Ok(summary)
}

// ── Tests ────────────────────────────────────────────────────────
