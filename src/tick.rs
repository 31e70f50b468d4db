use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};
use log::*;
use std::time::Duration;

/// Periodic motion tick on the ESP timer task.
///
/// Runs from `start` until `stop` or drop.
pub struct TickTask {
    timer: Option<EspTimer<'static>>,
}

impl TickTask {
    pub fn start<F>(service: &EspTaskTimerService, period: Duration, tick: F) -> anyhow::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let timer = service.timer(tick)?;
        timer.every(period)?;
        info!("Motion tick running every {:?}", period);
        Ok(TickTask { timer: Some(timer) })
    }

    pub fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(timer) = self.timer.take() {
            timer.cancel()?;
            info!("Motion tick stopped");
        }
        Ok(())
    }
}

impl Drop for TickTask {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop motion tick: {:?}", e);
        }
    }
}
