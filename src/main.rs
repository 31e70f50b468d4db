use log::*;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{
        delay::Ets,
        gpio::{PinDriver, Pull},
        ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver},
        peripherals::Peripherals,
        prelude::*,
    },
    log::EspLogger,
    nvs::EspDefaultNvsPartition,
    timer::EspTaskTimerService,
};
use motion::{FreeRunning, Motion, MotionHandle, StepGenerator, StepMode, Toggled};
use network::{HttpTransport, SyncLoop};
use wifi::Wifi;

mod config;
mod tick;
mod transport;

use config::Config;
use tick::TickTask;
use transport::EspTransport;

#[no_mangle]
pub extern "C" fn __pender() {
    // For ESP-IDF with FreeRTOS, this is typically a no-op when using
    // the embassy-time-driver feature, as the time driver handles wake-ups
    // This stub satisfies the linker requirement
}

fn main() -> anyhow::Result<()> {
    // Required for ESP-IDF patches
    esp_idf_svc::sys::link_patches();

    // Initialize logger and system loop
    EspLogger::initialize_default();
    let config = Config::load()?;
    let sysloop = EspSystemEventLoop::take()?;

    // Initialize peripherals and nvs
    let peripherals = Peripherals::take()?;
    let nvs_default = EspDefaultNvsPartition::take()?;

    // ======== Motion: driver lines ========
    let actuator = &config.actuator;
    info!(
        "Actuator: {} steps over {} units, {} steps/s, {:?} stepping",
        actuator.max_steps(),
        actuator.travel_length,
        actuator.step_rate,
        actuator.step_mode
    );

    let step = match actuator.step_mode {
        StepMode::Pwm => {
            let timer = LedcTimerDriver::new(
                peripherals.ledc.timer0,
                &TimerConfig::new().frequency(actuator.step_rate.Hz()),
            )?;
            let channel = LedcDriver::new(peripherals.ledc.channel0, timer, peripherals.pins.gpio15)?;
            StepGenerator::FreeRunning(FreeRunning::start(channel)?)
        }
        StepMode::Toggle => StepGenerator::Toggled(Toggled::new(
            PinDriver::output(peripherals.pins.gpio15)?,
            Ets,
            actuator.step_rate,
        )),
    };

    let direction = PinDriver::output(peripherals.pins.gpio16)?;
    let enable = PinDriver::output(peripherals.pins.gpio17)?;
    let mut endstop = PinDriver::input(peripherals.pins.gpio14)?;
    endstop.set_pull(if actuator.endstop_active_low {
        Pull::Up
    } else {
        Pull::Down
    })?;

    let motion = MotionHandle::new(Motion::new(actuator, step, direction, enable, endstop));

    // ======== Motion: periodic tick ========
    let timer_service = EspTaskTimerService::new()?;
    let ticker = motion.clone();
    let _tick = TickTask::start(&timer_service, actuator.tick_period(), move || ticker.tick())?;

    // ======== Network ========
    let wifi = Wifi::new(peripherals.modem, sysloop, nvs_default)?;
    let http = HttpTransport::new(config.device_url(), config.request_timeout());
    let transport = EspTransport::new(wifi, http, config.credentials());

    info!("Starting sync loop for {:?}", config.device.name);
    let mut sync = SyncLoop::new(motion, transport, config.sync.clone());
    sync.run()
}
