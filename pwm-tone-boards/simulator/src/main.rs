use std::path::Path;

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use pwm_tone_common::{ConfigError, PinTopology, error, info, warn};
use pwm_tone_core::{ToneGenerator, ToneState, half_period_us, toggle_count};

mod config;
mod drivers;
mod melody;

use config::{OutputConfig, SimulatorConfig};
use drivers::{GpioFunction, HARDWARE_ALARMS, SimulatorAlarm, SimulatorGpio, SimulatorPwm};
use melody::{BASS, CHIME, Note, length_ms};

type SimulatorTone = ToneGenerator<SimulatorPwm, SimulatorAlarm>;

struct LineReport {
    name: &'static str,
    topology: PinTopology,
    notes: usize,
    expected_toggles: u64,
}

static LINE_DONE: Channel<CriticalSectionRawMutex, LineReport, 2> = Channel::new();

fn build_output(
    output: &OutputConfig,
    pwm: &SimulatorPwm,
    gpio: &mut SimulatorGpio,
    alarm: &SimulatorAlarm,
) -> Result<SimulatorTone, ConfigError> {
    ToneGenerator::new(pwm.clone(), gpio, alarm.clone(), output.topology, output.tone)
}

#[embassy_executor::task(pool_size = 2)]
async fn play_line(
    name: &'static str,
    mut tone: SimulatorTone,
    notes: &'static [Note],
    bpm: u32,
    volume: f32,
    gap_ms: u32,
) {
    let mut played = 0;
    let mut expected_toggles = 0u64;
    info!(
        "[{}] {} notes, {} ms at {} bpm",
        name,
        notes.len(),
        length_ms(notes, bpm),
        bpm
    );

    for note in notes {
        if let Some(request) = note.request(bpm, volume, gap_ms) {
            match tone.play(&request) {
                Ok(()) => {
                    played += 1;
                    let half = half_period_us(request.frequency);
                    expected_toggles += toggle_count(request.duration, request.unit, half) as u64;
                }
                Err(e) => error!("[{}] {} Hz failed: {:?}", name, request.frequency, e),
            }
        }
        Timer::after(Duration::from_millis(note.duration.to_ms(bpm) as u64)).await;
    }

    while tone.state() == ToneState::Running {
        Timer::after_millis(1).await;
    }
    tone.stop_tone();

    let report = LineReport {
        name,
        topology: tone.topology(),
        notes: played,
        expected_toggles,
    };
    drop(tone);
    LINE_DONE.send(report).await;
}

fn load_config() -> SimulatorConfig {
    let Some(path) = std::env::args_os().nth(1) else {
        info!("No board config given, using defaults");
        return SimulatorConfig::default();
    };
    match SimulatorConfig::load(Path::new(&path)) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config();
    info!(
        "Simulator board: {} bpm, volume {}, lead {:?}, bass {:?}",
        config.bpm, config.volume, config.lead.topology, config.bass.topology
    );

    let pwm = SimulatorPwm::new();
    let mut gpio = SimulatorGpio::new();
    let alarm = SimulatorAlarm::new();

    let outputs = build_output(&config.lead, &pwm, &mut gpio, &alarm).and_then(|lead| {
        build_output(&config.bass, &pwm, &mut gpio, &alarm).map(|bass| (lead, bass))
    });
    let (lead, bass) = match outputs {
        Ok(outputs) => outputs,
        Err(e) => {
            error!("Board wiring rejected: {}", e);
            std::process::exit(1);
        }
    };

    for (name, tone, notes) in [("lead", lead, CHIME), ("bass", bass, BASS)] {
        match spawner.spawn(play_line(name, tone, notes, config.bpm, config.volume, config.gap_ms)) {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to spawn {} line: {:?}", name, e);
                std::process::exit(1);
            }
        }
    }

    for _ in 0..2 {
        let line = LINE_DONE.receive().await;
        let pins = [Some(line.topology.plus()), line.topology.minus()];
        for pin in pins.into_iter().flatten() {
            let report = pwm.take_report(pin);
            info!(
                "[{}] GPIO{}: {} notes, {} level changes, {} driven half-periods (schedule: {} toggles)",
                line.name, pin, line.notes, report.changes, report.driven, line.expected_toggles
            );
            if gpio.function(pin) != Some(GpioFunction::Pwm) {
                warn!("[{}] GPIO{} is not routed to PWM", line.name, pin);
            }
            if pwm.level(pin) != 0 {
                warn!("[{}] GPIO{} left at level {}", line.name, pin, pwm.level(pin));
            }
        }
    }

    for hardware_alarm in 0..HARDWARE_ALARMS {
        if alarm.is_claimed(hardware_alarm) {
            warn!("Hardware alarm {} still claimed", hardware_alarm);
        }
    }

    info!("Simulation finished");
    std::process::exit(0);
}
