use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use wakeonle::{
    CdevGpio, Coordinator, CoordinatorHandle, HandshakeState, HciChannel, HciController, LineConfig,
    Polarity, SleepFailurePolicy, WakeConfig, WakeError, WakeLines,
};

mod menu;

use menu::{InputError, Menu, MenuCommand};

/// Level at which a wake line is asserted
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActiveLevel {
    Low,
    High,
}

impl From<ActiveLevel> for Polarity {
    fn from(level: ActiveLevel) -> Self {
        match level {
            ActiveLevel::Low => Polarity::ActiveLow,
            ActiveLevel::High => Polarity::ActiveHigh,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Channel {
    /// Exclusive access, the device must be down
    User,
    /// Shared with the kernel stack
    Raw,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnSleepFailure {
    /// Stop scanning, clear the filter and return to idle
    Teardown,
    /// Leave the filter and scan in place
    Stay,
}

/// Wake on LE - arm an advertisement filter and let the controller sleep
#[derive(Parser, Debug)]
#[command(name = "wakeonle", version, long_about = None)]
struct Args {
    /// HCI device number (hciN)
    #[arg(short = 'd', long, default_value_t = 0)]
    hci: u16,

    /// HCI socket channel
    #[arg(long, value_enum, default_value_t = Channel::User)]
    channel: Channel,

    /// GPIO chip carrying the wake lines
    #[arg(long, default_value = "/dev/gpiochip0")]
    gpio_chip: PathBuf,

    /// Device-wake line offset
    #[arg(long, default_value_t = 0)]
    dev_wake_line: u32,

    /// Device-wake active level
    #[arg(long, value_enum, default_value_t = ActiveLevel::Low)]
    dev_wake_active: ActiveLevel,

    /// Host-wake line offset
    #[arg(long, default_value_t = 1)]
    host_wake_line: u32,

    /// Host-wake active level
    #[arg(long, value_enum, default_value_t = ActiveLevel::Low)]
    host_wake_active: ActiveLevel,

    /// Controller filter slot
    #[arg(long, default_value_t = 0)]
    filter_index: u8,

    /// Company identifier matched with a manufacturer pattern
    #[arg(long, default_value = "0x0009", value_parser = parse_u16)]
    company_id: u16,

    /// Do not combine sleep mode with the controller's low power mode
    #[arg(long)]
    no_combine_low_power: bool,

    /// What to do when the controller refuses sleep mode
    #[arg(long, value_enum, default_value_t = OnSleepFailure::Teardown)]
    on_sleep_failure: OnSleepFailure,

    /// HCI command timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_u16(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("'{}': {}", value, e))
}

impl Args {
    fn to_config(&self) -> anyhow::Result<WakeConfig> {
        let config = WakeConfig {
            hci_device: self.hci,
            hci_channel: match self.channel {
                Channel::User => HciChannel::User,
                Channel::Raw => HciChannel::Raw,
            },
            gpio_chip: self.gpio_chip.clone(),
            device_wake: LineConfig {
                offset: self.dev_wake_line,
                polarity: self.dev_wake_active.into(),
            },
            host_wake: LineConfig {
                offset: self.host_wake_line,
                polarity: self.host_wake_active.into(),
            },
            company_id: self.company_id,
            combine_low_power: !self.no_combine_low_power,
            sleep_failure: match self.on_sleep_failure {
                OnSleepFailure::Teardown => SleepFailurePolicy::Teardown,
                OnSleepFailure::Stay => SleepFailurePolicy::Stay,
            },
            command_timeout: Duration::from_millis(self.timeout_ms),
            ..WakeConfig::default()
        }
        .with_filter_index(self.filter_index)?;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let config = args.to_config()?;

    let ble = HciController::open(config.hci_device, config.hci_channel, config.command_timeout)
        .with_context(|| format!("opening hci{}", config.hci_device))?;
    let gpio = CdevGpio::open(&config.gpio_chip, config.device_wake, config.host_wake)
        .with_context(|| format!("requesting wake lines on {}", config.gpio_chip.display()))?;
    let lines = WakeLines::new(gpio, config.device_wake.polarity, config.host_wake.polarity);

    let (handle, coordinator) = Coordinator::new(ble, lines, &config)
        .spawn()
        .context("starting coordinator")?;
    info!("Wake on LE initialization complete");

    let stdin = io::stdin();
    let mut menu = Menu::new(stdin.lock(), io::stdout(), config.company_id);
    let result = run_menu(&mut menu, &handle);

    handle.shutdown();
    coordinator
        .join()
        .map_err(|_| anyhow!("coordinator thread panicked"))?;
    result
}

fn run_menu<R: io::BufRead, W: io::Write>(
    menu: &mut Menu<R, W>,
    handle: &CoordinatorHandle,
) -> anyhow::Result<()> {
    loop {
        menu.print_menu()?;

        let command = menu.next_command(|| matches!(handle.state(), Ok(HandshakeState::Asleep)));
        let command = match command {
            Ok(command) => command,
            Err(InputError::Cancelled) => {
                warn!("End of input, exiting");
                return Ok(());
            }
            Err(InputError::PromptCancelled) => {
                warn!("User cancelled input");
                continue;
            }
            Err(InputError::Io(e)) => return Err(anyhow!("reading input failed: {}", e)),
            Err(e) => {
                error!("{}", e);
                menu.say("Input error!!")?;
                continue;
            }
        };

        match command {
            MenuCommand::Exit => {
                menu.say("Exit!!")?;
                return Ok(());
            }
            MenuCommand::PrintMenu => {}
            MenuCommand::Disable => report(handle.disable()),
            MenuCommand::Enable(spec) => report(handle.enable(spec)),
            MenuCommand::InSleep => menu.say("In sleep mode")?,
            MenuCommand::Unknown(option) => {
                error!("Unknown option {}", option);
                menu.say("Input error!!")?;
            }
        }
    }
}

fn report(result: Result<HandshakeState, WakeError>) {
    match result {
        Ok(state) => info!("success, now {}", state),
        Err(WakeError::AlreadyInState(state)) => warn!("Nothing to do: {}", state),
        Err(WakeError::Stopped) => error!("Coordinator is not running"),
        Err(e) => error!("{}", e),
    }
}
