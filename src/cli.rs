//! Command line interface

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::{config, devices, record};
use crate::domain::{Configuration, RadioType, RigError, RigResult};
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding configuration profiles
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// List serial ports
    Ports,
    /// List audio input devices
    AudioDevices,
    /// List supported radios
    Radios,
    /// Manage configuration profiles
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Record a session until Enter is pressed
    Record(RecordArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    List,
    Show {
        name: String,
    },
    /// Create a profile with default settings
    Init {
        name: String,
        #[arg(long)]
        radio: Option<RadioType>,
        #[arg(long)]
        port: Option<String>,
    },
    Delete {
        name: String,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct RecordArgs {
    /// Profile to load; defaults apply when omitted
    #[arg(short, long)]
    pub profile: Option<String>,
    /// Override the profile's radio
    #[arg(long)]
    pub radio: Option<RadioType>,
    #[arg(long)]
    pub port: Option<String>,
    #[arg(long)]
    pub baud: Option<u32>,
    #[arg(long)]
    pub audio_input: Option<String>,
    /// Stop after this many seconds
    #[arg(short, long)]
    pub duration: Option<u64>,
    #[arg(short, long)]
    pub output_dir: Option<String>,
}

impl RecordArgs {
    /// Apply command line overrides on top of a loaded profile.
    pub fn apply(&self, mut config: Configuration) -> Configuration {
        if let Some(radio) = self.radio {
            config.radio_type = radio;
        }
        if let Some(port) = &self.port {
            config.serial_port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.baud_rate = Some(baud);
        }
        if let Some(input) = &self.audio_input {
            config.audio_input = Some(input.clone());
        }
        if let Some(secs) = self.duration {
            config.max_duration_secs = Some(secs);
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> RigResult<()> {
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => config::default_config_dir()?,
    };

    match cli.command {
        CliCommand::Ports => {
            for port in devices::list_serial_ports()? {
                println!("{}\t{}", port.name, port.port_type);
            }
        }
        CliCommand::AudioDevices => {
            for device in devices::list_audio_devices()? {
                let marker = if device.is_default { " (default)" } else { "" };
                println!("{}{marker}", device.name);
            }
        }
        CliCommand::Radios => {
            for radio in devices::list_radio_types() {
                println!("{}\t{}\t{:?}", radio.id, radio.name, radio.baud_rates);
            }
        }
        CliCommand::Config { action } => match action {
            ConfigAction::List => {
                for name in config::list_configurations(&config_dir)? {
                    println!("{name}");
                }
            }
            ConfigAction::Show { name } => {
                let profile = config::load_configuration(&config_dir, &name)?;
                let json = serde_json::to_string_pretty(&profile)
                    .map_err(|e| RigError::Config(format!("Serialization error: {e}")))?;
                println!("{json}");
            }
            ConfigAction::Init { name, radio, port } => {
                let profile = Configuration {
                    name,
                    radio_type: radio.unwrap_or(Configuration::default().radio_type),
                    serial_port: port,
                    ..Configuration::default()
                };
                config::save_configuration(&config_dir, &profile)?;
            }
            ConfigAction::Delete { name } => config::delete_configuration(&config_dir, &name)?,
        },
        CliCommand::Record(args) => {
            let profile = match &args.profile {
                Some(name) => config::load_configuration(&config_dir, name)?,
                None => Configuration::default(),
            };
            let profile = args.apply(profile);
            let state = AppState::new(&profile);

            println!("Recording with {}. Press Enter to stop.", profile.radio_type);
            let report = record::record_session(&state, &profile)?;
            println!(
                "Done: {} video frames, {} metadata records, {} audio samples",
                report.video_frames, report.metadata_records, report.audio_samples
            );
        }
    }
    Ok(())
}
