//! cliap2 — AirPlay 2 pipe-input streaming client core.
//!
//! Reads raw audio from a FIFO and command records from a second,
//! `.metadata`-suffixed FIFO; tracks NTP timing and staged track metadata;
//! calls into an external output module and player. The AirPlay 2
//! network/crypto stack itself is out of scope.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use cliap2::cli::{Cli, debug_to_loglevel};
use cliap2::control::Context;
use cliap2::device::DeviceInfo;
use cliap2::error::Error;
use cliap2::ntp::{self, NtpTimestamp};
use cliap2::output::{LoggingOutput, OutputModule};
use cliap2::pipe;
use cliap2::player::NullPlayer;
use cliap2::{config, control, logging, supervisor};

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{PKG_NAME} {PKG_VERSION}");
        return Ok(());
    }

    if cli.check {
        println!("{PKG_NAME} check");
        return Ok(());
    }

    if cli.ntp {
        match ntp::now_ntp() {
            Ok(ts) => {
                println!("{}", ts.as_raw());
                return Ok(());
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }

    let config = config::load(cli.config.as_deref());

    if cli.testrun {
        let ok = run_testrun(&config);
        if ok {
            println!("{PKG_NAME} check");
            return Ok(());
        }
        println!("{PKG_NAME} fail");
        std::process::exit(1);
    }

    let (Some(hostname), Some(audio_pipe)) = (cli.hostname.clone(), cli.pipe.clone()) else {
        eprintln!("{}", Error::config("--hostname and --pipe are required in normal mode"));
        std::process::exit(1);
    };

    let level = cli
        .loglevel
        .or(cli.debug.map(debug_to_loglevel))
        .unwrap_or(config.log_level);
    let domains = cli.logdomains.as_deref().unwrap_or(&config.log_domains);
    logging::init(level, domains);

    if let Err(e) = run(cli, hostname, audio_pipe, config) {
        tracing::error!(target: "main", error = %e, "start-up failed");
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli, hostname: String, audio_pipe: PathBuf, config: config::Config) -> Result<(), Error> {
    let txt = cliap2::device::parse_txt(&cli.txt)?;

    let ntp_start = match cli.ntpstart {
        Some(raw) => NtpTimestamp::from_raw(raw),
        None => ntp::now_ntp()?,
    };

    // Fatal per §7: the audio pipe must exist and be a FIFO at start-up.
    // The reader thread reopens it after this validating open closes it.
    drop(pipe::Pipe::open(&audio_pipe)?);

    let command_pipe = PathBuf::from(format!("{}.metadata", audio_pipe.display()));

    let device = DeviceInfo::new(
        cli.name.clone(),
        hostname,
        cli.address.clone(),
        cli.port,
        txt,
        ntp_start,
        cli.wait,
        cli.latency,
        cli.volume,
        None,
        None,
    );

    let output = Arc::new(LoggingOutput);
    let player = Arc::new(NullPlayer::default());
    let ctx = Context::new(device, output.clone(), player);

    // Scenario 1 (§8): volume_set happens before the first write.
    output.volume_set(cli.volume);

    let threads = control::init(Arc::clone(&ctx), audio_pipe, command_pipe, PKG_NAME.to_string())?;

    supervisor::block_signals()?;
    let mut sup = supervisor::Supervisor::new()?;
    loop {
        match sup.tick(Some(Duration::from_secs(1)))? {
            supervisor::Tick::Continue => continue,
            supervisor::Tick::Shutdown => break,
        }
    }

    control::deinit(&ctx, threads);
    Ok(())
}

fn run_testrun(config: &config::Config) -> bool {
    let result: Result<(), Error> = (|| {
        pipe::ensure(&config.testrun_audio_pipe)?;
        pipe::ensure(&config.testrun_command_pipe)?;
        pipe::remove(&config.testrun_audio_pipe)?;
        pipe::remove(&config.testrun_command_pipe)?;
        Ok(())
    })();
    if let Err(e) = &result {
        tracing::error!(target: "main", error = %e, "testrun failed");
    }
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testrun_creates_and_removes_both_fifos() {
        let dir = tempfile::tempdir().unwrap();
        let config = config::Config {
            testrun_audio_pipe: dir.path().join("testrun.pipe"),
            testrun_command_pipe: dir.path().join("testrun.pipe.metadata"),
            ..config::Config::default()
        };
        assert!(run_testrun(&config));
        assert!(!config.testrun_audio_pipe.exists());
        assert!(!config.testrun_command_pipe.exists());
    }

    #[test]
    fn testrun_fails_when_path_is_not_a_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("testrun.pipe");
        std::fs::write(&audio, b"not a fifo").unwrap();
        let config = config::Config {
            testrun_audio_pipe: audio,
            testrun_command_pipe: dir.path().join("testrun.pipe.metadata"),
            ..config::Config::default()
        };
        assert!(!run_testrun(&config));
    }
}
