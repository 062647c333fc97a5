//! cliap2 — AirPlay 2 pipe-input streaming client core.
//!
//! Ingests raw audio from a FIFO and command records from a second FIFO,
//! turns the latter into staged track metadata and player/output calls,
//! and keeps wall-clock-to-NTP timing in sync for an external output
//! module. See `README`/`DESIGN.md` for the module map.

pub mod audio_reader;
pub mod cli;
pub mod command_reader;
pub mod config;
pub mod control;
pub mod device;
pub mod error;
pub mod input_driver;
pub mod logging;
pub mod metadata;
pub mod ntp;
pub mod output;
pub mod pipe;
pub mod player;
pub mod queue;
pub mod supervisor;
