//! # PeryScope RS
//!
//! A Rust driver for the Perytech USB oscilloscope, speaking its
//! reverse-engineered register protocol over `rusb`.
//!
//! The device exposes 16-bit registers behind vendor control requests and a
//! pair of bulk endpoints. Before it produces usable samples it needs a long
//! bring-up handshake and a calibration sweep, and several of its
//! configuration registers are write-only and pack settings of both channels.
//! This crate replays the handshake, shadows the write-only registers and
//! runs the arm/poll/drain acquisition cycle.
//!
//! ## Features
//!
//! - **Device discovery**: Finds `23e9:0001` devices through `rusb`
//! - **Bring-up**: Byte-exact link and initial stages, including the calibration sweep
//! - **Shadowed configuration**: Voltage range, coupling and trigger settings never clobber each other
//! - **Write coalescing**: Setters skip the bus when the value is already applied
//! - **Acquisition**: Triggered capture with timeout, trigger offset and cooperative cancellation
//! - **DataFrame output**: Uses `polars` for the captured samples
//! - **Thread safety**: One lock per session serializes every register access
//!
//! ## Examples
//!
//! ### Connecting and Capturing
//!
//! ```rust,no_run
//! use peryscope_rs::{AcquisitionRequest, DeviceSession, SampleRate, SessionConfig};
//! use std::time::Duration;
//!
//! let (session, report) = DeviceSession::connect(SessionConfig::default(), false)?;
//! println!("bring-up skipped: {}", report.skipped);
//!
//! session.set_sample_rate(SampleRate::MS1)?;
//! let request = AcquisitionRequest::new(2000).with_trigger_timeout(Duration::from_millis(500));
//! let result = session.acquire(&request)?;
//! println!("Captured {} samples, triggered: {}", result.sample_count(), result.triggered);
//! # Ok::<(), peryscope_rs::ScopeError>(())
//! ```
//!
//! ### Trigger Configuration
//!
//! ```rust
//! use peryscope_rs::{Channel, TriggerEdge, TriggerLevel, TriggerSetting};
//!
//! let trigger = TriggerSetting::start_capturing_when(Channel::Ch2)
//!     .other_level(-10)
//!     .rises_above(40);
//!
//! assert_eq!(trigger.edge, TriggerEdge::Rising);
//! assert_eq!(trigger.level(Channel::Ch2), Some(TriggerLevel(40)));
//! ```
//!
//! ### Channel Settings
//!
//! ```rust,no_run
//! use peryscope_rs::{Channel, Coupling, DeviceSession, SessionConfig, VoltageRange};
//!
//! let (session, _) = DeviceSession::connect(SessionConfig::default(), false)?;
//! session.set_voltage_range(Channel::Ch1, VoltageRange::MV200)?;
//! session.set_voltage_range(Channel::Ch2, VoltageRange::V2)?;
//! session.set_coupling(Channel::Ch1, Coupling::Ac)?;
//!
//! let config = session.config_snapshot();
//! assert_eq!(config.voltage_range(Channel::Ch1), Some(VoltageRange::MV200));
//! assert_eq!(config.voltage_range(Channel::Ch2), Some(VoltageRange::V2));
//! # Ok::<(), peryscope_rs::ScopeError>(())
//! ```
//!
//! ### Device Discovery
//!
//! ```rust,no_run
//! use peryscope_rs::PeryConnector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! for device in PeryConnector::available_devices()? {
//!     println!("Found device: {}", device);
//! }
//!
//! // Open the first one with a custom transfer timeout
//! let transport = PeryConnector::connect(Some(std::time::Duration::from_millis(250)))?;
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod bringup;
pub mod config_state;
pub mod connector;
pub mod registers;
pub mod session;
pub mod settings;
mod shift_tables;
pub mod transport;
pub mod trigger_config;

#[cfg(test)]
mod mock_transport;

// Re-export the main types for convenience
pub use acquisition::{
    AcquisitionError, AcquisitionPhase, AcquisitionRequest, AcquisitionResult, CancelToken,
};

pub use bringup::BringUpReport;

pub use config_state::{ConfigError, ConfigState};

pub use connector::{ConnectorError, PeryConnector, PeryDevice};

pub use registers::{Reg, StatusSnapshot, VerificationMismatch};

pub use session::{DeviceSession, ScopeError, SessionConfig, SessionState};

pub use settings::{Channel, Coupling, SampleRate, VoltageRange};

pub use transport::{RusbTransport, TransportError, UsbTransport};

pub use trigger_config::{TriggerBuilder, TriggerEdge, TriggerLevel, TriggerSetting};
