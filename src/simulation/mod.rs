//! # Battery Simulation Engine
//!
//! Real-time digital twin of an EV traction battery. Driver and environment
//! inputs evolve a coupled electrical/thermal/aging state once per tick.
//!
//! ## Components
//!
//! - **Noise**: unit converters and seedable bounded noise
//! - **Command**: the externally written command vector and its shared handle
//! - **Dynamics**: pure functions for current, voltage, temperature, SOH, SOC and speed
//! - **Integrator**: advances [`SimulationState`] by one wall-clock tick scaled by time warp
//! - **Sampler**: fixed-period telemetry snapshots, session log and live-chart buffers
//! - **Estimator**: the seam that produces the "model" SOC/SOH trajectory
//! - **Drive cycle**: offline coulomb counting over recorded current traces
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use ev_battery_twin::simulation::{
//!     BatteryParams, CommandVector, Integrator, NoiseSource, SimulationState,
//! };
//!
//! let params = BatteryParams::default();
//! let integrator = Integrator::new(params.clone(), 25.0);
//! let mut state = SimulationState::initial(&params, 25.0);
//! let mut noise = NoiseSource::from_seed(Some(1));
//!
//! let cmd = CommandVector { throttle: 50.0, ..Default::default() };
//! integrator.step(&mut state, &cmd, Duration::from_millis(16), &mut noise);
//!
//! assert!(state.current_a < 0.0);
//! ```

pub mod command;
pub mod drive_cycle;
pub mod dynamics;
pub mod estimator;
pub mod integrator;
pub mod noise;
pub mod sampler;
pub mod state;

pub use command::{CommandHandle, CommandUpdate, CommandVector};
pub use drive_cycle::{integrate_soc, DriveCycleResult};
pub use dynamics::BatteryParams;
pub use estimator::{EstimatorConfig, ModelEstimate, NoisyEstimator, SocEstimator};
pub use integrator::{Integrator, StepReport, LOW_CHARGE_CUTOFF_SOC};
pub use noise::NoiseSource;
pub use sampler::{RollingHistory, SessionLog, TelemetryHistory, TelemetrySample, TelemetrySampler};
pub use state::{DerivedState, SimulationState};
