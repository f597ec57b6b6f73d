//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the sensor node: mode
//! selection, the per-tick orchestration of links and sampling, the
//! destructive reset, and the provisioning flow.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod controller;
pub mod events;
pub mod ports;
pub mod provisioning;
