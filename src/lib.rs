//! Door shadow sync library.
//!
//! Keeps a pair of physical door endpoints in sync with a cloud device
//! shadow over MQTT: an actuator that drives a servo from shadow requests
//! and a sensor that reports a reed contact's transitions.

pub mod clock;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod instance_lock;
pub mod link;
pub mod mqtt;
pub mod sensors;
pub mod shadow;
pub mod simulation;
pub mod supervisor;
