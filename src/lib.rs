//! Discrete-event simulator for household equipment driven by timed
//! switch-on, switch-off and set-power events.

pub mod config;
/// Lamp, fan and heat pump models and the role interfaces they expose.
pub mod equipment;
pub mod error;
pub mod io;
/// Strategies splitting a heat pump's power budget across its sub-loads.
pub mod policy;
pub mod runner;
/// Events, their queue and the engine executing them.
pub mod sim;
