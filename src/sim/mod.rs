/// Logical clock for the current simulation time.
pub mod clock;
pub mod engine;
/// Equipment events and their priority model.
pub mod event;
/// Pending-event queue with cancellation handles.
pub mod queue;
/// Seeded occupant usage scenarios.
pub mod scenario;
pub mod shared;
pub mod summary;
pub mod time;
pub mod types;
