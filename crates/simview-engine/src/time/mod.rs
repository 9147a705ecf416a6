//! Time subsystem.
//!
//! Provides a repeating timer that the runtime polls from its event loop.
//! Kept free of winit types so its firing rules are testable in isolation.

mod timer;

pub use timer::RepeatingTimer;
