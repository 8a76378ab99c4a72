//! Typed events delivered by the callback listener.

use gatescope_protocol::{ClockPayload, StopPayload, ValuePayload};

/// Why the simulator pushed a stop payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    Breakpoint,
    Step,
    Exception,
}

/// Events pushed by the simulator through the callback listener.
///
/// Ordering relative to outbound control calls is not guaranteed: a stop
/// may arrive before the continue call that triggered it has been
/// acknowledged. Consumers must treat their own snapshots as eventually
/// consistent and re-fetch across suspension points.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// Execution paused; the frame snapshot must be replaced.
    Stopped { cause: StopCause, payload: StopPayload },
    /// Paused on a clock edge; the frame snapshot is untouched.
    ClockPaused(ClockPayload),
    /// A monitored handle changed value.
    Value(ValuePayload),
    /// The simulator reached a synchronization point; arbitrary scope
    /// queries are safe until the next resume.
    Synchronized,
    /// The simulator is shutting down the session.
    Terminated,
}
