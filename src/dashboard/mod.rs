//! Dashboard presenter, its display state and tick scheduling.
//!
//! The presenter owns every piece of mutable state (link, session log, sensor
//! values) and is driven by a single [`Scheduler`]. Other tasks only ever see
//! cloned [`DashboardSnapshot`]s published on a `watch` channel.

pub mod presenter;
pub mod scheduler;
pub mod state;

pub use presenter::{Presenter, TickReport};
pub use scheduler::{IntervalScheduler, Scheduler, ScriptedScheduler, TickKind};
pub use state::{ConnectionState, DashboardSnapshot, DashboardState, SensorState};
