//! cadence core types
//!
//! Identifiers, errors, digests, versions and clocks shared by the planner
//! and the runtime. No I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hash;
pub mod id;
pub mod time;
pub mod version;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use hash::{Hash, HashError};
pub use id::{PlanId, RequestId, RunId, ScenarioId, StageId, StepId, TenantId};
pub use time::{Clock, ManualClock, SystemClock};
pub use version::{Version, VersionError};
