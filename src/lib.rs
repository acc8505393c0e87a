//! Boundary-overrun verification harness.
//!
//! Death-tests a heap memory checker (AddressSanitizer or anything that
//! reports like it): every write just before, inside and just after an
//! allocation is run in its own process, and the checker must kill exactly the
//! out-of-bounds ones with a report naming the right distance and side.
//!
//! The checker is a black box. Build the harness binary with it enabled
//! (e.g. `RUSTFLAGS=-Zsanitizer=address`) and run `overrun-harness run`.

mod platform;

pub mod access;
pub mod alloc_chain;
pub mod config;
pub mod error;
pub mod isolate;
pub mod outcome;
pub mod pattern;
pub mod probe;
pub mod report;
pub mod scenario;
pub mod sweep;
pub mod telemetry;

pub use access::Width;
pub use config::HarnessConfig;
pub use error::{CaseFailure, HarnessError, Observed};
pub use isolate::{Isolator, ProcessIsolator, Termination};
pub use outcome::{Alignment, Attempt, Direction, Expected};
pub use pattern::DiagnosticPattern;
pub use report::{ScenarioReport, Status};
pub use scenario::{Scenario, catalog};
pub use sweep::{Case, Sweeper, Zone};

/// Width of the platform's native machine word in bytes.
pub const WORD_SIZE: usize = platform::WORD_SIZE;
