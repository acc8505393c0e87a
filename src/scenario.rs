//! The fixed catalog of named scenarios.
//!
//! Automated scenarios drive a [`Sweeper`] and report pass/fail. Demo
//! scenarios are a single unverified out-of-bounds write meant for manual
//! runs; the runner lists them as disabled and never executes them.

use tracing::{info, warn};

use crate::access::Width;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::isolate::Isolator;
use crate::outcome::Attempt;
use crate::pattern::DiagnosticPattern;
use crate::platform::WORD_SIZE;
use crate::report::{ScenarioReport, Status};
use crate::sweep::Sweeper;

/// Allocation sizes checked by `large_oob_right` sit just below this.
pub const LARGE_POWER_OF_TWO: usize = 1 << 19;

/// Distances below [`LARGE_POWER_OF_TWO`] for `large_oob_right`.
pub const LARGE_SHORTFALLS: [usize; 5] = [16, 32, 64, 128, 256];

/// Largest allocation and offset in `oob_right_exhaustive`.
pub const EXHAUSTIVE_LIMIT: usize = 8;

/// Size of the small block used by the demo scenarios.
pub const DEMO_SMALL: usize = 10;

/// Tool name every HWAddressSanitizer report carries.
pub const HWASAN_TOOL: &str = "HWAddressSanitizer";

type CheckedFn = fn(&mut Sweeper<'_>, &HarnessConfig) -> Result<(), HarnessError>;
type DemoFn = fn(&HarnessConfig) -> Attempt;

#[derive(Clone, Copy)]
pub enum Body {
    Checked(CheckedFn),
    Demo(DemoFn),
}

/// What a run must provide before a scenario executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requires {
    Nothing,
    /// Optional sweep, skipped when the configured max width is narrower.
    Width(Width),
    /// An aarch64 probe built with HWAddressSanitizer.
    Hwasan,
}

#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    pub requires: Requires,
    pub body: Body,
}

impl Scenario {
    /// Why this scenario cannot run under `config`, if it cannot.
    pub fn skip_reason(&self, config: &HarnessConfig) -> Option<String> {
        match self.requires {
            Requires::Nothing => None,
            Requires::Width(width) if width.bytes() > config.max_width => Some(format!(
                "needs {}-byte accesses, max width is {}",
                width.bytes(),
                config.max_width
            )),
            Requires::Width(_) => None,
            Requires::Hwasan if !cfg!(target_arch = "aarch64") => {
                Some("HWAddressSanitizer runs on aarch64 only".to_string())
            }
            Requires::Hwasan if !config.hwasan => {
                Some("probe is not built with HWAddressSanitizer".to_string())
            }
            Requires::Hwasan => None,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.body, Body::Demo(_))
    }

    /// The single attempt a demo performs, or `None` for automated scenarios.
    pub fn demo_attempt(&self, config: &HarnessConfig) -> Option<Attempt> {
        match self.body {
            Body::Demo(attempt) => Some(attempt(config)),
            Body::Checked(_) => None,
        }
    }
}

static CATALOG: [Scenario; 11] = [
    Scenario {
        name: "oob_char",
        summary: "boundary sweep with 1-byte writes",
        requires: Requires::Nothing,
        body: Body::Checked(oob_char),
    },
    Scenario {
        name: "oob_short",
        summary: "boundary sweep with 2-byte writes",
        requires: Requires::Width(Width::Two),
        body: Body::Checked(oob_short),
    },
    Scenario {
        name: "oob_int",
        summary: "boundary sweep with 4-byte writes",
        requires: Requires::Nothing,
        body: Body::Checked(oob_int),
    },
    Scenario {
        name: "oob_long",
        summary: "boundary sweep with 8-byte writes",
        requires: Requires::Width(Width::Eight),
        body: Body::Checked(oob_long),
    },
    Scenario {
        name: "oob_right_exhaustive",
        summary: "every width up to the word, sizes 1-8, aligned offsets 0-8",
        requires: Requires::Nothing,
        body: Body::Checked(oob_right_exhaustive),
    },
    Scenario {
        name: "large_oob_right",
        summary: "first byte past blocks just below 2^19",
        requires: Requires::Nothing,
        body: Body::Checked(large_oob_right),
    },
    Scenario {
        name: "hwasan_smoke",
        summary: "one byte past a 1-byte block, HWAddressSanitizer report",
        requires: Requires::Hwasan,
        body: Body::Checked(hwasan_smoke),
    },
    Scenario {
        name: "demo_oob_left_low",
        summary: "one byte before a 10-byte block",
        requires: Requires::Nothing,
        body: Body::Demo(|_| Attempt::new(DEMO_SMALL, -1, Width::One)),
    },
    Scenario {
        name: "demo_oob_left_high",
        summary: "one byte before the large block",
        requires: Requires::Nothing,
        body: Body::Demo(|config| Attempt::new(config.large_malloc, -1, Width::One)),
    },
    Scenario {
        name: "demo_oob_right_low",
        summary: "first byte past a 10-byte block",
        requires: Requires::Nothing,
        body: Body::Demo(|_| Attempt::new(DEMO_SMALL, DEMO_SMALL as isize, Width::One)),
    },
    Scenario {
        name: "demo_oob_right_high",
        summary: "first byte past the large block",
        requires: Requires::Nothing,
        body: Body::Demo(|config| {
            Attempt::new(config.large_malloc, config.large_malloc as isize, Width::One)
        }),
    },
];

pub fn catalog() -> &'static [Scenario] {
    &CATALOG
}

pub fn find(name: &str) -> Option<&'static Scenario> {
    CATALOG.iter().find(|s| s.name == name)
}

fn oob_char(sweeper: &mut Sweeper<'_>, config: &HarnessConfig) -> Result<(), HarnessError> {
    sweeper.sweep(Width::One, config.large_malloc)
}

fn oob_short(sweeper: &mut Sweeper<'_>, config: &HarnessConfig) -> Result<(), HarnessError> {
    sweeper.sweep(Width::Two, config.large_malloc)
}

fn oob_int(sweeper: &mut Sweeper<'_>, config: &HarnessConfig) -> Result<(), HarnessError> {
    sweeper.sweep(Width::Four, config.large_malloc)
}

fn oob_long(sweeper: &mut Sweeper<'_>, config: &HarnessConfig) -> Result<(), HarnessError> {
    sweeper.sweep(Width::Eight, config.large_malloc)
}

/// Classifies each (width, size, offset) on its own instead of through the
/// sweep formula, so off-by-one slips between sweep steps still show up.
fn oob_right_exhaustive(
    sweeper: &mut Sweeper<'_>,
    _config: &HarnessConfig,
) -> Result<(), HarnessError> {
    for width in Width::up_to(WORD_SIZE) {
        for size in 1..=EXHAUSTIVE_LIMIT {
            for offset in (0..=EXHAUSTIVE_LIMIT).step_by(width.bytes()) {
                sweeper.check(Attempt::aligned(size, offset as isize, width))?;
            }
        }
    }
    Ok(())
}

fn large_oob_right(sweeper: &mut Sweeper<'_>, _config: &HarnessConfig) -> Result<(), HarnessError> {
    for shortfall in LARGE_SHORTFALLS {
        let size = LARGE_POWER_OF_TWO - shortfall;
        sweeper.check(Attempt::new(size, size as isize, Width::One))?;
    }
    Ok(())
}

/// Tagging checkers report by tool name rather than by distance.
fn hwasan_smoke(sweeper: &mut Sweeper<'_>, _config: &HarnessConfig) -> Result<(), HarnessError> {
    let pattern = DiagnosticPattern::mentions(HWASAN_TOOL)?;
    sweeper.check_reported(Attempt::new(1, 1, Width::One), &pattern)
}

/// Run one scenario to completion and report it.
pub fn run(scenario: &Scenario, isolator: &dyn Isolator, config: &HarnessConfig) -> ScenarioReport {
    let checked = match scenario.body {
        Body::Demo(_) => {
            return ScenarioReport::not_run(
                scenario.name,
                Status::Disabled,
                "manual demo; run with `overrun-harness demo`",
            );
        }
        Body::Checked(checked) => checked,
    };
    if let Some(reason) = scenario.skip_reason(config) {
        return ScenarioReport::not_run(scenario.name, Status::Skipped, reason);
    }

    info!(scenario = scenario.name, "scenario started");
    let mut sweeper = Sweeper::new(isolator);
    match checked(&mut sweeper, config) {
        Ok(()) => {
            info!(
                scenario = scenario.name,
                attempts = sweeper.attempts(),
                "scenario passed"
            );
            ScenarioReport::passed(scenario.name, sweeper.attempts())
        }
        Err(err) => {
            warn!(scenario = scenario.name, error = %err, "scenario failed");
            ScenarioReport::failed(scenario.name, sweeper.attempts(), &err)
        }
    }
}

/// Run the named scenarios in catalog order, or all of them when `names` is
/// empty. Unknown names are rejected before anything runs.
pub fn run_selected<S: AsRef<str>>(
    names: &[S],
    isolator: &dyn Isolator,
    config: &HarnessConfig,
) -> Result<Vec<ScenarioReport>, HarnessError> {
    if let Some(unknown) = names.iter().find(|n| find(n.as_ref()).is_none()) {
        return Err(HarnessError::UnknownScenario(unknown.as_ref().to_string()));
    }
    Ok(CATALOG
        .iter()
        .filter(|s| names.is_empty() || names.iter().any(|n| n.as_ref() == s.name))
        .map(|s| run(s, isolator, config))
        .collect())
}
