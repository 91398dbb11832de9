pub mod capture;
pub mod condition;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod step;
pub mod testutil;
pub mod traits;
pub mod wait;

pub use capture::{CaptureKind, CapturedState, CapturedValue};
pub use condition::Condition;
pub use error::CheckError;
pub use report::{
    ConsoleReporter, Outcome, RunEvent, RunReporter, ScenarioStatus, StepStatus, TracingReporter,
    VerificationResult,
};
pub use runner::{RunnerConfig, ScenarioRunner};
pub use scenario::{Scenario, Viewport};
pub use step::{Expectation, Step, StepAction};
pub use traits::PageDriver;
