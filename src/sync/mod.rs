pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod reporter;
pub mod session;
pub mod synchronizer;


pub use error::{SyncError, Warning};
pub use orchestrator::Orchestrator;
pub use outcome::{BatchOutcome, Outcome};
pub use reporter::{assign_step_verdicts, ExecutionReport, ExecutionReporter};
pub use session::{SessionContext, SessionLifecycleManager};
pub use synchronizer::{has_changed, ResolvedTestCase, SyncAction, TestCaseSynchronizer};
