pub mod admin;
pub mod aggregator;
pub mod engine;
pub mod evaluation;
pub mod fanout;
pub mod modules;
pub mod name;
pub mod readiness;
pub mod scanner;

pub use admin::AdminActions;
pub use aggregator::{AggregateOutcome, ProfileAggregator};
pub use engine::{with_deadline, InsightsEngine};
pub use evaluation::{EvaluationCache, EvaluationResult, Evaluator};
pub use fanout::fan_out;
pub use modules::{ModuleProbe, ModuleSet, ProbeOrder, WorkspaceModule};
pub use name::extract_venture_name;
pub use readiness::compute_readiness;
pub use scanner::FleetScanner;
