pub mod alerter;
pub mod database;
pub mod evaluator;
pub mod monitor;
pub mod producer;

pub use alerter::{render_report, AlertDispatcher};
pub use database::SeenStore;
pub use evaluator::{Evaluation, SuitabilityEvaluator, Valuation};
pub use monitor::{ContractMonitor, CycleStats};
pub use producer::ListingProducer;
