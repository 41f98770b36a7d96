pub mod gateway;
pub mod model;
pub mod parser;
pub mod report;
pub mod sync;
pub mod utils;

// Re-export common items
pub use gateway::{HttpGateway, RemoteGateway};
pub use model::{TestCaseDefinition, Verdict};
pub use sync::Orchestrator;
pub use utils::config::Options;
