//! Rule-set components and the report aggregator.
//!
//! Each rule set reads one [`ParsedMessage`] and produces its own result
//! structure. The aggregator runs all of them and tolerates any single one
//! failing.

pub mod aggregator;
pub mod authentication_analyzer;

use crate::features::Status;
use crate::ParsedMessage;

/// Result structures that can stand in for a rule set that failed.
pub trait ComponentOutput: Send {
    fn status(&self) -> Status;
    fn failed(error: String) -> Self;
}

/// Trait for all analysis components
pub trait AnalysisComponent: Send + Sync {
    type Output: ComponentOutput;

    fn analyze(&self, message: &ParsedMessage) -> anyhow::Result<Self::Output>;
    fn name(&self) -> &str;
}
