pub mod analyze;
pub mod config;
pub mod reachability;
pub mod registry;
pub mod rules;
pub mod semantic;

pub use analyze::report::{AnalysisError, AnalysisReport, Diagnostic, Rule, Span};
pub use analyze::run::{CancellationToken, SourceFile, analyze, analyze_with_cancellation};
pub use config::{AnalysisConfig, DunderAllAuthority, ExecutionMode};
