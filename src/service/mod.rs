//! Owner-scoped operations behind the HTTP handlers.

pub mod ai;
pub mod analytics;
pub mod resources;

pub use ai::{ChatModel, ChatRequest, ChatResponse, GeminiClient};
pub use analytics::{compute_summary, AnalyticsSummary, DayActivity};
