//! The tools the agent ships with.

mod calculator;
mod date_time;
mod web_search;

pub use calculator::{CalculatorTool, EvalError, evaluate};
pub use date_time::{DateTimeError, DateTimeReport, DateTimeTool, format_date_time};
pub use web_search::{SearchResult, TAVILY_SEARCH_URL, WebSearchTool};
