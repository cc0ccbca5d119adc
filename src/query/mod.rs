//! Query front end: statement parsing, access path planning and execution.

mod condition;
mod engine;
mod parser;
mod plan;

pub use condition::{Comparator, Condition};
pub use engine::{parse_load_line, Outcome, SqlEngine, PROMPT};
pub use parser::{parse_statement, SelectTarget, Statement};
pub use plan::{plan, AccessPath, KeyRange};
