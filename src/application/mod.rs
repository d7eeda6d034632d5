pub mod chain_reactor;
pub mod report;

pub use chain_reactor::{ChainReactor, ChainReactorBuilder};
pub use report::{AgentSummary, ReactionReport, ReactionStatus};
