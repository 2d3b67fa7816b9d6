pub mod decision;
pub mod evaluator;
pub mod knowledge;
pub mod learning;
pub mod probability;
pub mod runner;
pub mod store;
pub mod tactics;

pub use decision::{DecisionContext, DecisionEngine, DecisionParams, Difficulty, keep_value};
pub use evaluator::{EvaluatorWeights, PositionEvaluator};
pub use knowledge::{DecisionKind, KnowledgeRecord, KnowledgeView};
pub use learning::{LearningPlan, TacticLearner, commit_plan};
pub use probability::ProbabilityEstimator;
pub use runner::{MatchReport, MatchRunner, RunnerError};
pub use store::{InMemoryStore, KnowledgeStore, RetryPolicy, StoreError, TacticStore, load_sources};
pub use tactics::{
    ActionKind, CardPreference, Scenario, Tactic, TacticAction, TacticAdapter, TacticDirective,
};
