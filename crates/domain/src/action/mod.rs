mod action;
mod chain;
mod repository;
mod runtime;
mod subscription_index;

pub use action::Action;
pub use chain::{ActionChain, BranchKind, BranchNode, IfNode, ThenNode, FORWARD_IF_PAYLOAD};
pub use repository::ActionRepository;
pub use runtime::{ActionRuntime, ActionState};
pub use subscription_index::SubscriptionIndex;
