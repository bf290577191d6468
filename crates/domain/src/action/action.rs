use super::chain::ActionChain;
use serde::{Deserialize, Serialize};

/// A persisted IF → THEN → {success|error} rule.
///
/// Invariants (enforced by the admin API on write, assumed by the core on
/// read): `name` is globally unique; `chain.if_node.source == "io"`; every
/// referenced device exists; every referenced topic appears in the
/// referencing device model's topic schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub chain: ActionChain,
}
