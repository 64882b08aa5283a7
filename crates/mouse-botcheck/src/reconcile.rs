/*!
# Reconciliation Policy

Two-source reconciliation of the local and remote verdicts.

Disagreement never resolves to BOT under the default policy: a user is not
flagged unless both sources agree, or the remote is unavailable and the
local rule alone says BOT.
*/

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::Classification;

/// Tie-break applied when both verdicts are definite and disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Resolve every conflict to HUMAN.
    #[default]
    FavorHuman,
    /// Resolve every conflict to BOT.
    FavorBot,
    /// Keep the local verdict.
    FavorLocal,
    /// Keep the remote verdict.
    FavorRemote,
}

impl ConflictPolicy {
    fn resolve(self, local: Classification, remote: Classification) -> Classification {
        match self {
            ConflictPolicy::FavorHuman => Classification::Human,
            ConflictPolicy::FavorBot => Classification::Bot,
            ConflictPolicy::FavorLocal => local,
            ConflictPolicy::FavorRemote => remote,
        }
    }
}

/// How the final classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBasis {
    /// Local and remote agree.
    Confirmed,
    /// Remote unavailable; local verdict used alone.
    LocalOnly,
    /// Local and remote disagree; the conflict policy decided.
    ConflictResolved,
    /// Local classifier had no opinion; nothing was decided.
    InsufficientData,
}

impl fmt::Display for DecisionBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = match self {
            DecisionBasis::Confirmed => "confirmed by both classifiers",
            DecisionBasis::LocalOnly => "local only (remote unavailable)",
            DecisionBasis::ConflictResolved => "classifiers disagreed",
            DecisionBasis::InsufficientData => "insufficient data",
        };
        write!(f, "{output}")
    }
}

/// Outcome of reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalClassification {
    pub classification: Classification,
    pub basis: DecisionBasis,
    pub local: Classification,
    pub remote: Classification,
}

impl FinalClassification {
    /// True when the decision was made without a second opinion.
    pub fn is_degraded(&self) -> bool {
        matches!(self.basis, DecisionBasis::LocalOnly)
    }
}

impl fmt::Display for FinalClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}; local {}, remote {})",
            self.classification, self.basis, self.local, self.remote
        )
    }
}

/// Combines the local and remote verdicts into one decision.
///
/// # Parameters
/// - `local`: the local classifier's verdict; `Unknown` short-circuits to an
///   `Unknown` final classification, since a session with too little data
///   never consults the remote.
/// - `remote`: the remote verdict, `Unknown` if the call failed or timed out.
/// - `policy`: tie-break for a definite disagreement.
pub fn reconcile(
    local: Classification,
    remote: Classification,
    policy: ConflictPolicy,
) -> FinalClassification {
    let (classification, basis) = match (local, remote) {
        (Classification::Unknown, _) => (Classification::Unknown, DecisionBasis::InsufficientData),
        (local, Classification::Unknown) => {
            warn!(%local, "remote classification unavailable; falling back to local classification");
            (local, DecisionBasis::LocalOnly)
        }
        (local, remote) if local == remote => {
            info!(%local, "local and remote classifications match");
            (local, DecisionBasis::Confirmed)
        }
        (local, remote) => {
            let resolved: Classification = policy.resolve(local, remote);
            warn!(%local, %remote, ?policy, %resolved, "local and remote classifications disagree");
            (resolved, DecisionBasis::ConflictResolved)
        }
    };

    FinalClassification {
        classification,
        basis,
        local,
        remote,
    }
}
