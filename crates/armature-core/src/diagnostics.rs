//! Warning collection for non-fatal anomalies.
//!
//! Skippable anomalies never abort condensation; they are logged as
//! they occur and returned to the caller alongside the output so that
//! re-export tooling can surface them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A non-fatal anomaly encountered during condensation.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// A virtual-frame connector could not be resolved to a clustered part.
    #[error("mate connector {connector:?} does not resolve to a known part, skipped")]
    UnresolvedConnector {
        /// Connector name.
        connector: String,
    },

    /// A joint mate's endpoints condensed into the same link.
    #[error("joint mate {mate:?} connects a link to itself, dropped")]
    SelfLoopMate {
        /// Mate name.
        mate: String,
    },

    /// A mate references a part occurrence that is not in the assembly.
    #[error("mate {mate:?} references unknown part {part:?}, skipped")]
    UnknownMatePart {
        /// Mate name.
        mate: String,
        /// The unknown occurrence id.
        part: String,
    },

    /// A part references a module instance that is not in the assembly.
    #[error("part {part:?} references unknown module {module:?}")]
    UnknownModule {
        /// Occurrence id of the part.
        part: String,
        /// The unknown module instance id.
        module: String,
    },

    /// A mate relation does not resolve to two distinct joints.
    #[error("relation {leader:?} -> {follower:?} does not resolve to two distinct joints, skipped")]
    UnknownRelationMate {
        /// Leader mate name.
        leader: String,
        /// Follower mate name.
        follower: String,
    },

    /// A joint is the follower of more than one mate relation.
    #[error("joint for mate {follower:?} already follows a relation, extra relation skipped")]
    DuplicateRelation {
        /// Follower mate name.
        follower: String,
    },

    /// A root link had no member part with a world transform.
    #[error("root link {link:?} has no member with a world transform, seeded at identity")]
    MissingRootTransform {
        /// Link name.
        link: String,
    },

    /// A transform could not be resolved; the parent frame was carried forward.
    #[error("joint {joint:?}: transform of part {part:?} unresolved, carried parent frame forward")]
    DegradedTransform {
        /// Joint name.
        joint: String,
        /// Occurrence id of the part whose transform was unavailable.
        part: String,
    },

    /// A link frame could not be inverted; the parent frame was carried forward.
    #[error("joint {joint:?}: frame of link {link:?} is singular, carried parent frame forward")]
    SingularFrame {
        /// Joint name.
        joint: String,
        /// Name of the link with the degenerate frame.
        link: String,
    },

    /// A joint would give a link a second parent and was dropped.
    #[error("joint {joint:?} would re-parent already-visited link {link:?}, dropped")]
    ExtraEdgeDropped {
        /// Joint name.
        joint: String,
        /// Name of the link that already has a parent.
        link: String,
    },

    /// A surviving joint mimicked a joint that was dropped from the forest.
    #[error("joint {joint:?} mimicked dropped joint {leader:?}, mimic cleared")]
    MimicLeaderDropped {
        /// Follower joint name.
        joint: String,
        /// Name of the dropped leader joint.
        leader: String,
    },

    /// A mate's endpoint lies outside the mate's defining scope.
    #[error("mate {mate:?} joins part {part:?} outside its defining scope {scope:?}")]
    MateOutsideScope {
        /// Mate name.
        mate: String,
        /// Occurrence id of the out-of-scope part.
        part: String,
        /// Module instance id of the defining scope.
        scope: String,
    },

    /// Module-boundary parent/child classification fell back to the tie-break.
    #[error("interface mate {mate:?}: parent/child ambiguous, second endpoint taken as child ({child_module:?})")]
    AmbiguousBoundary {
        /// Mate name.
        mate: String,
        /// Module chosen as child by the tie-break.
        child_module: String,
    },

    /// A second interface mate targeted an already-attached child module.
    #[error("interface mate {mate:?} duplicates the attachment of module {child_module:?}, ignored")]
    DuplicateInterface {
        /// Mate name of the ignored duplicate.
        mate: String,
        /// The already-attached child module.
        child_module: String,
    },
}

/// Collector for [`Warning`]s raised during condensation.
///
/// Each warning is logged through the `log` facade at the moment it is
/// recorded, in addition to being kept for the caller.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning.
    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Warnings recorded so far, in order of occurrence.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Consume the collector, returning all recorded warnings.
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let mut diags = Diagnostics::new();
        diags.warn(Warning::SelfLoopMate {
            mate: "joint_a".to_string(),
        });
        diags.warn(Warning::UnresolvedConnector {
            connector: "frame_tip".to_string(),
        });
        assert_eq!(diags.warnings().len(), 2);
        assert!(matches!(diags.warnings()[0], Warning::SelfLoopMate { .. }));

        let all = diags.into_warnings();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn warning_display_names_the_subject() {
        let w = Warning::DegradedTransform {
            joint: "joint_elbow".to_string(),
            part: "occ_forearm".to_string(),
        };
        let msg = w.to_string();
        assert!(msg.contains("joint_elbow"));
        assert!(msg.contains("occ_forearm"));
    }

    #[test]
    fn warning_serde_round_trip() {
        let w = Warning::ExtraEdgeDropped {
            joint: "joint_x".to_string(),
            link: "base".to_string(),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains(r#""type":"ExtraEdgeDropped""#));
        let back: Warning = serde_json::from_str(&json).unwrap();
        assert_eq!(w, back);
    }
}
