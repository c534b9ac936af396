//! Assembly graph data model for the armature kinematics engine.
//!
//! This crate defines the flat assembly graph that feeds kinematic
//! condensation: part occurrences, mates, mate connectors, sub-assembly
//! module instances, and mate relations. It is shared between the
//! ingestion side (CAD importers) and the condensation engine.
//!
//! The graph is purely declarative: no solid geometry, just occurrences
//! with world poses and the constraints between them. Condensation into
//! a link/joint model is handled separately by `armature-core`.
//!
//! Source CAD conventions are resolved here, once, at ingestion: a mate
//! is a joint iff its raw name carries the [`JOINT_MATE_PREFIX`], and a
//! mate connector marks a virtual frame iff its name carries the
//! [`FRAME_CONNECTOR_PREFIX`]. Downstream code matches on [`MateKind`]
//! and never re-inspects raw names.

use armature_math::Transform;
use serde::{Deserialize, Serialize};

/// Raw-name prefix marking a mate as an intentional degree of freedom.
pub const JOINT_MATE_PREFIX: &str = "joint_";

/// Raw-name prefix marking a mate connector as a virtual frame.
pub const FRAME_CONNECTOR_PREFIX: &str = "frame_";

/// A CAD part occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartNode {
    /// Occurrence path, unique within the assembly.
    pub id: String,
    /// Human-readable display name (not necessarily unique).
    pub name: String,
    /// Direct enclosing module instance id, `None` for root-level parts.
    pub module: Option<String>,
    /// World pose of the occurrence, `None` when the source assembly
    /// did not carry one.
    pub world_transform: Option<Transform>,
}

/// The degree-of-freedom class of a mate, with its motion parameters.
///
/// Assigned once at ingestion (see [`mate_kind_from_name`]); the
/// condensation engine matches on this tag and never inspects raw
/// mate names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MateKind {
    /// No relative motion. Rigid mates drive clustering and never
    /// produce a joint.
    Rigid,
    /// An intentional robot degree of freedom.
    Joint {
        /// Geometric constraint class of the mate.
        mate_type: MateType,
        /// Motion limits, if the source assembly carried any.
        limits: Option<JointLimits>,
    },
}

/// Geometric constraint class of a mate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MateType {
    /// All six degrees of freedom removed.
    Fastened,
    /// Rotation about the mate frame Z axis.
    Revolute,
    /// Translation along the mate frame Z axis.
    Slider,
    /// Rotation about and translation along the mate frame Z axis.
    Cylindrical,
    /// Rotation about the mate frame origin.
    Ball,
    /// Translation in the mate frame XY plane plus rotation about Z.
    Planar,
}

/// Motion limits on a joint mate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct JointLimits {
    /// Lower position bound (radians or meters, per mate type).
    pub lower: Option<f64>,
    /// Upper position bound.
    pub upper: Option<f64>,
    /// Maximum effort (N·m or N).
    pub effort: Option<f64>,
    /// Maximum velocity (rad/s or m/s).
    pub velocity: Option<f64>,
}

impl JointLimits {
    /// Limits for the sign-negated motion convention: position bounds
    /// are negated and swapped, effort and velocity magnitudes kept.
    pub fn inverted(&self) -> Self {
        Self {
            lower: self.upper.map(|v| -v),
            upper: self.lower.map(|v| -v),
            effort: self.effort,
            velocity: self.velocity,
        }
    }
}

/// One side of a mate: the owning part and the pose of the mate's
/// geometric frame in that part's local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MateEntity {
    /// Owning part occurrence id.
    pub part: String,
    /// Part-to-mate-frame transform.
    pub local_transform: Transform,
}

/// A geometric binding between two part occurrences.
///
/// Entity order is meaningful: positive joint motion is defined from
/// the first entity's side, and boundary classification tie-breaks on
/// the second entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mate {
    /// Mate name as authored in the source assembly.
    pub name: String,
    /// Joint-vs-rigid classification with motion parameters.
    pub kind: MateKind,
    /// The two mated sides, in source order.
    pub entities: [MateEntity; 2],
    /// Module instance that owns the mate definition, `None` for
    /// root-level mates. Cross-module mates are owned by the nearest
    /// common enclosing scope.
    pub scope: Option<String>,
    /// Source identifier used to key live joint-value overrides.
    pub id: Option<String>,
}

impl Mate {
    /// Whether this mate produces a joint.
    pub fn is_joint(&self) -> bool {
        matches!(self.kind, MateKind::Joint { .. })
    }

    /// Whether this mate only rigidly binds its two parts.
    pub fn is_rigid(&self) -> bool {
        matches!(self.kind, MateKind::Rigid)
    }
}

/// A named reference point attached to a part occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MateConnector {
    /// Connector name as authored in the source assembly.
    pub name: String,
    /// Owning part occurrence id, `None` when the source connector
    /// could not be resolved to a single occurrence.
    pub owner: Option<String>,
    /// Part-to-connector-frame transform.
    pub local_transform: Transform,
}

impl MateConnector {
    /// Whether this connector marks a virtual frame link.
    pub fn is_frame(&self) -> bool {
        self.name.starts_with(FRAME_CONNECTOR_PREFIX)
    }
}

/// A sub-assembly instance, the unit of modular export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInstance {
    /// Instance id, unique within the assembly.
    pub id: String,
    /// Human-readable module name.
    pub name: String,
    /// Enclosing module instance id, `None` for top-level modules.
    pub parent: Option<String>,
}

/// A motion relation between two joint mates (gears, linkages).
///
/// The follower's joint value tracks the leader's:
/// `follower = multiplier * leader + offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MateRelation {
    /// Mate name of the driving joint.
    pub leader: String,
    /// Mate name of the driven joint.
    pub follower: String,
    /// Ratio applied to the leader's value.
    pub multiplier: f64,
    /// Constant added after the ratio.
    pub offset: f64,
}

/// A flat CAD assembly graph, the input to kinematic condensation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssemblyGraph {
    /// All part occurrences, in source order.
    pub parts: Vec<PartNode>,
    /// All mates, in source order.
    pub mates: Vec<Mate>,
    /// All mate connectors, in source order.
    pub connectors: Vec<MateConnector>,
    /// All module instances, in source order.
    pub modules: Vec<ModuleInstance>,
    /// All mate relations, in source order.
    pub relations: Vec<MateRelation>,
}

impl AssemblyGraph {
    /// Create a new empty assembly graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a part occurrence by id.
    pub fn part(&self, id: &str) -> Option<&PartNode> {
        self.parts.iter().find(|p| p.id == id)
    }

    /// Look up a module instance by id.
    pub fn module(&self, id: &str) -> Option<&ModuleInstance> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Look up a mate by name.
    pub fn mate(&self, name: &str) -> Option<&Mate> {
        self.mates.iter().find(|m| m.name == name)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Classify a raw mate name per the source naming convention.
///
/// Returns [`MateKind::Joint`] iff `name` carries the
/// [`JOINT_MATE_PREFIX`]; `mate_type` and `limits` are only retained
/// in that case (a rigid mate has no motion parameters).
pub fn mate_kind_from_name(
    name: &str,
    mate_type: MateType,
    limits: Option<JointLimits>,
) -> MateKind {
    if name.starts_with(JOINT_MATE_PREFIX) {
        MateKind::Joint { mate_type, limits }
    } else {
        MateKind::Rigid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_assembly() {
        let mut asm = AssemblyGraph::new();

        asm.modules.push(ModuleInstance {
            id: "mod_arm".to_string(),
            name: "Arm".to_string(),
            parent: None,
        });

        asm.parts.push(PartNode {
            id: "occ_base".to_string(),
            name: "Base".to_string(),
            module: None,
            world_transform: Some(Transform::identity()),
        });
        asm.parts.push(PartNode {
            id: "occ_upper".to_string(),
            name: "Upper Arm".to_string(),
            module: Some("mod_arm".to_string()),
            world_transform: Some(Transform::translation(0.0, 0.0, 0.2)),
        });

        asm.mates.push(Mate {
            name: "joint_shoulder".to_string(),
            kind: mate_kind_from_name(
                "joint_shoulder",
                MateType::Revolute,
                Some(JointLimits {
                    lower: Some(-1.5),
                    upper: Some(1.5),
                    effort: None,
                    velocity: None,
                }),
            ),
            entities: [
                MateEntity {
                    part: "occ_base".to_string(),
                    local_transform: Transform::translation(0.0, 0.0, 0.2),
                },
                MateEntity {
                    part: "occ_upper".to_string(),
                    local_transform: Transform::identity(),
                },
            ],
            scope: None,
            id: Some("mv_1".to_string()),
        });

        asm.connectors.push(MateConnector {
            name: "frame_tool_tip".to_string(),
            owner: Some("occ_upper".to_string()),
            local_transform: Transform::translation(0.0, 0.0, 0.35),
        });

        let json = asm.to_json().expect("serialize");
        let restored = AssemblyGraph::from_json(&json).expect("deserialize");

        assert_eq!(asm, restored);
        assert_eq!(restored.parts.len(), 2);
        assert!(restored.mates[0].is_joint());
        assert!(restored.connectors[0].is_frame());
    }

    #[test]
    fn mate_names_classify_once() {
        let kind = mate_kind_from_name("joint_elbow", MateType::Revolute, None);
        assert!(matches!(
            kind,
            MateKind::Joint {
                mate_type: MateType::Revolute,
                limits: None
            }
        ));

        // No prefix: rigid, motion parameters dropped.
        let kind = mate_kind_from_name("Fastened 3", MateType::Revolute, None);
        assert_eq!(kind, MateKind::Rigid);

        // Prefix must be exact, not merely contained.
        let kind = mate_kind_from_name("my_joint_1", MateType::Revolute, None);
        assert_eq!(kind, MateKind::Rigid);
    }

    #[test]
    fn limits_inverted_swaps_and_negates_bounds() {
        let limits = JointLimits {
            lower: Some(-0.5),
            upper: Some(1.2),
            effort: Some(10.0),
            velocity: Some(2.0),
        };
        let inv = limits.inverted();
        assert_eq!(inv.lower, Some(-1.2));
        assert_eq!(inv.upper, Some(0.5));
        assert_eq!(inv.effort, Some(10.0));
        assert_eq!(inv.velocity, Some(2.0));

        let open = JointLimits::default();
        assert_eq!(open.inverted(), open);
    }

    #[test]
    fn serde_tagged_mate_kind() {
        let kind = MateKind::Joint {
            mate_type: MateType::Slider,
            limits: None,
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains(r#""type":"Joint""#));

        let restored: MateKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, restored);

        let rigid: MateKind = serde_json::from_str(r#"{"type":"Rigid"}"#).unwrap();
        assert_eq!(rigid, MateKind::Rigid);
    }

    #[test]
    fn lookup_helpers() {
        let mut asm = AssemblyGraph::new();
        asm.parts.push(PartNode {
            id: "occ_a".to_string(),
            name: "A".to_string(),
            module: None,
            world_transform: None,
        });
        assert!(asm.part("occ_a").is_some());
        assert!(asm.part("occ_b").is_none());
        assert!(asm.module("mod_x").is_none());
    }
}
