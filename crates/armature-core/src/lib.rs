//! Kinematic condensation of flat CAD assemblies into link/joint trees.
//!
//! An assembly arrives as a flat list of part occurrences, mates,
//! connectors and module tags with no kinematic hierarchy. [`condense`]
//! collapses rigidly fastened parts into links, orients joint mates
//! into a forest, propagates world frames breadth-first from grounded
//! roots, and resolves where each module attaches to its surroundings.
//!
//! # Example
//! ```
//! use armature_assembly::{
//!     AssemblyGraph, Mate, MateEntity, MateKind, MateType, PartNode,
//! };
//! use armature_core::{condense, CondenseSettings};
//! use armature_math::Transform;
//!
//! let mut assembly = AssemblyGraph::new();
//! assembly.parts.push(PartNode {
//!     id: "occ_base".to_string(),
//!     name: "Base Plate".to_string(),
//!     module: None,
//!     world_transform: Some(Transform::identity()),
//! });
//! assembly.parts.push(PartNode {
//!     id: "occ_arm".to_string(),
//!     name: "Arm".to_string(),
//!     module: None,
//!     world_transform: Some(Transform::translation(0.0, 0.0, 0.2)),
//! });
//! assembly.mates.push(Mate {
//!     name: "joint_shoulder".to_string(),
//!     kind: MateKind::Joint {
//!         mate_type: MateType::Revolute,
//!         limits: None,
//!     },
//!     entities: [
//!         MateEntity {
//!             part: "occ_base".to_string(),
//!             local_transform: Transform::translation(0.0, 0.0, 0.2),
//!         },
//!         MateEntity {
//!             part: "occ_arm".to_string(),
//!             local_transform: Transform::identity(),
//!         },
//!     ],
//!     scope: None,
//!     id: None,
//! });
//!
//! let model = condense(&assembly, &CondenseSettings::default())?;
//! assert_eq!(model.graph.links.len(), 2);
//! assert_eq!(model.graph.joints[0].name, "joint_shoulder");
//! # Ok::<(), armature_core::CondenseError>(())
//! ```

#![warn(missing_docs)]

use std::collections::BTreeMap;

use armature_assembly::AssemblyGraph;
use serde::{Deserialize, Serialize};

pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod interface;
pub mod linkgraph;
pub mod modules;
pub mod naming;
pub mod propagate;

pub use cluster::{cluster_rigid, RigidClusters};
pub use config::{CondenseSettings, JointValueOverride};
pub use diagnostics::{Diagnostics, Warning};
pub use error::{CondenseError, Result};
pub use interface::{resolve_interfaces, InterfaceJointInfo};
pub use linkgraph::{
    build_link_graph, JointMimic, JointRecord, JointType, LinkGraph, LinkRecord,
};
pub use modules::{detect_module_boundaries, InterfaceMate, ModuleBoundaryInfo};
pub use propagate::propagate_frames;

/// Everything condensation produces for one assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondensedModel {
    /// The link/joint forest with world frames assigned.
    pub graph: LinkGraph,
    /// Module membership and boundary attachment mates.
    pub boundaries: ModuleBoundaryInfo,
    /// Resolved module attachments, keyed by child module id.
    pub interfaces: BTreeMap<String, InterfaceJointInfo>,
    /// Everything the pipeline skipped or degraded, in detection order.
    pub warnings: Vec<Warning>,
}

impl CondensedModel {
    /// Serialize to pretty JSON. Field and map ordering is stable, so
    /// equal models produce identical bytes.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run the full condensation pipeline.
///
/// Settings are validated first; the stages then run in a fixed order:
/// rigid clustering, link graph construction, transform propagation,
/// module boundary detection, interface resolution. Warnings from every
/// stage are collected into the returned model.
pub fn condense(
    assembly: &AssemblyGraph,
    settings: &CondenseSettings,
) -> Result<CondensedModel> {
    settings.validate()?;
    let mut diags = Diagnostics::new();
    let clusters = cluster_rigid(assembly, &mut diags);
    let mut graph = build_link_graph(assembly, &clusters, settings, &mut diags)?;
    propagate_frames(assembly, &mut graph, settings, &mut diags)?;
    let boundaries = detect_module_boundaries(assembly, &graph, &mut diags);
    let interfaces = resolve_interfaces(assembly, &graph, &boundaries)?;
    log::debug!(
        "condensed {} parts into {} links, {} joints, {} module interfaces",
        assembly.parts.len(),
        graph.links.len(),
        graph.joints.len(),
        interfaces.len()
    );
    Ok(CondensedModel {
        graph,
        boundaries,
        interfaces,
        warnings: diags.into_warnings(),
    })
}
