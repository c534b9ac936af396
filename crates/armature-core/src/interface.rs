//! Interface transform resolution - the attachment joint each child
//! module exposes to its surroundings.

use std::collections::BTreeMap;

use armature_assembly::{AssemblyGraph, JointLimits};
use armature_math::{Transform, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{CondenseError, Result};
use crate::linkgraph::{JointType, LinkGraph};
use crate::modules::ModuleBoundaryInfo;

/// The resolved attachment of one child module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceJointInfo {
    /// Name of the attachment joint.
    pub joint: String,
    /// Joint class.
    pub joint_type: JointType,
    /// Module of the parent side; `None` at assembly root.
    pub parent_module: Option<String>,
    /// Link on the parent side of the boundary.
    pub parent_link: String,
    /// Topmost link of the child module's subtree.
    pub child_root_link: String,
    /// Attachment pose in the parent link's frame.
    pub origin: Transform,
    /// Motion axis in the joint frame, oriented parent to child.
    pub axis: Vec3,
    /// Motion limits in the parent-to-child convention.
    pub limits: Option<JointLimits>,
}

/// Re-base each boundary mate's joint into its module-classified parent
/// link and locate the child module's root link, keyed by child module.
///
/// Propagation may have oriented the joint either way across the
/// boundary; when traversal ran child-to-parent, the published axis and
/// limits are negated so the interface always reads parent to child. A
/// boundary mate whose joint was dropped to keep the forest acyclic
/// cannot be resolved and is an error.
pub fn resolve_interfaces(
    assembly: &AssemblyGraph,
    graph: &LinkGraph,
    boundaries: &ModuleBoundaryInfo,
) -> Result<BTreeMap<String, InterfaceJointInfo>> {
    let mut resolved = BTreeMap::new();
    for interface in &boundaries.interfaces {
        let mate = &assembly.mates[interface.mate_index];
        let joint = graph
            .joints
            .iter()
            .find(|j| j.mate.as_deref() == Some(interface.mate.as_str()))
            .ok_or_else(|| CondenseError::InterfaceJointNotFound {
                mate: interface.mate.clone(),
            })?;

        let child_part = mate.entities[interface.child_entity].part.as_str();
        let parent_part = mate.entities[1 - interface.child_entity].part.as_str();
        let child_link = graph.link_of_part(child_part).ok_or_else(|| {
            CondenseError::InterfaceEndpointNotFound {
                mate: interface.mate.clone(),
                part: child_part.to_string(),
            }
        })?;
        let parent_link = graph.link_of_part(parent_part).ok_or_else(|| {
            CondenseError::InterfaceEndpointNotFound {
                mate: interface.mate.clone(),
                part: parent_part.to_string(),
            }
        })?;

        // The joint frame is its traversal child's world frame.
        let world_mate = graph
            .link(&joint.child)
            .and_then(|l| l.world_frame.clone())
            .unwrap_or_default();
        let parent_frame = graph.links[parent_link]
            .world_frame
            .clone()
            .unwrap_or_default();
        let origin = match parent_frame.inverse() {
            Some(inverse) => inverse.then(&world_mate),
            None => {
                return Err(CondenseError::SingularTransform {
                    frame: graph.links[parent_link].name.clone(),
                })
            }
        };

        let forward = joint.parent == graph.links[parent_link].name;
        let (axis, limits) = if forward {
            (joint.axis, joint.limits)
        } else {
            (-joint.axis, joint.limits.map(|l| l.inverted()))
        };

        resolved.insert(
            interface.child_module.clone(),
            InterfaceJointInfo {
                joint: joint.name.clone(),
                joint_type: joint.joint_type,
                parent_module: interface.parent_module.clone(),
                parent_link: graph.links[parent_link].name.clone(),
                child_root_link: module_root_link(graph, child_link, &interface.child_module),
                origin,
                axis,
                limits,
            },
        );
    }
    Ok(resolved)
}

/// Climb retained joints from a link toward its traversal root while
/// the parent link stays inside the module.
fn module_root_link(graph: &LinkGraph, start: usize, module: &str) -> String {
    let mut current = start;
    for _ in 0..graph.links.len() {
        let name = graph.links[current].name.as_str();
        let parent = graph
            .joints
            .iter()
            .find(|j| j.child == name)
            .and_then(|j| graph.link_position(&j.parent));
        match parent {
            Some(p) if graph.links[p].module.as_deref() == Some(module) => current = p,
            _ => break,
        }
    }
    graph.links[current].name.clone()
}
