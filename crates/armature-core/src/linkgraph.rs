//! Link graph construction - one link per rigid cluster, joint edges
//! from joint mates, virtual frame links from `frame_` connectors.
//!
//! The builder only materializes records and names them; origins, axes
//! and world frames are placeholders until transform propagation runs.

use std::collections::HashMap;

use armature_assembly::{AssemblyGraph, JointLimits, MateKind, MateType};
use armature_math::{Transform, Vec3};
use serde::{Deserialize, Serialize};

use crate::cluster::{part_indices, RigidClusters};
use crate::config::CondenseSettings;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::naming::{compose_link_name, sanitize, NameRegistry};

/// Robot-description joint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointType {
    /// No motion; also used for virtual frame attachments.
    Fixed,
    /// Bounded rotation about the joint axis.
    Revolute,
    /// Unbounded rotation about the joint axis.
    Continuous,
    /// Translation along the joint axis.
    Prismatic,
    /// Coupled rotation and translation on the joint axis.
    Cylindrical,
    /// Rotation about the joint origin.
    Ball,
    /// Planar motion normal to the joint axis.
    Planar,
}

impl JointType {
    /// Whether this joint has a degree of freedom.
    pub fn is_movable(&self) -> bool {
        !matches!(self, JointType::Fixed)
    }
}

/// Coupling of one joint's value to another's (gears, linkages):
/// `value = multiplier * leader_value + offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointMimic {
    /// Name of the leader joint.
    pub joint: String,
    /// Ratio applied to the leader's value.
    pub multiplier: f64,
    /// Constant added after the ratio.
    pub offset: f64,
}

/// A synthesized rigid body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Canonical unique name.
    pub name: String,
    /// Member part occurrence ids in input order; empty for virtual
    /// frame links.
    pub parts: Vec<String>,
    /// Owning module, when every member agrees on one.
    pub module: Option<String>,
    /// World frame, assigned exactly once during propagation.
    pub world_frame: Option<Transform>,
}

/// An edge between two links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointRecord {
    /// Canonical unique name (shared namespace with links).
    pub name: String,
    /// Joint class.
    pub joint_type: JointType,
    /// Parent link name.
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Pose of the child frame in the parent frame, assigned during
    /// propagation.
    pub origin: Transform,
    /// Motion axis in the joint's own frame; `±Z` by convention.
    pub axis: Vec3,
    /// Motion limits, if any.
    pub limits: Option<JointLimits>,
    /// Name of the source mate; `None` for synthetic frame joints.
    pub mate: Option<String>,
    /// Motion coupling to another joint, if any.
    pub mimic: Option<JointMimic>,
}

/// How a joint edge resolves its geometry during propagation.
#[derive(Debug, Clone)]
pub(crate) enum EdgeSource {
    /// Backed by a joint mate, identified by index into the assembly's
    /// mate list.
    Mate {
        /// Index into `AssemblyGraph::mates`.
        mate_index: usize,
    },
    /// Synthetic fixed edge from a virtual-frame connector.
    Frame {
        /// Part index of the connector's owner.
        owner_part: usize,
        /// Owner-part-to-connector-frame transform.
        local: Transform,
    },
}

/// The condensed link/joint graph.
///
/// `links` and `joints` keep creation order: cluster links first (in
/// cluster order), then virtual frame links (in connector order).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkGraph {
    /// All links.
    pub links: Vec<LinkRecord>,
    /// All joints. Parent/child orientation is provisional until
    /// propagation settles traversal direction.
    pub joints: Vec<JointRecord>,
    /// Geometry sources aligned with `joints`.
    #[serde(skip)]
    pub(crate) edges: Vec<EdgeSource>,
}

impl LinkGraph {
    /// Look up a link by name.
    pub fn link(&self, name: &str) -> Option<&LinkRecord> {
        self.links.iter().find(|l| l.name == name)
    }

    /// Look up a joint by name.
    pub fn joint(&self, name: &str) -> Option<&JointRecord> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Index of the link by name.
    pub fn link_position(&self, name: &str) -> Option<usize> {
        self.links.iter().position(|l| l.name == name)
    }

    /// Index of the link containing a part occurrence.
    pub fn link_of_part(&self, part_id: &str) -> Option<usize> {
        self.links
            .iter()
            .position(|l| l.parts.iter().any(|p| p == part_id))
    }

    /// Names of links that are no joint's child.
    pub fn root_links(&self) -> Vec<&str> {
        self.links
            .iter()
            .filter(|l| !self.joints.iter().any(|j| j.child == l.name))
            .map(|l| l.name.as_str())
            .collect()
    }

    /// Pose of a member part expressed in its link's frame.
    ///
    /// Returns `None` before propagation, for unknown parts, and for
    /// parts without a world transform.
    pub fn part_pose_in_link(
        &self,
        assembly: &AssemblyGraph,
        part_id: &str,
    ) -> Option<Transform> {
        let link = &self.links[self.link_of_part(part_id)?];
        let link_frame = link.world_frame.as_ref()?;
        let part_frame = assembly.part(part_id)?.world_transform.as_ref()?;
        Some(link_frame.inverse()?.then(part_frame))
    }
}

/// Build the link graph from the rigid partition.
///
/// Link names: member display names sanitized, deduplicated, sorted,
/// joined; overrides from [`CondenseSettings::link_name_overrides`]
/// replace derived names before collision suffixing; links and joints
/// share one namespace. Joint mates whose endpoints condense into one
/// cluster are dropped with a warning, as are mates and connectors
/// naming unknown parts.
pub fn build_link_graph(
    assembly: &AssemblyGraph,
    clusters: &RigidClusters,
    settings: &CondenseSettings,
    diags: &mut Diagnostics,
) -> Result<LinkGraph> {
    let index = part_indices(assembly);
    let mut registry = NameRegistry::new();

    let derived: Vec<String> = clusters
        .clusters
        .iter()
        .enumerate()
        .map(|(i, members)| {
            let names: Vec<&str> = members
                .iter()
                .map(|&p| assembly.parts[p].name.as_str())
                .collect();
            compose_link_name(&names, i)
        })
        .collect();

    let mut links: Vec<LinkRecord> = Vec::with_capacity(clusters.len());
    for (members, derived) in clusters.clusters.iter().zip(&derived) {
        let candidate = settings
            .link_name_overrides
            .get(derived)
            .map(String::as_str)
            .unwrap_or(derived);
        let name = registry.claim(candidate);

        let first_module = assembly.parts[members[0]].module.clone();
        let module = if members
            .iter()
            .all(|&p| assembly.parts[p].module == first_module)
        {
            first_module
        } else {
            None
        };

        links.push(LinkRecord {
            name,
            parts: members
                .iter()
                .map(|&p| assembly.parts[p].id.clone())
                .collect(),
            module,
            world_frame: None,
        });
    }

    let mut joints: Vec<JointRecord> = Vec::new();
    let mut edges: Vec<EdgeSource> = Vec::new();

    // Virtual frame links, one per resolvable frame_ connector.
    for connector in &assembly.connectors {
        if !connector.is_frame() {
            continue;
        }
        let owner_part = connector
            .owner
            .as_deref()
            .and_then(|id| index.get(id).copied());
        let owner_part = match owner_part {
            Some(p) => p,
            None => {
                diags.warn(Warning::UnresolvedConnector {
                    connector: connector.name.clone(),
                });
                continue;
            }
        };
        let owner_link = clusters.cluster_of(owner_part);
        let owner_name = links[owner_link].name.clone();
        let owner_module = links[owner_link].module.clone();

        let frame_name = registry.claim(&sanitize(&connector.name));
        let joint_name = registry.claim(&format!("{frame_name}_fix"));
        links.push(LinkRecord {
            name: frame_name.clone(),
            parts: Vec::new(),
            module: owner_module,
            world_frame: None,
        });
        joints.push(JointRecord {
            name: joint_name,
            joint_type: JointType::Fixed,
            parent: owner_name,
            child: frame_name,
            origin: Transform::identity(),
            axis: Vec3::z(),
            limits: None,
            mate: None,
            mimic: None,
        });
        edges.push(EdgeSource::Frame {
            owner_part,
            local: connector.local_transform.clone(),
        });
    }

    // Joint edges between distinct clusters.
    for (mate_index, mate) in assembly.mates.iter().enumerate() {
        let (mate_type, limits) = match &mate.kind {
            MateKind::Joint { mate_type, limits } => (*mate_type, *limits),
            MateKind::Rigid => continue,
        };
        let mut endpoints = [0usize; 2];
        let mut resolved = true;
        for (slot, entity) in endpoints.iter_mut().zip(mate.entities.iter()) {
            match index.get(entity.part.as_str()) {
                Some(&p) => *slot = p,
                None => {
                    diags.warn(Warning::UnknownMatePart {
                        mate: mate.name.clone(),
                        part: entity.part.clone(),
                    });
                    resolved = false;
                }
            }
        }
        if !resolved {
            continue;
        }
        let first_link = clusters.cluster_of(endpoints[0]);
        let second_link = clusters.cluster_of(endpoints[1]);
        if first_link == second_link {
            diags.warn(Warning::SelfLoopMate {
                mate: mate.name.clone(),
            });
            continue;
        }

        let joint_type = joint_type_for(mate_type, limits.as_ref());
        let stem = sanitize(&mate.name);
        let stem = if stem.is_empty() {
            format!("joint_{}", joints.len())
        } else {
            stem
        };
        joints.push(JointRecord {
            name: registry.claim(&stem),
            joint_type,
            parent: links[first_link].name.clone(),
            child: links[second_link].name.clone(),
            origin: Transform::identity(),
            axis: Vec3::z(),
            limits: fill_limits(limits, joint_type, settings),
            mate: Some(mate.name.clone()),
            mimic: None,
        });
        edges.push(EdgeSource::Mate { mate_index });
    }

    attach_relations(assembly, &mut joints, diags);

    Ok(LinkGraph {
        links,
        joints,
        edges,
    })
}

/// Map a mate's constraint class to a joint class. A revolute mate is
/// exported as `Revolute` only when both position bounds are present.
fn joint_type_for(mate_type: MateType, limits: Option<&JointLimits>) -> JointType {
    match mate_type {
        MateType::Fastened => JointType::Fixed,
        MateType::Revolute => {
            let bounded = limits.map_or(false, |l| l.lower.is_some() && l.upper.is_some());
            if bounded {
                JointType::Revolute
            } else {
                JointType::Continuous
            }
        }
        MateType::Slider => JointType::Prismatic,
        MateType::Cylindrical => JointType::Cylindrical,
        MateType::Ball => JointType::Ball,
        MateType::Planar => JointType::Planar,
    }
}

/// Fill default effort/velocity into a movable joint's limits. Fixed
/// joints carry no limits at all.
fn fill_limits(
    limits: Option<JointLimits>,
    joint_type: JointType,
    settings: &CondenseSettings,
) -> Option<JointLimits> {
    if !joint_type.is_movable() {
        return None;
    }
    let mut filled = limits.unwrap_or_default();
    if filled.effort.is_none() {
        filled.effort = settings.default_effort;
    }
    if filled.velocity.is_none() {
        filled.velocity = settings.default_velocity;
    }
    (filled != JointLimits::default()).then_some(filled)
}

/// Attach mate relations as joint mimics.
fn attach_relations(
    assembly: &AssemblyGraph,
    joints: &mut [JointRecord],
    diags: &mut Diagnostics,
) {
    for relation in &assembly.relations {
        let leader = joints
            .iter()
            .position(|j| j.mate.as_deref() == Some(relation.leader.as_str()));
        let follower = joints
            .iter()
            .position(|j| j.mate.as_deref() == Some(relation.follower.as_str()));
        let (leader, follower) = match (leader, follower) {
            (Some(l), Some(f)) if l != f => (l, f),
            _ => {
                diags.warn(Warning::UnknownRelationMate {
                    leader: relation.leader.clone(),
                    follower: relation.follower.clone(),
                });
                continue;
            }
        };
        if joints[follower].mimic.is_some() {
            diags.warn(Warning::DuplicateRelation {
                follower: relation.follower.clone(),
            });
            continue;
        }
        joints[follower].mimic = Some(JointMimic {
            joint: joints[leader].name.clone(),
            multiplier: relation.multiplier,
            offset: relation.offset,
        });
    }
}
