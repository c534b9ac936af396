//! Transform propagation - breadth-first assignment of world frames and
//! joint origins over the link graph.
//!
//! Traversal is seeded at links with no incoming joint edge. Each
//! traversed edge rewrites its joint so parent/child match the traversal
//! direction, computes `origin` as the joint frame re-based into the
//! parent link's frame, and assigns the child link's world frame. An
//! edge that would give a link a second parent is dropped, so the
//! retained joints always form a forest.

use std::collections::{HashMap, HashSet, VecDeque};

use armature_assembly::{AssemblyGraph, MateKind, MateType};
use armature_math::{Dir3, Transform, Vec3};

use crate::config::{CondenseSettings, JointValueOverride};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{CondenseError, Result};
use crate::linkgraph::{EdgeSource, LinkGraph};

/// Assign a world frame to every link and rewrite every joint's
/// parent/child, origin, axis and limits to match traversal order.
///
/// Roots are links with no incoming joint edge, visited in link order; a
/// second pass picks up components that have no such link (joint
/// cycles), rooting them at their lowest-index link. Each root's frame
/// is seeded from the first member part that carries a world transform.
/// Unresolvable transforms degrade to carrying the parent frame forward
/// unless [`CondenseSettings::fail_fast`] is set. Dropping an edge also
/// clears any mimic that named the dropped joint.
pub fn propagate_frames(
    assembly: &AssemblyGraph,
    graph: &mut LinkGraph,
    settings: &CondenseSettings,
    diags: &mut Diagnostics,
) -> Result<()> {
    let endpoints: Vec<(usize, usize)> = {
        let position: HashMap<&str, usize> = graph
            .links
            .iter()
            .enumerate()
            .map(|(i, link)| (link.name.as_str(), i))
            .collect();
        graph
            .joints
            .iter()
            .map(|j| (position[j.parent.as_str()], position[j.child.as_str()]))
            .collect()
    };

    // Undirected adjacency; `from_parent` records whether the entry
    // walks the joint in its builder-recorded direction.
    let mut adjacency: Vec<Vec<(usize, usize, bool)>> = vec![Vec::new(); graph.links.len()];
    let mut indegree = vec![0usize; graph.links.len()];
    for (joint, &(parent, child)) in endpoints.iter().enumerate() {
        adjacency[parent].push((joint, child, true));
        adjacency[child].push((joint, parent, false));
        indegree[child] += 1;
    }

    let mut visited = vec![false; graph.links.len()];
    let mut traversed = vec![false; graph.joints.len()];
    let mut dropped = vec![false; graph.joints.len()];
    let mut queue = VecDeque::new();

    for pass in 0..2 {
        for root in 0..graph.links.len() {
            if visited[root] || (pass == 0 && indegree[root] != 0) {
                continue;
            }
            seed_root_frame(assembly, graph, root, settings, diags)?;
            visited[root] = true;
            queue.push_back(root);

            while let Some(current) = queue.pop_front() {
                for &(joint, neighbor, from_parent) in &adjacency[current] {
                    if traversed[joint] || dropped[joint] {
                        continue;
                    }
                    if visited[neighbor] {
                        dropped[joint] = true;
                        diags.warn(Warning::ExtraEdgeDropped {
                            joint: graph.joints[joint].name.clone(),
                            link: graph.links[neighbor].name.clone(),
                        });
                        continue;
                    }
                    traversed[joint] = true;

                    let flipped = !from_parent;
                    let geometry = edge_geometry(
                        assembly,
                        &graph.edges[joint],
                        flipped,
                        &graph.joints[joint].name,
                        settings,
                        diags,
                    )?;

                    let parent_name = graph.links[current].name.clone();
                    let child_name = graph.links[neighbor].name.clone();
                    // Visited links always carry a frame.
                    let parent_frame = graph.links[current]
                        .world_frame
                        .clone()
                        .unwrap_or_default();

                    let (child_frame, origin) = match geometry.world_mate {
                        Some(world_mate) => match parent_frame.inverse() {
                            Some(inverse) => {
                                let origin = inverse.then(&world_mate);
                                (world_mate, origin)
                            }
                            None => {
                                if settings.fail_fast {
                                    return Err(CondenseError::SingularTransform {
                                        frame: parent_name,
                                    });
                                }
                                diags.warn(Warning::SingularFrame {
                                    joint: graph.joints[joint].name.clone(),
                                    link: parent_name.clone(),
                                });
                                (parent_frame, Transform::identity())
                            }
                        },
                        None => (parent_frame, Transform::identity()),
                    };

                    graph.links[neighbor].world_frame = Some(child_frame);
                    let record = &mut graph.joints[joint];
                    record.parent = parent_name;
                    record.child = child_name;
                    record.origin = origin;
                    if record.joint_type.is_movable() {
                        record.axis = Vec3::new(0.0, 0.0, geometry.axis_sign);
                    }
                    if geometry.inverted {
                        record.limits = record.limits.map(|l| l.inverted());
                    }

                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    if dropped.iter().any(|&d| d) {
        let joints = std::mem::take(&mut graph.joints);
        let edges = std::mem::take(&mut graph.edges);
        for ((joint, edge), dropped) in joints.into_iter().zip(edges).zip(dropped) {
            if !dropped {
                graph.joints.push(joint);
                graph.edges.push(edge);
            }
        }
        scrub_orphaned_mimics(graph, diags);
    }

    Ok(())
}

/// Clear mimic references whose leader joint did not survive the forest
/// filter.
fn scrub_orphaned_mimics(graph: &mut LinkGraph, diags: &mut Diagnostics) {
    let surviving: HashSet<String> = graph.joints.iter().map(|j| j.name.clone()).collect();
    for joint in &mut graph.joints {
        let orphaned = match &joint.mimic {
            Some(mimic) if !surviving.contains(&mimic.joint) => Some(mimic.joint.clone()),
            _ => None,
        };
        if let Some(leader) = orphaned {
            diags.warn(Warning::MimicLeaderDropped {
                joint: joint.name.clone(),
                leader,
            });
            joint.mimic = None;
        }
    }
}

/// Seed a root link's world frame from the first member part carrying a
/// world transform. Virtual roots (no member parts) sit at identity.
fn seed_root_frame(
    assembly: &AssemblyGraph,
    graph: &mut LinkGraph,
    root: usize,
    settings: &CondenseSettings,
    diags: &mut Diagnostics,
) -> Result<()> {
    let frame = graph.links[root]
        .parts
        .iter()
        .filter_map(|id| assembly.part(id))
        .find_map(|p| p.world_transform.clone());
    let frame = match frame {
        Some(frame) => frame,
        None => {
            if !graph.links[root].parts.is_empty() {
                if settings.fail_fast {
                    return Err(CondenseError::MissingWorldTransform {
                        part: graph.links[root].parts[0].clone(),
                    });
                }
                diags.warn(Warning::MissingRootTransform {
                    link: graph.links[root].name.clone(),
                });
            }
            Transform::identity()
        }
    };
    graph.links[root].world_frame = Some(frame);
    Ok(())
}

/// Geometry resolved for one traversed edge.
struct EdgeGeometry {
    /// World pose of the joint frame; `None` when degraded.
    world_mate: Option<Transform>,
    /// Sign of the published Z axis after traversal flip and inversion.
    axis_sign: f64,
    /// Whether a value override inverted the sign convention.
    inverted: bool,
}

/// Resolve the world pose of an edge's joint frame from its parent-side
/// entity: `T_world_part * T_part_mate * motion`. A missing part
/// transform warns and yields a degraded result, or fails fast.
fn edge_geometry(
    assembly: &AssemblyGraph,
    edge: &EdgeSource,
    flipped: bool,
    joint_name: &str,
    settings: &CondenseSettings,
    diags: &mut Diagnostics,
) -> Result<EdgeGeometry> {
    match edge {
        EdgeSource::Frame { owner_part, local } => {
            let part = &assembly.parts[*owner_part];
            // Frame links have one edge and no parts, so they are only
            // ever entered from their owner.
            let world = if flipped {
                None
            } else {
                part.world_transform.as_ref()
            };
            match world {
                Some(world) => Ok(EdgeGeometry {
                    world_mate: Some(world.then(local)),
                    axis_sign: 1.0,
                    inverted: false,
                }),
                None => {
                    if settings.fail_fast {
                        return Err(CondenseError::MissingWorldTransform {
                            part: part.id.clone(),
                        });
                    }
                    diags.warn(Warning::DegradedTransform {
                        joint: joint_name.to_string(),
                        part: part.id.clone(),
                    });
                    Ok(EdgeGeometry {
                        world_mate: None,
                        axis_sign: 1.0,
                        inverted: false,
                    })
                }
            }
        }
        EdgeSource::Mate { mate_index } => {
            let mate = &assembly.mates[*mate_index];
            let entity = &mate.entities[usize::from(flipped)];
            let value = mate
                .id
                .as_deref()
                .and_then(|id| settings.joint_values.get(id));
            let inverted = value.map_or(false, |v| v.invert_direction);
            let mut axis_sign = if flipped { -1.0 } else { 1.0 };
            if inverted {
                axis_sign = -axis_sign;
            }

            let world_part = assembly
                .part(&entity.part)
                .and_then(|p| p.world_transform.as_ref());
            let world_part = match world_part {
                Some(world) => world,
                None => {
                    if settings.fail_fast {
                        return Err(CondenseError::MissingWorldTransform {
                            part: entity.part.clone(),
                        });
                    }
                    diags.warn(Warning::DegradedTransform {
                        joint: joint_name.to_string(),
                        part: entity.part.clone(),
                    });
                    return Ok(EdgeGeometry {
                        world_mate: None,
                        axis_sign,
                        inverted,
                    });
                }
            };
            let motion = mate_motion(&mate.kind, value, axis_sign, inverted);
            Ok(EdgeGeometry {
                world_mate: Some(world_part.then(&entity.local_transform).then(&motion)),
                axis_sign,
                inverted,
            })
        }
    }
}

/// Pose offset produced by a live joint value, expressed in the mate
/// frame.
///
/// Rotation and translation are taken about the published
/// (sign-adjusted) axis with a matching sign-adjusted value. Negating
/// axis and value together cancels term by term in the rotation matrix,
/// so the composed pose is identical whichever sign convention is in
/// force.
fn mate_motion(
    kind: &MateKind,
    value: Option<&JointValueOverride>,
    axis_sign: f64,
    inverted: bool,
) -> Transform {
    let mate_type = match kind {
        MateKind::Joint { mate_type, .. } => *mate_type,
        MateKind::Rigid => return Transform::identity(),
    };
    let value = match value {
        Some(v) => v,
        None => return Transform::identity(),
    };
    let value_sign = if inverted { -1.0 } else { 1.0 };
    let angle = value.angle.unwrap_or(0.0) * value_sign;
    let offset = value.offset.unwrap_or(0.0) * value_sign;
    let axis = Dir3::new_normalize(Vec3::new(0.0, 0.0, axis_sign));
    let slide = axis_sign * offset;

    match mate_type {
        MateType::Revolute => Transform::rotation_about_axis(&axis, angle),
        MateType::Slider => Transform::translation(0.0, 0.0, slide),
        MateType::Cylindrical => Transform::rotation_about_axis(&axis, angle)
            .then(&Transform::translation(0.0, 0.0, slide)),
        MateType::Fastened | MateType::Ball | MateType::Planar => Transform::identity(),
    }
}
