//! Module boundary detection - which joint mates stitch child modules
//! to their surroundings.
//!
//! A mate is a boundary when its two endpoints belong to different
//! modules after condensation. The endpoint in the deeper module is the
//! child side; each child module keeps its first boundary mate as the
//! attachment interface.

use std::collections::{BTreeMap, BTreeSet};

use armature_assembly::AssemblyGraph;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, Warning};
use crate::linkgraph::LinkGraph;

/// A joint mate whose endpoints live in different modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMate {
    /// Mate name.
    pub mate: String,
    /// Index into the assembly's mate list.
    pub mate_index: usize,
    /// Module of the parent-side endpoint; `None` at assembly root.
    pub parent_module: Option<String>,
    /// The child module this mate attaches.
    pub child_module: String,
    /// Which mate entity (0 or 1) sits inside the child module.
    pub child_entity: usize,
}

/// Module membership and boundary summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleBoundaryInfo {
    /// Module id to member part occurrence ids.
    pub members: BTreeMap<String, BTreeSet<String>>,
    /// Parts that belong to no module.
    pub root_parts: BTreeSet<String>,
    /// One attachment mate per child module, in mate order.
    pub interfaces: Vec<InterfaceMate>,
}

/// Collect module membership and find each module's attachment mate.
///
/// Mates whose endpoints condensed into one link are not boundaries.
/// When neither endpoint's module is nested inside the other's
/// (siblings, unrelated scopes), the second entity's side is taken as
/// the child and the classification is reported as ambiguous. A mate's
/// recorded defining scope is cross-checked against its endpoints: a
/// part outside the scope's subtree is reported, and classification
/// proceeds from the endpoints' membership.
pub fn detect_module_boundaries(
    assembly: &AssemblyGraph,
    graph: &LinkGraph,
    diags: &mut Diagnostics,
) -> ModuleBoundaryInfo {
    let mut info = ModuleBoundaryInfo::default();

    for part in &assembly.parts {
        match &part.module {
            Some(module) => {
                if assembly.module(module).is_none() {
                    diags.warn(Warning::UnknownModule {
                        part: part.id.clone(),
                        module: module.clone(),
                    });
                }
                info.members
                    .entry(module.clone())
                    .or_default()
                    .insert(part.id.clone());
            }
            None => {
                info.root_parts.insert(part.id.clone());
            }
        }
    }

    let mut claimed: BTreeSet<String> = BTreeSet::new();
    for (mate_index, mate) in assembly.mates.iter().enumerate() {
        if let Some(scope) = mate.scope.as_deref() {
            for entity in &mate.entities {
                let module = match assembly.part(&entity.part) {
                    Some(p) => p.module.as_deref(),
                    // Unknown endpoints get their own warning elsewhere.
                    None => continue,
                };
                if !chain_contains(assembly, module, scope) {
                    diags.warn(Warning::MateOutsideScope {
                        mate: mate.name.clone(),
                        part: entity.part.clone(),
                        scope: scope.to_string(),
                    });
                }
            }
        }
        if !mate.is_joint() {
            continue;
        }
        let a = mate.entities[0].part.as_str();
        let b = mate.entities[1].part.as_str();
        let (link_a, link_b) = match (graph.link_of_part(a), graph.link_of_part(b)) {
            (Some(x), Some(y)) => (x, y),
            // Unknown endpoints were already reported at build time.
            _ => continue,
        };
        if link_a == link_b {
            continue;
        }
        let module_a = assembly.part(a).and_then(|p| p.module.clone());
        let module_b = assembly.part(b).and_then(|p| p.module.clone());
        if module_a == module_b {
            continue;
        }

        let deeper_a = is_strictly_deeper(assembly, module_a.as_deref(), module_b.as_deref());
        let deeper_b = is_strictly_deeper(assembly, module_b.as_deref(), module_a.as_deref());
        let (child_entity, ambiguous) = match (deeper_a, deeper_b) {
            (true, false) => (0, false),
            (false, true) => (1, false),
            _ => (if module_b.is_some() { 1 } else { 0 }, true),
        };
        let child_module = match if child_entity == 0 { &module_a } else { &module_b } {
            Some(m) => m.clone(),
            // The chosen child side always has a module once the two
            // sides are known to differ.
            None => continue,
        };
        if ambiguous {
            diags.warn(Warning::AmbiguousBoundary {
                mate: mate.name.clone(),
                child_module: child_module.clone(),
            });
        }
        let parent_module = if child_entity == 0 { module_b } else { module_a };

        if !claimed.insert(child_module.clone()) {
            diags.warn(Warning::DuplicateInterface {
                mate: mate.name.clone(),
                child_module,
            });
            continue;
        }
        info.interfaces.push(InterfaceMate {
            mate: mate.name.clone(),
            mate_index,
            parent_module,
            child_module,
            child_entity,
        });
    }

    info
}

/// Whether `module` is a proper descendant of `other` in the module
/// tree. The root scope (`None`) contains every module.
fn is_strictly_deeper(
    assembly: &AssemblyGraph,
    module: Option<&str>,
    other: Option<&str>,
) -> bool {
    let start = match module {
        Some(m) => m,
        None => return false,
    };
    let target = match other {
        Some(t) => t,
        None => return true,
    };
    let parent = assembly.module(start).and_then(|i| i.parent.as_deref());
    chain_contains(assembly, parent, target)
}

/// Whether `ancestor` appears in `module`'s parent chain, inclusive.
fn chain_contains(assembly: &AssemblyGraph, module: Option<&str>, ancestor: &str) -> bool {
    let mut cursor = module;
    // The walk is bounded so a malformed parent cycle cannot hang it.
    for _ in 0..=assembly.modules.len() {
        match cursor {
            Some(m) if m == ancestor => return true,
            Some(m) => cursor = assembly.module(m).and_then(|i| i.parent.as_deref()),
            None => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::cluster_rigid;
    use crate::config::CondenseSettings;
    use crate::linkgraph::build_link_graph;
    use armature_assembly::{
        Mate, MateEntity, MateKind, MateType, ModuleInstance, PartNode,
    };
    use armature_math::Transform;

    fn part_in(id: &str, name: &str, module: Option<&str>) -> PartNode {
        PartNode {
            id: id.to_string(),
            name: name.to_string(),
            module: module.map(str::to_string),
            world_transform: Some(Transform::identity()),
        }
    }

    fn module(id: &str, parent: Option<&str>) -> ModuleInstance {
        ModuleInstance {
            id: id.to_string(),
            name: id.to_string(),
            parent: parent.map(str::to_string),
        }
    }

    fn entity(part: &str) -> MateEntity {
        MateEntity {
            part: part.to_string(),
            local_transform: Transform::identity(),
        }
    }

    fn joint(name: &str, a: &str, b: &str) -> Mate {
        Mate {
            name: name.to_string(),
            kind: MateKind::Joint {
                mate_type: MateType::Revolute,
                limits: None,
            },
            entities: [entity(a), entity(b)],
            scope: None,
            id: None,
        }
    }

    fn rigid(name: &str, a: &str, b: &str) -> Mate {
        Mate {
            name: name.to_string(),
            kind: MateKind::Rigid,
            entities: [entity(a), entity(b)],
            scope: None,
            id: None,
        }
    }

    fn detect(asm: &AssemblyGraph) -> (ModuleBoundaryInfo, Vec<Warning>) {
        let settings = CondenseSettings::default();
        let mut diags = Diagnostics::new();
        let clusters = cluster_rigid(asm, &mut diags);
        let graph = build_link_graph(asm, &clusters, &settings, &mut diags).unwrap();
        let info = detect_module_boundaries(asm, &graph, &mut diags);
        (info, diags.into_warnings())
    }

    #[test]
    fn nested_modules_classify_the_deeper_side_as_child() {
        let mut asm = AssemblyGraph::new();
        asm.modules.push(module("mod_arm", None));
        asm.modules.push(module("mod_hand", Some("mod_arm")));
        asm.parts.push(part_in("occ_base", "Base", None));
        asm.parts.push(part_in("occ_upper", "Upper", Some("mod_arm")));
        asm.parts.push(part_in("occ_palm", "Palm", Some("mod_hand")));
        asm.mates.push(joint("shoulder", "occ_base", "occ_upper"));
        // The wrist is defined inside mod_arm, which contains both of
        // its endpoints.
        let mut wrist = joint("wrist", "occ_upper", "occ_palm");
        wrist.scope = Some("mod_arm".to_string());
        asm.mates.push(wrist);

        let (info, warnings) = detect(&asm);
        assert!(warnings.is_empty());

        assert_eq!(info.root_parts.len(), 1);
        assert!(info.root_parts.contains("occ_base"));
        assert!(info.members["mod_arm"].contains("occ_upper"));
        assert!(info.members["mod_hand"].contains("occ_palm"));

        assert_eq!(info.interfaces.len(), 2);
        let shoulder = &info.interfaces[0];
        assert_eq!(shoulder.mate, "shoulder");
        assert_eq!(shoulder.parent_module, None);
        assert_eq!(shoulder.child_module, "mod_arm");
        assert_eq!(shoulder.child_entity, 1);
        let wrist = &info.interfaces[1];
        assert_eq!(wrist.parent_module.as_deref(), Some("mod_arm"));
        assert_eq!(wrist.child_module, "mod_hand");
        assert_eq!(wrist.child_entity, 1);
    }

    #[test]
    fn sibling_modules_fall_back_to_the_second_entity() {
        let mut asm = AssemblyGraph::new();
        asm.modules.push(module("mod_a", None));
        asm.modules.push(module("mod_b", None));
        asm.parts.push(part_in("occ_pa", "PA", Some("mod_a")));
        asm.parts.push(part_in("occ_pb", "PB", Some("mod_b")));
        asm.mates.push(joint("bridge", "occ_pa", "occ_pb"));

        let (info, warnings) = detect(&asm);
        assert_eq!(
            warnings,
            vec![Warning::AmbiguousBoundary {
                mate: "bridge".to_string(),
                child_module: "mod_b".to_string()
            }]
        );
        assert_eq!(info.interfaces.len(), 1);
        assert_eq!(info.interfaces[0].child_module, "mod_b");
        assert_eq!(info.interfaces[0].parent_module.as_deref(), Some("mod_a"));
        assert_eq!(info.interfaces[0].child_entity, 1);
    }

    #[test]
    fn mate_reaching_outside_its_scope_is_reported() {
        let mut asm = AssemblyGraph::new();
        asm.modules.push(module("mod_a", None));
        asm.modules.push(module("mod_b", None));
        asm.parts.push(part_in("occ_pa", "PA", Some("mod_a")));
        asm.parts.push(part_in("occ_pb", "PB", Some("mod_b")));
        let mut bridge = joint("bridge", "occ_pa", "occ_pb");
        bridge.scope = Some("mod_a".to_string());
        asm.mates.push(bridge);

        let (info, warnings) = detect(&asm);
        assert_eq!(
            warnings,
            vec![
                Warning::MateOutsideScope {
                    mate: "bridge".to_string(),
                    part: "occ_pb".to_string(),
                    scope: "mod_a".to_string()
                },
                Warning::AmbiguousBoundary {
                    mate: "bridge".to_string(),
                    child_module: "mod_b".to_string()
                },
            ]
        );
        // The endpoints' membership, not the recorded scope, drives
        // classification.
        assert_eq!(info.interfaces.len(), 1);
        assert_eq!(info.interfaces[0].child_module, "mod_b");
    }

    #[test]
    fn each_module_keeps_its_first_interface() {
        let mut asm = AssemblyGraph::new();
        asm.modules.push(module("mod_m", None));
        asm.parts.push(part_in("occ_base", "Base", None));
        asm.parts.push(part_in("occ_m1", "M1", Some("mod_m")));
        asm.parts.push(part_in("occ_m2", "M2", Some("mod_m")));
        asm.mates.push(joint("attach_1", "occ_base", "occ_m1"));
        asm.mates.push(joint("attach_2", "occ_base", "occ_m2"));

        let (info, warnings) = detect(&asm);
        assert_eq!(
            warnings,
            vec![Warning::DuplicateInterface {
                mate: "attach_2".to_string(),
                child_module: "mod_m".to_string()
            }]
        );
        assert_eq!(info.interfaces.len(), 1);
        assert_eq!(info.interfaces[0].mate, "attach_1");
    }

    #[test]
    fn condensed_endpoints_are_not_a_boundary() {
        let mut asm = AssemblyGraph::new();
        asm.modules.push(module("mod_a", None));
        asm.modules.push(module("mod_b", None));
        asm.parts.push(part_in("occ_x", "X", Some("mod_a")));
        asm.parts.push(part_in("occ_y", "Y", Some("mod_b")));
        asm.mates.push(rigid("weld", "occ_x", "occ_y"));
        asm.mates.push(joint("hinge", "occ_x", "occ_y"));

        let (info, warnings) = detect(&asm);
        assert!(info.interfaces.is_empty());
        // Only the builder's self-loop report, nothing from detection.
        assert_eq!(
            warnings,
            vec![Warning::SelfLoopMate {
                mate: "hinge".to_string()
            }]
        );
    }

    #[test]
    fn unknown_module_is_reported_but_still_counted() {
        let mut asm = AssemblyGraph::new();
        asm.parts.push(part_in("occ_p", "P", Some("mod_ghost")));

        let (info, warnings) = detect(&asm);
        assert_eq!(
            warnings,
            vec![Warning::UnknownModule {
                part: "occ_p".to_string(),
                module: "mod_ghost".to_string()
            }]
        );
        assert!(info.members["mod_ghost"].contains("occ_p"));
    }
}
