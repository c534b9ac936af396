//! Two-module robot arm condensed from a flat mate graph.

use armature_assembly::{
    AssemblyGraph, JointLimits, Mate, MateConnector, MateEntity, MateKind, MateType,
    ModuleInstance, PartNode,
};
use armature_core::{condense, CondenseSettings};
use armature_math::Transform;

fn part(id: &str, name: &str, module: Option<&str>, world: Transform) -> PartNode {
    PartNode {
        id: id.to_string(),
        name: name.to_string(),
        module: module.map(str::to_string),
        world_transform: Some(world),
    }
}

fn entity(part: &str, local: Transform) -> MateEntity {
    MateEntity {
        part: part.to_string(),
        local_transform: local,
    }
}

fn main() {
    let mut assembly = AssemblyGraph::new();

    assembly.modules.push(ModuleInstance {
        id: "mod_arm".to_string(),
        name: "Arm".to_string(),
        parent: None,
    });
    assembly.modules.push(ModuleInstance {
        id: "mod_hand".to_string(),
        name: "Hand".to_string(),
        parent: Some("mod_arm".to_string()),
    });

    // Grounded base: two plates fastened into one rigid body
    assembly
        .parts
        .push(part("occ_base", "Base", None, Transform::identity()));
    assembly
        .parts
        .push(part("occ_plate", "Top Plate", None, Transform::identity()));
    assembly.mates.push(Mate {
        name: "fasten_plate".to_string(),
        kind: MateKind::Rigid,
        entities: [
            entity("occ_base", Transform::identity()),
            entity("occ_plate", Transform::identity()),
        ],
        scope: None,
        id: None,
    });

    // Arm module: shoulder and elbow
    assembly.parts.push(part(
        "occ_upper",
        "Upper Arm",
        Some("mod_arm"),
        Transform::translation(0.0, 0.0, 0.1),
    ));
    assembly.parts.push(part(
        "occ_fore",
        "Forearm",
        Some("mod_arm"),
        Transform::translation(0.0, 0.0, 0.45),
    ));
    assembly.mates.push(Mate {
        name: "joint_shoulder".to_string(),
        kind: MateKind::Joint {
            mate_type: MateType::Revolute,
            limits: Some(JointLimits {
                lower: Some(-1.57),
                upper: Some(1.57),
                effort: None,
                velocity: None,
            }),
        },
        entities: [
            entity("occ_base", Transform::translation(0.0, 0.0, 0.1)),
            entity("occ_upper", Transform::identity()),
        ],
        scope: None,
        id: Some("mv_shoulder".to_string()),
    });
    assembly.mates.push(Mate {
        name: "joint_elbow".to_string(),
        kind: MateKind::Joint {
            mate_type: MateType::Revolute,
            limits: None,
        },
        entities: [
            entity("occ_upper", Transform::translation(0.0, 0.0, 0.35)),
            entity("occ_fore", Transform::identity()),
        ],
        scope: None,
        id: None,
    });

    // Hand module on the end of the forearm, publishing a tool frame
    assembly.parts.push(part(
        "occ_gripper",
        "Gripper",
        Some("mod_hand"),
        Transform::translation(0.0, 0.0, 0.7),
    ));
    assembly.mates.push(Mate {
        name: "joint_wrist".to_string(),
        kind: MateKind::Joint {
            mate_type: MateType::Revolute,
            limits: None,
        },
        entities: [
            entity("occ_fore", Transform::translation(0.0, 0.0, 0.25)),
            entity("occ_gripper", Transform::identity()),
        ],
        scope: None,
        id: None,
    });
    assembly.connectors.push(MateConnector {
        name: "frame_tool_tip".to_string(),
        owner: Some("occ_gripper".to_string()),
        local_transform: Transform::translation(0.0, 0.0, 0.12),
    });

    let model = condense(&assembly, &CondenseSettings::default()).unwrap();

    println!("links:");
    for link in &model.graph.links {
        let frame = link.world_frame.as_ref().map(Transform::translation_vec);
        println!(
            "  {} ({} parts) at {:?}",
            link.name,
            link.parts.len(),
            frame
        );
    }
    println!("joints:");
    for joint in &model.graph.joints {
        println!(
            "  {} {:?}: {} -> {}",
            joint.name, joint.joint_type, joint.parent, joint.child
        );
    }
    println!("roots: {:?}", model.graph.root_links());
    println!("interfaces:");
    for (module, info) in &model.interfaces {
        println!(
            "  {} attaches via {} under {} (subtree root {})",
            module, info.joint, info.parent_link, info.child_root_link
        );
    }
    for warning in &model.warnings {
        println!("warning: {warning}");
    }
}
