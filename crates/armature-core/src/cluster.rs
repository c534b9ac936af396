//! Rigid clustering - union-find over rigid mates.
//!
//! Two part occurrences land in the same cluster iff they are connected
//! by a path of rigid mates. Each cluster later becomes one link.

use std::cmp::Ordering;
use std::collections::HashMap;

use armature_assembly::AssemblyGraph;

use crate::diagnostics::{Diagnostics, Warning};

/// Index part occurrence ids for O(1) lookup during condensation.
pub(crate) fn part_indices(assembly: &AssemblyGraph) -> HashMap<&str, usize> {
    assembly
        .parts
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect()
}

/// The rigid partition of an assembly's part occurrences.
///
/// Cluster order follows first appearance in the assembly's part list,
/// and members keep their input order, so the partition is reproducible
/// for a given input ordering.
#[derive(Debug, Clone)]
pub struct RigidClusters {
    /// Part indices per cluster.
    pub clusters: Vec<Vec<usize>>,
    membership: Vec<usize>,
}

impl RigidClusters {
    /// Cluster index of a part. `part_index` must index the same
    /// assembly this partition was computed from.
    pub fn cluster_of(&self, part_index: usize) -> usize {
        self.membership[part_index]
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether the partition is empty.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Partition the assembly's parts into rigid clusters.
///
/// Joint mates never merge clusters; self-mates and duplicate mates are
/// idempotent. Mates naming unknown parts are skipped with a warning.
/// Clustering itself cannot fail.
pub fn cluster_rigid(assembly: &AssemblyGraph, diags: &mut Diagnostics) -> RigidClusters {
    let index = part_indices(assembly);
    let mut forest = UnionFind::new(assembly.parts.len());

    for mate in &assembly.mates {
        if !mate.is_rigid() {
            continue;
        }
        let mut indices = [0usize; 2];
        let mut resolved = true;
        for (slot, entity) in indices.iter_mut().zip(mate.entities.iter()) {
            match index.get(entity.part.as_str()) {
                Some(&i) => *slot = i,
                None => {
                    diags.warn(Warning::UnknownMatePart {
                        mate: mate.name.clone(),
                        part: entity.part.clone(),
                    });
                    resolved = false;
                }
            }
        }
        if resolved {
            forest.union(indices[0], indices[1]);
        }
    }

    let part_count = assembly.parts.len();
    let mut cluster_for_root: Vec<Option<usize>> = vec![None; part_count];
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut membership = vec![0usize; part_count];

    for i in 0..part_count {
        let root = forest.find(i);
        let ci = match cluster_for_root[root] {
            Some(ci) => ci,
            None => {
                let ci = clusters.len();
                clusters.push(Vec::new());
                cluster_for_root[root] = Some(ci);
                ci
            }
        };
        clusters[ci].push(i);
        membership[i] = ci;
    }

    RigidClusters {
        clusters,
        membership,
    }
}

/// Union-find over a plain index arena, with path compression and
/// union by rank. Unions are applied in mate input order; the internal
/// root choice is a lookup key only and never appears in output.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            Ordering::Less => self.parent[ra] = rb,
            Ordering::Greater => self.parent[rb] = ra,
            Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_assembly::{Mate, MateEntity, MateKind, MateType, PartNode};
    use armature_math::Transform;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn part(id: &str) -> PartNode {
        PartNode {
            id: id.to_string(),
            name: id.to_string(),
            module: None,
            world_transform: Some(Transform::identity()),
        }
    }

    fn entity(part: &str) -> MateEntity {
        MateEntity {
            part: part.to_string(),
            local_transform: Transform::identity(),
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

    fn partition(clusters: &RigidClusters) -> BTreeSet<BTreeSet<usize>> {
        clusters
            .clusters
            .iter()
            .map(|c| c.iter().copied().collect())
            .collect()
    }

    #[test]
    fn chain_of_rigid_mates_forms_one_cluster() {
        let mut asm = AssemblyGraph::new();
        for id in ["a", "b", "c", "d"] {
            asm.parts.push(part(id));
        }
        asm.mates.push(rigid("m1", "a", "b"));
        asm.mates.push(rigid("m2", "b", "c"));

        let mut diags = Diagnostics::new();
        let clusters = cluster_rigid(&asm, &mut diags);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.clusters[0], vec![0, 1, 2]);
        assert_eq!(clusters.clusters[1], vec![3]);
        assert_eq!(clusters.cluster_of(2), 0);
        assert!(diags.warnings().is_empty());
    }

    #[test]
    fn joint_mates_never_merge() {
        let mut asm = AssemblyGraph::new();
        asm.parts.push(part("a"));
        asm.parts.push(part("b"));
        asm.mates.push(joint("joint_1", "a", "b"));

        let mut diags = Diagnostics::new();
        let clusters = cluster_rigid(&asm, &mut diags);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn self_and_duplicate_mates_are_idempotent() {
        let mut asm = AssemblyGraph::new();
        asm.parts.push(part("a"));
        asm.parts.push(part("b"));
        asm.mates.push(rigid("m1", "a", "a"));
        asm.mates.push(rigid("m2", "a", "b"));
        asm.mates.push(rigid("m3", "a", "b"));
        asm.mates.push(rigid("m4", "b", "a"));

        let mut diags = Diagnostics::new();
        let clusters = cluster_rigid(&asm, &mut diags);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters.clusters[0], vec![0, 1]);
    }

    #[test]
    fn unknown_part_is_warned_and_skipped() {
        let mut asm = AssemblyGraph::new();
        asm.parts.push(part("a"));
        asm.parts.push(part("b"));
        asm.mates.push(rigid("m1", "a", "ghost"));

        let mut diags = Diagnostics::new();
        let clusters = cluster_rigid(&asm, &mut diags);
        assert_eq!(clusters.len(), 2);
        assert_eq!(
            diags.warnings(),
            &[Warning::UnknownMatePart {
                mate: "m1".to_string(),
                part: "ghost".to_string(),
            }]
        );
    }

    fn shuffle_fixture() -> (AssemblyGraph, Vec<Mate>) {
        let mut asm = AssemblyGraph::new();
        for id in ["a", "b", "c", "d", "e", "f", "g", "h"] {
            asm.parts.push(part(id));
        }
        let mates = vec![
            rigid("m1", "a", "b"),
            rigid("m2", "b", "c"),
            rigid("m3", "c", "a"),
            rigid("m4", "d", "e"),
            joint("joint_1", "c", "d"),
            rigid("m5", "f", "g"),
            rigid("m6", "g", "h"),
        ];
        (asm, mates)
    }

    proptest! {
        #[test]
        fn partition_is_stable_under_mate_order(order in Just(shuffle_fixture().1).prop_shuffle()) {
            let (mut reference, mates) = shuffle_fixture();
            reference.mates = mates;
            let mut diags = Diagnostics::new();
            let expected = partition(&cluster_rigid(&reference, &mut diags));

            let (mut shuffled, _) = shuffle_fixture();
            shuffled.mates = order;
            let mut diags = Diagnostics::new();
            let got = partition(&cluster_rigid(&shuffled, &mut diags));

            prop_assert_eq!(expected, got);
        }
    }
}
