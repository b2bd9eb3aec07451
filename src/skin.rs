//! Per-bone influence extraction from fixed-width vertex weights.
//!
//! Authoring data arrives as one [`BoneWeights4`] per vertex. Cluster-based
//! skin deformers want the transpose: per bone, the vertices it influences
//! and with what weight. This module performs that extraction only —
//! normalization across a vertex's bones is the deformer's job.

use crate::types::BoneWeights4;

/// Collect the (vertex index, weight) pairs referencing `bone`.
///
/// Pairs come out in vertex-index order. A vertex referencing the same bone
/// from several slots contributes one pair per slot; slots with a zero
/// weight or an out-of-range index contribute nothing. Weights widen to
/// `f64`, the precision cluster deformers accumulate in.
pub fn influences_for_bone(weights: &[BoneWeights4], bone: usize) -> (Vec<u32>, Vec<f64>) {
    let mut indices = Vec::new();
    let mut values = Vec::new();
    for (vi, w) in weights.iter().enumerate() {
        for slot in 0..4 {
            if w.weights[slot] == 0.0 {
                continue;
            }
            if w.indices[slot] < 0 || w.indices[slot] as usize != bone {
                continue;
            }
            indices.push(vi as u32);
            values.push(w.weights[slot] as f64);
        }
    }
    (indices, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(slots: &[(i32, f32)]) -> BoneWeights4 {
        let mut w = BoneWeights4::default();
        for (i, &(bone, weight)) in slots.iter().enumerate() {
            w.indices[i] = bone;
            w.weights[i] = weight;
        }
        w
    }

    #[test]
    fn test_compaction_completeness() {
        let table = vec![
            weights(&[(0, 0.5), (1, 0.5)]),
            weights(&[(1, 1.0)]),
            weights(&[(0, 0.25), (2, 0.75)]),
        ];

        let (i0, w0) = influences_for_bone(&table, 0);
        assert_eq!(i0, vec![0, 2]);
        assert_eq!(w0, vec![0.5, 0.25]);

        let (i1, w1) = influences_for_bone(&table, 1);
        assert_eq!(i1, vec![0, 1]);
        assert_eq!(w1, vec![0.5, 1.0]);

        let (i2, w2) = influences_for_bone(&table, 2);
        assert_eq!(i2, vec![2]);
        assert_eq!(w2, vec![0.75]);
    }

    #[test]
    fn test_unused_slots_contribute_nothing() {
        let table = vec![BoneWeights4::default(), weights(&[(0, 1.0)])];
        let (indices, values) = influences_for_bone(&table, 0);
        assert_eq!(indices, vec![1]);
        assert_eq!(values, vec![1.0]);
    }

    #[test]
    fn test_zero_weight_skipped() {
        // Valid bone index but zero weight: inert slot.
        let table = vec![weights(&[(0, 0.0), (1, 1.0)])];
        let (indices, _) = influences_for_bone(&table, 0);
        assert!(indices.is_empty());
    }

    #[test]
    fn test_duplicate_slots_sum_preserved() {
        // A vertex may reference the same bone from two slots; both pairs
        // survive so the downstream accumulation sees the full sum.
        let table = vec![weights(&[(3, 0.3), (3, 0.2)])];
        let (indices, values) = influences_for_bone(&table, 3);
        assert_eq!(indices, vec![0, 0]);
        assert_eq!(values, vec![0.3f32 as f64, 0.2f32 as f64]);
    }

    #[test]
    fn test_foreign_bone_empty() {
        let table = vec![weights(&[(0, 1.0)]); 8];
        let (indices, values) = influences_for_bone(&table, 5);
        assert!(indices.is_empty());
        assert!(values.is_empty());
    }
}
