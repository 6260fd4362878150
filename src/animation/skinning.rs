//! CPU skinning of glTF skins.
//!
//! Skinned vertices are produced directly in world space: the joint matrix of
//! joint `i` is `world(joint_i) * inverse_bind_i`, so the mesh node's own
//! transform does not take part.

use std::collections::HashMap;

use cgmath::{InnerSpace, SquareMatrix, Zero};

use crate::data_structures::model::{ModelVertex, Primitive, Skin};

/// One matrix per joint. Joints missing from `worlds` fall back to the identity.
pub fn joint_matrices(
    skin: &Skin,
    worlds: &HashMap<usize, cgmath::Matrix4<f32>>,
) -> Vec<cgmath::Matrix4<f32>> {
    skin.joints
        .iter()
        .enumerate()
        .map(|(i, joint)| {
            let world = worlds
                .get(joint)
                .copied()
                .unwrap_or_else(cgmath::Matrix4::identity);
            let inverse_bind = skin
                .inverse_bind_matrices
                .get(i)
                .copied()
                .unwrap_or_else(cgmath::Matrix4::identity);
            world * inverse_bind
        })
        .collect()
}

/// Deforms the vertices of `primitive`. Returns `None` if the primitive is not skinned.
pub fn skin_vertices(
    primitive: &Primitive,
    joints: &[cgmath::Matrix4<f32>],
) -> Option<Vec<ModelVertex>> {
    let skin = primitive.skin_weights.as_ref()?;
    let vertices = primitive
        .vertices
        .iter()
        .enumerate()
        .map(|(i, vertex)| {
            let (Some(ids), Some(weights)) = (skin.joints.get(i), skin.weights.get(i)) else {
                return *vertex;
            };
            let mut blended = cgmath::Matrix4::zero();
            let mut total = 0.0;
            for (id, weight) in ids.iter().zip(weights) {
                if *weight <= 0.0 {
                    continue;
                }
                if let Some(joint) = joints.get(*id as usize) {
                    blended = blended + *joint * *weight;
                    total += *weight;
                }
            }
            if total <= 0.0 {
                return *vertex;
            }
            let blended = blended * (1.0 / total);
            let position = blended * cgmath::Vector3::from(vertex.position).extend(1.0);
            let normal = (blended * cgmath::Vector3::from(vertex.normal).extend(0.0)).truncate();
            let normal = if normal.magnitude2() > 0.0 {
                normal.normalize()
            } else {
                normal
            };
            ModelVertex {
                position: position.truncate().into(),
                normal: normal.into(),
                tex_coords: vertex.tex_coords,
            }
        })
        .collect();
    Some(vertices)
}
