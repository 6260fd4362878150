use std::collections::HashMap;

use anyhow::{Context, bail};

use crate::{
    data_structures::{
        model::{LoadedModel, Material, Mesh, ModelVertex, Primitive, Skin, SkinWeights},
        scene_graph::{ContainerNode, SceneNode, to_scene_node},
    },
    resources::{
        animation::{AnimationClip, Channel, Keyframes},
        fetch::{load_binary, sibling_path},
    },
};

/**
 * This module contains all logic for loading meshes, materials and animations from external files.
 */
pub mod animation;
pub mod fetch;

/// Everything a glTF file provides: the model and its animation clips.
pub struct LoadedAsset {
    pub model: LoadedModel,
    pub clips: Vec<AnimationClip>,
}

pub async fn load_model_gltf(root: &str, file_name: &str) -> anyhow::Result<LoadedAsset> {
    let bytes = load_binary(root, file_name).await?;
    parse_model_gltf(root, file_name, &bytes).await
}

/// Parses a `.glb` or `.gltf` file. External buffers and images are fetched relative to `file_name`.
pub async fn parse_model_gltf(
    root: &str,
    file_name: &str,
    bytes: &[u8],
) -> anyhow::Result<LoadedAsset> {
    let gltf = gltf::Gltf::from_slice(bytes)
        .with_context(|| format!("{} is not a valid glTF file", file_name))?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.into()),
                None => bail!("{} references a binary chunk it does not contain", file_name),
            },
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    bail!("embedded data URIs are not supported ({}), use .glb instead", file_name);
                }
                buffer_data.push(load_binary(root, &sibling_path(file_name, uri)).await?);
            }
        }
    }

    let materials = load_materials(&gltf, &buffer_data, root, file_name).await;
    let meshes = load_meshes(&gltf, &buffer_data, file_name);
    let skins = load_skins(&gltf, &buffer_data);
    let clips = load_animations(&gltf, &buffer_data, file_name);

    let mut root_node = ContainerNode::new(Some(file_name.to_string()), None);
    match gltf.default_scene().or_else(|| gltf.scenes().next()) {
        Some(scene) => scene
            .nodes()
            .for_each(|node| root_node.add_child(to_scene_node(node, &meshes))),
        None => log::warn!("{} contains no scene, the model will be empty", file_name),
    }

    Ok(LoadedAsset {
        model: LoadedModel::new(file_name, root_node, materials, skins),
        clips,
    })
}

async fn load_materials(
    gltf: &gltf::Gltf,
    buffer_data: &[Vec<u8>],
    root: &str,
    file_name: &str,
) -> Vec<Material> {
    let mut images: HashMap<usize, Option<image::RgbaImage>> = HashMap::new();
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let base_color_texture = match pbr.base_color_texture() {
            Some(info) => {
                let source = info.texture().source();
                let idx = source.index();
                if !images.contains_key(&idx) {
                    let decoded = match load_image(source, buffer_data, root, file_name).await {
                        Ok(img) => Some(img),
                        Err(e) => {
                            log::warn!("Texture {} of {} could not be loaded: {:#}", idx, file_name, e);
                            None
                        }
                    };
                    images.insert(idx, decoded);
                }
                images.get(&idx).cloned().flatten()
            }
            None => None,
        };
        materials.push(Material {
            name: material
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}#{}", file_name, materials.len())),
            base_color: pbr.base_color_factor(),
            base_color_texture,
        });
    }
    materials
}

async fn load_image(
    image: gltf::image::Image<'_>,
    buffer_data: &[Vec<u8>],
    root: &str,
    file_name: &str,
) -> anyhow::Result<image::RgbaImage> {
    let bytes = match image.source() {
        gltf::image::Source::View { view, mime_type: _ } => {
            let buffer = buffer_data
                .get(view.buffer().index())
                .context("image view points to a missing buffer")?;
            let range = view.offset()..view.offset() + view.length();
            buffer
                .get(range)
                .context("image view exceeds its buffer")?
                .to_vec()
        }
        gltf::image::Source::Uri { uri, mime_type: _ } => {
            if uri.starts_with("data:") {
                bail!("embedded data URIs are not supported");
            }
            load_binary(root, &sibling_path(file_name, uri)).await?
        }
    };
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

fn load_meshes(gltf: &gltf::Gltf, buffer_data: &[Vec<u8>], file_name: &str) -> Vec<Mesh> {
    gltf.meshes()
        .map(|mesh| {
            let primitives = mesh
                .primitives()
                .filter_map(|primitive| {
                    if primitive.mode() != gltf::mesh::Mode::Triangles {
                        log::warn!(
                            "Skipping a {:?} primitive of mesh {} in {}, only triangles are drawn.",
                            primitive.mode(),
                            mesh.index(),
                            file_name
                        );
                        return None;
                    }
                    let reader =
                        primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));

                    let Some(positions) = reader.read_positions() else {
                        log::warn!("Mesh {} in {} has a primitive without positions.", mesh.index(), file_name);
                        return None;
                    };
                    let mut vertices: Vec<ModelVertex> = positions
                        .map(|position| ModelVertex {
                            position,
                            ..Default::default()
                        })
                        .collect();
                    if let Some(normals) = reader.read_normals() {
                        vertices
                            .iter_mut()
                            .zip(normals)
                            .for_each(|(v, normal)| v.normal = normal);
                    }
                    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                        vertices
                            .iter_mut()
                            .zip(tex_coords)
                            .for_each(|(v, tex_coord)| v.tex_coords = tex_coord);
                    }

                    let indices = match reader.read_indices() {
                        Some(indices) => indices.into_u32().collect(),
                        None => (0..vertices.len() as u32).collect(),
                    };

                    let skin_weights = match (reader.read_joints(0), reader.read_weights(0)) {
                        (Some(joints), Some(weights)) => Some(SkinWeights {
                            joints: joints.into_u16().collect(),
                            weights: weights.into_f32().collect(),
                        }),
                        _ => None,
                    };

                    Some(Primitive {
                        vertices,
                        indices,
                        material: primitive.material().index(),
                        skin_weights,
                    })
                })
                .collect();
            Mesh {
                name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                primitives,
            }
        })
        .collect()
}

fn load_skins(gltf: &gltf::Gltf, buffer_data: &[Vec<u8>]) -> Vec<Skin> {
    gltf.skins()
        .map(|skin| {
            let reader = skin.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
            let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
            // glTF defaults missing inverse bind matrices to identity
            let inverse_bind_matrices: Vec<cgmath::Matrix4<f32>> = match reader.read_inverse_bind_matrices() {
                Some(matrices) => matrices.map(cgmath::Matrix4::from).collect(),
                None => vec![cgmath::SquareMatrix::identity(); joints.len()],
            };
            Skin {
                joints,
                inverse_bind_matrices,
            }
        })
        .collect()
}

fn load_animations(
    gltf: &gltf::Gltf,
    buffer_data: &[Vec<u8>],
    file_name: &str,
) -> Vec<AnimationClip> {
    gltf.animations()
        .map(|animation| {
            let channels = animation
                .channels()
                .enumerate()
                .filter_map(|(idx, channel)| {
                    let reader =
                        channel.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
                    let Some(inputs) = reader.read_inputs() else {
                        log::warn!("No timestamps found in channel {} of {}", idx, file_name);
                        return None;
                    };
                    let timestamps: Vec<f32> = inputs.collect();
                    let keyframes = match reader.read_outputs() {
                        Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
                            Keyframes::Translation(translations.map(Into::into).collect())
                        }
                        Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => {
                            Keyframes::Rotation(
                                rotations
                                    .into_f32()
                                    .map(|q| cgmath::Quaternion::new(q[3], q[0], q[1], q[2]))
                                    .collect(),
                            )
                        }
                        Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
                            Keyframes::Scale(scales.map(Into::into).collect())
                        }
                        // TODO: implement morph target weights once meshes carry morph targets
                        Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) => {
                            log::warn!(
                                "Skipping morph target channel {} of {}",
                                idx,
                                file_name
                            );
                            return None;
                        }
                        None => {
                            log::warn!("No keyframes found in channel {} of {}", idx, file_name);
                            return None;
                        }
                    };
                    Some(Channel {
                        target: channel.target().node().index(),
                        interpolation: channel.sampler().interpolation().into(),
                        timestamps,
                        keyframes,
                    })
                })
                .collect();
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation_{}", animation.index()));
            AnimationClip::new(name, channels)
        })
        .collect()
}
