/// Keyframe values of one animation channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Keyframes {
    Translation(Vec<cgmath::Vector3<f32>>),
    Rotation(Vec<cgmath::Quaternion<f32>>),
    Scale(Vec<cgmath::Vector3<f32>>),
}

impl Keyframes {
    pub fn len(&self) -> usize {
        match self {
            Keyframes::Translation(v) => v.len(),
            Keyframes::Rotation(v) => v.len(),
            Keyframes::Scale(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    /// Each keyframe is stored as `[in_tangent, value, out_tangent]`.
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(value: gltf::animation::Interpolation) -> Self {
        match value {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

/// Animates one property (translation, rotation or scale) of one node.
#[derive(Clone, Debug)]
pub struct Channel {
    /// glTF index of the animated node.
    pub target: usize,
    pub interpolation: Interpolation,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

/// A named animation: all channels that belong to one glTF animation.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl AnimationClip {
    /// The duration is the latest keyframe time over all channels.
    pub fn new(name: String, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.timestamps.last().copied())
            .fold(0.0_f32, f32::max);
        Self {
            name,
            channels,
            duration,
        }
    }
}
