//! Keyframe sampling for step, linear and cubic-spline channels.

use cgmath::{InnerSpace, VectorSpace};

use crate::resources::animation::{Channel, Interpolation, Keyframes};

/// The value of one channel at a point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(cgmath::Vector3<f32>),
    Rotation(cgmath::Quaternion<f32>),
    Scale(cgmath::Vector3<f32>),
}

/// Samples `channel` at `time` seconds. Times outside the keyframe range clamp to the
/// first or last keyframe. Returns `None` for channels without keyframes.
pub fn sample(channel: &Channel, time: f32) -> Option<Sample> {
    let ts = &channel.timestamps;
    let interp = channel.interpolation;
    match &channel.keyframes {
        Keyframes::Translation(values) => {
            sample_values(ts, values, interp, time, |a, b, s| a.lerp(b, s)).map(Sample::Translation)
        }
        Keyframes::Scale(values) => {
            sample_values(ts, values, interp, time, |a, b, s| a.lerp(b, s)).map(Sample::Scale)
        }
        Keyframes::Rotation(values) => sample_values(ts, values, interp, time, slerp)
            .map(|q| Sample::Rotation(q.normalize())),
    }
}

fn sample_values<V, F>(
    timestamps: &[f32],
    values: &[V],
    interpolation: Interpolation,
    time: f32,
    lerp: F,
) -> Option<V>
where
    V: VectorSpace<Scalar = f32>,
    F: Fn(V, V, f32) -> V,
{
    let stride = match interpolation {
        Interpolation::CubicSpline => 3,
        _ => 1,
    };
    let len = timestamps.len().min(values.len() / stride);
    if len == 0 {
        return None;
    }
    // for cubic splines the actual value sits between the in- and out-tangent
    let value = |k: usize| match interpolation {
        Interpolation::CubicSpline => values[k * 3 + 1],
        _ => values[k],
    };

    let next = timestamps[..len].partition_point(|&k| k <= time);
    if next == 0 {
        return Some(value(0));
    }
    if next >= len {
        return Some(value(len - 1));
    }
    let prev = next - 1;
    let (t0, t1) = (timestamps[prev], timestamps[next]);
    let span = t1 - t0;
    if span <= f32::EPSILON {
        return Some(value(next));
    }
    let s = (time - t0) / span;

    Some(match interpolation {
        Interpolation::Step => value(prev),
        Interpolation::Linear => lerp(value(prev), value(next), s),
        Interpolation::CubicSpline => {
            let out_tangent = values[prev * 3 + 2];
            let in_tangent = values[next * 3];
            let s2 = s * s;
            let s3 = s2 * s;
            value(prev) * (2.0 * s3 - 3.0 * s2 + 1.0)
                + out_tangent * (span * (s3 - 2.0 * s2 + s))
                + value(next) * (-2.0 * s3 + 3.0 * s2)
                + in_tangent * (span * (s3 - s2))
        }
    })
}

/// Spherical interpolation along the shortest arc.
fn slerp(a: cgmath::Quaternion<f32>, b: cgmath::Quaternion<f32>, s: f32) -> cgmath::Quaternion<f32> {
    let mut b = b;
    let mut cos = a.dot(b);
    if cos < 0.0 {
        b = -b;
        cos = -cos;
    }
    if cos > 0.9995 {
        return (a * (1.0 - s) + b * s).normalize();
    }
    let theta = cos.acos();
    let sin = theta.sin();
    a * (((1.0 - s) * theta).sin() / sin) + b * ((s * theta).sin() / sin)
}
