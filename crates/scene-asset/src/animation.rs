use std::fmt::Debug;

use glam::{Quat, Vec2, Vec3, Vec4};
use serde_json::Value;

use crate::{accessor::Accessor, extension::Extensions, index::Index, node::Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    CubicSpline,
}

impl Interpolation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "STEP" => Some(Self::Step),
            "LINEAR" => Some(Self::Linear),
            "CUBICSPLINE" => Some(Self::CubicSpline),
            _ => None,
        }
    }

    /// Output values stored per keyframe.
    pub fn values_per_keyframe(self) -> usize {
        match self {
            Interpolation::CubicSpline => 3,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Translation,
    Rotation,
    Scale,
    Weights,
}

impl Property {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "translation" => Some(Self::Translation),
            "rotation" => Some(Self::Rotation),
            "scale" => Some(Self::Scale),
            "weights" => Some(Self::Weights),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationSampler {
    /// Keyframe times in seconds.
    pub input: Index<Accessor>,
    pub output: Index<Accessor>,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone)]
pub struct Channel {
    /// Position in the owning animation's sampler list.
    pub sampler: usize,
    /// Channels without a target node are ignored by players.
    pub target: Option<Index<Node>>,
    pub property: Property,
}

#[derive(Debug, Clone)]
pub struct Animation {
    pub name: Option<String>,
    pub channels: Vec<Channel>,
    pub samplers: Vec<AnimationSampler>,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct AnimationKeyFrame<T: Debug + Clone> {
    pub time: f32,
    pub value: T,
}

#[derive(Debug, Clone)]
pub enum AnimationKeyFrames<T: Debug + Clone> {
    Linear(Vec<AnimationKeyFrame<T>>),
    Step(Vec<AnimationKeyFrame<T>>),
    // in, val, out
    CubicSpline(Vec<AnimationKeyFrame<(T, T, T)>>),
}

/// Decoded keyframes of one channel.
#[derive(Debug, Clone)]
pub enum ChannelKeyFrames {
    Translation(AnimationKeyFrames<Vec3>),
    Rotation(AnimationKeyFrames<Quat>),
    Scale(AnimationKeyFrames<Vec3>),
    Weights(AnimationKeyFrames<Vec<f32>>),
}

pub trait Interpolate: Sized {
    fn linear(a: Self, b: Self, t: f32) -> Self;
    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self;
}

fn hermite_weights(t: f32) -> [f32; 4] {
    let t2 = t.powi(2);
    let t3 = t.powi(3);
    [
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    ]
}

macro_rules! impl_vector_interpolate {
    ($($ty:ty),*) => {
        $(
            impl Interpolate for $ty {
                fn linear(a: Self, b: Self, t: f32) -> Self {
                    a * (1.0 - t) + b * t
                }

                fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
                    let [first, second, third, forth] = hermite_weights(t);
                    vk * first + bk * (td * second) + vk_1 * third + ak_1 * (td * forth)
                }
            }
        )*
    };
}

impl_vector_interpolate!(f32, Vec2, Vec3, Vec4);

impl Interpolate for Quat {
    fn linear(a: Self, b: Self, t: f32) -> Self {
        crate::math::quaternion_slerp(a, b, t)
    }

    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
        let value = Vec4::cubic_spline(vk.into(), bk.into(), vk_1.into(), ak_1.into(), t, td);
        Quat::from_vec4(value).normalize()
    }
}

impl Interpolate for Vec<f32> {
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a.into_iter()
            .zip(b)
            .map(|(a, b)| f32::linear(a, b, t))
            .collect()
    }

    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
        vk.into_iter()
            .zip(bk)
            .zip(vk_1)
            .zip(ak_1)
            .map(|(((vk, bk), vk_1), ak_1)| f32::cubic_spline(vk, bk, vk_1, ak_1, t, td))
            .collect()
    }
}

impl<T: Debug + Clone + Interpolate> AnimationKeyFrames<T> {
    pub fn len(&self) -> usize {
        match self {
            AnimationKeyFrames::Linear(frames) | AnimationKeyFrames::Step(frames) => frames.len(),
            AnimationKeyFrames::CubicSpline(frames) => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time of the last keyframe.
    pub fn length(&self) -> f32 {
        match self {
            AnimationKeyFrames::Linear(frames) | AnimationKeyFrames::Step(frames) => {
                frames.last().map(|frame| frame.time).unwrap_or(0.0)
            }
            AnimationKeyFrames::CubicSpline(frames) => {
                frames.last().map(|frame| frame.time).unwrap_or(0.0)
            }
        }
    }

    /// Value at `time`, clamped to the first and last keyframes. `None`
    /// without keyframes.
    pub fn sample(&self, time: f32) -> Option<T> {
        // Ok(frame) lands on a single keyframe. Err(frame) lies between
        // `frame` and the next one.
        fn locate(times: impl Iterator<Item = f32>, time: f32) -> Result<usize, usize> {
            let mut last = None;
            for (index, frame_time) in times.enumerate() {
                if time < frame_time {
                    return match last {
                        Some(previous) => Err(previous),
                        None => Ok(0),
                    };
                }
                last = Some(index);
            }
            Ok(last.unwrap_or(0))
        }

        match self {
            AnimationKeyFrames::Step(frames) => {
                let index = match locate(frames.iter().map(|frame| frame.time), time) {
                    Ok(index) | Err(index) => index,
                };
                frames.get(index).map(|frame| frame.value.clone())
            }
            AnimationKeyFrames::Linear(frames) => {
                match locate(frames.iter().map(|frame| frame.time), time) {
                    Ok(index) => frames.get(index).map(|frame| frame.value.clone()),
                    Err(index) => {
                        let (from, to) = (&frames[index], &frames[index + 1]);
                        let t = (time - from.time) / (to.time - from.time);
                        Some(T::linear(from.value.clone(), to.value.clone(), t))
                    }
                }
            }
            AnimationKeyFrames::CubicSpline(frames) => {
                match locate(frames.iter().map(|frame| frame.time), time) {
                    Ok(index) => frames.get(index).map(|frame| frame.value.1.clone()),
                    Err(index) => {
                        let (from, to) = (&frames[index], &frames[index + 1]);
                        let td = to.time - from.time;
                        let t = (time - from.time) / td;
                        Some(T::cubic_spline(
                            from.value.1.clone(),
                            from.value.2.clone(),
                            to.value.1.clone(),
                            to.value.0.clone(),
                            t,
                            td,
                        ))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use glam::{Quat, Vec3};

    use super::{AnimationKeyFrame, AnimationKeyFrames, Interpolate, Interpolation, Property};

    fn frames<T: std::fmt::Debug + Clone>(values: &[(f32, T)]) -> Vec<AnimationKeyFrame<T>> {
        values
            .iter()
            .map(|(time, value)| AnimationKeyFrame {
                time: *time,
                value: value.clone(),
            })
            .collect()
    }

    #[test]
    fn names() {
        assert_eq!(
            Interpolation::from_name("CUBICSPLINE"),
            Some(Interpolation::CubicSpline)
        );
        assert_eq!(Interpolation::from_name("cubic"), None);
        assert_eq!(Property::from_path("weights"), Some(Property::Weights));
        assert_eq!(Property::from_path("pointer"), None);
    }

    #[test]
    fn linear_sampling_clamps_and_blends() {
        let keyframes = AnimationKeyFrames::Linear(frames(&[
            (0.0, Vec3::ZERO),
            (1.0, Vec3::new(2.0, 0.0, 0.0)),
            (3.0, Vec3::new(2.0, 4.0, 0.0)),
        ]));
        assert_eq!(keyframes.sample(-1.0), Some(Vec3::ZERO));
        assert_eq!(keyframes.sample(0.5), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(keyframes.sample(2.0), Some(Vec3::new(2.0, 2.0, 0.0)));
        assert_eq!(keyframes.sample(10.0), Some(Vec3::new(2.0, 4.0, 0.0)));
        assert_eq!(keyframes.length(), 3.0);
    }

    #[test]
    fn step_sampling_holds_previous_value() {
        let keyframes = AnimationKeyFrames::Step(frames(&[(0.0, 1.0f32), (1.0, 5.0)]));
        assert_eq!(keyframes.sample(0.99), Some(1.0));
        assert_eq!(keyframes.sample(1.0), Some(5.0));
    }

    #[test]
    fn empty_keyframes() {
        let keyframes: AnimationKeyFrames<f32> = AnimationKeyFrames::Linear(Vec::new());
        assert!(keyframes.is_empty());
        assert_eq!(keyframes.sample(0.0), None);
    }

    #[test]
    fn cubic_spline_hits_keyframes_and_uses_quadratic_term() {
        // Zero tangents reduce the spline to smoothstep.
        let value = f32::cubic_spline(0.0, 0.0, 1.0, 0.0, 0.5, 1.0);
        assert!((value - 0.5).abs() < 1e-6);
        let value = f32::cubic_spline(0.0, 0.0, 1.0, 0.0, 0.25, 1.0);
        assert!((value - 0.15625).abs() < 1e-6);

        let keyframes = AnimationKeyFrames::CubicSpline(frames(&[
            (0.0, (0.0f32, 2.0, 0.0)),
            (2.0, (0.0, 4.0, 0.0)),
        ]));
        assert_eq!(keyframes.sample(0.0), Some(2.0));
        assert_eq!(keyframes.sample(2.0), Some(4.0));
    }

    #[test]
    fn rotation_uses_slerp() {
        let keyframes = AnimationKeyFrames::Linear(frames(&[
            (0.0, Quat::IDENTITY),
            (1.0, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        ]));
        let Some(half) = keyframes.sample(0.5) else {
            panic!("no sample");
        };
        assert!(half.abs_diff_eq(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4), 1e-5));
        assert!((half.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn weights_blend_per_target() {
        let blended = Vec::<f32>::linear(vec![0.0, 1.0], vec![1.0, 0.0], 0.25);
        assert_eq!(blended, vec![0.25, 0.75]);
    }
}
