//! Animation playback.
//!
//! An [`AnimationMixer`] belongs to exactly one loaded model. It owns the
//! model's clips, one [`AnimationAction`] per clip that was requested via
//! [`AnimationMixer::clip_action`], and a running clock. Every
//! [`AnimationMixer::update`] advances the clock and all playing actions and
//! writes the sampled channel values into the model's node transforms.
//!
//! Actions are not blended: when two playing actions animate the same node
//! property, the action created later wins.

use std::collections::HashMap;

use crate::{
    data_structures::{model::LoadedModel, scene_graph::traverse_mut},
    resources::animation::AnimationClip,
};

pub mod sampler;
pub mod skinning;

use sampler::{Sample, sample};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Play once and hold the last frame.
    Once,
    /// Wrap around to the start when the end of the clip is reached.
    #[default]
    Repeat,
}

/// Playback state of one clip inside a mixer.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationAction {
    clip: usize,
    time: f32,
    playing: bool,
    loop_mode: LoopMode,
}

impl AnimationAction {
    fn new(clip: usize) -> Self {
        Self {
            clip,
            time: 0.0,
            playing: false,
            loop_mode: LoopMode::default(),
        }
    }

    pub fn play(&mut self) -> &mut Self {
        self.playing = true;
        self
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self) -> &mut Self {
        self.playing = false;
        self.time = 0.0;
        self
    }

    pub fn set_loop(&mut self, loop_mode: LoopMode) -> &mut Self {
        self.loop_mode = loop_mode;
        self
    }

    pub fn clip(&self) -> usize {
        self.clip
    }

    /// Local playback position in seconds, always within `0..=duration`.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    fn advance(&mut self, delta: f32, duration: f32) {
        if duration <= 0.0 {
            self.time = 0.0;
            return;
        }
        self.time = match self.loop_mode {
            LoopMode::Repeat => (self.time + delta).rem_euclid(duration),
            LoopMode::Once => (self.time + delta).clamp(0.0, duration),
        };
    }
}

#[derive(Debug)]
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    actions: Vec<AnimationAction>,
    time: f32,
}

impl AnimationMixer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            actions: Vec::new(),
            time: 0.0,
        }
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    /// Total time this mixer has been advanced by.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Returns the action for `clip`, creating it on first use.
    pub fn clip_action(&mut self, clip: usize) -> Option<&mut AnimationAction> {
        if clip >= self.clips.len() {
            return None;
        }
        let idx = match self.actions.iter().position(|a| a.clip == clip) {
            Some(idx) => idx,
            None => {
                self.actions.push(AnimationAction::new(clip));
                self.actions.len() - 1
            }
        };
        self.actions.get_mut(idx)
    }

    /// Creates an action for every clip and starts all of them.
    pub fn play_all(&mut self) {
        for clip in 0..self.clips.len() {
            if let Some(action) = self.clip_action(clip) {
                action.play();
            }
        }
    }

    /// Advances the clock and every playing action by `delta` seconds, then poses `model`.
    pub fn update(&mut self, delta: f32, model: &mut LoadedModel) {
        self.time += delta;
        for action in self.actions.iter_mut().filter(|a| a.playing) {
            let duration = self.clips[action.clip].duration;
            action.advance(delta, duration);
        }
        let pose = self.pose();
        if pose.is_empty() {
            return;
        }
        traverse_mut(&mut model.root, &mut |node| {
            let Some(samples) = node.source_index().and_then(|idx| pose.get(&idx)) else {
                return;
            };
            let local = node.local_transform_mut();
            for sample in samples {
                match *sample {
                    Sample::Translation(t) => local.position = t,
                    Sample::Rotation(r) => local.rotation = r,
                    Sample::Scale(s) => local.scale = s,
                }
            }
        });
    }

    /// Channel values of all playing actions at their current time, keyed by glTF node index.
    fn pose(&self) -> HashMap<usize, Vec<Sample>> {
        let mut pose: HashMap<usize, Vec<Sample>> = HashMap::new();
        for action in self.actions.iter().filter(|a| a.playing) {
            for channel in &self.clips[action.clip].channels {
                if let Some(value) = sample(channel, action.time) {
                    pose.entry(channel.target).or_default().push(value);
                }
            }
        }
        pose
    }
}
