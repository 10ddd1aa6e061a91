//! Animation flattening
//!
//! Host animation is a set of scalar F-curves addressed by property path and
//! component index. Exporters want the opposite shape: per transform
//! property, one keyframe stream per axis, tagged with a [`GraphCode`].
//! [`Flattener`] performs that regrouping and checks that every axis of a
//! property carries the same number of keys.

mod channel;
mod flatten;

pub use channel::ChannelPath;
pub use flatten::{extract_tracks, Flattener};

use bxporter_core::{Error, GraphCode, GraphProperty, Result};
use smallvec::SmallVec;

/// One keyframe: left handle, center, right handle, each `(time, value)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub left: [f32; 2],
    pub center: [f32; 2],
    pub right: [f32; 2],
}

impl Keyframe {
    pub fn new(left: [f32; 2], center: [f32; 2], right: [f32; 2]) -> Self {
        Self {
            left,
            center,
            right,
        }
    }

    /// The six floats in file order
    pub fn to_floats(&self) -> [f32; 6] {
        [
            self.left[0],
            self.left[1],
            self.center[0],
            self.center[1],
            self.right[0],
            self.right[1],
        ]
    }

    pub fn from_floats(v: [f32; 6]) -> Self {
        Self::new([v[0], v[1]], [v[2], v[3]], [v[4], v[5]])
    }
}

/// Transform channel a group of curves drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Position,
    Euler,
    Quaternion,
    Scale,
}

impl ChannelKind {
    /// Emission order within a strip
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Position,
        ChannelKind::Euler,
        ChannelKind::Quaternion,
        ChannelKind::Scale,
    ];

    /// Map a host property name to a channel
    pub fn from_property(property: &str) -> Option<Self> {
        match property {
            "location" => Some(ChannelKind::Position),
            "rotation_euler" => Some(ChannelKind::Euler),
            "rotation_quaternion" => Some(ChannelKind::Quaternion),
            "scale" => Some(ChannelKind::Scale),
            _ => None,
        }
    }

    /// Number of components
    pub fn arity(self) -> usize {
        match self {
            ChannelKind::Quaternion => 4,
            _ => 3,
        }
    }

    /// Property whose graph codes tag this channel
    ///
    /// Euler and quaternion share the rotation codes; arity tells them apart.
    pub fn property(self) -> GraphProperty {
        match self {
            ChannelKind::Position => GraphProperty::Location,
            ChannelKind::Euler | ChannelKind::Quaternion => GraphProperty::Rotation,
            ChannelKind::Scale => GraphProperty::Scale,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Position => "position",
            ChannelKind::Euler => "euler",
            ChannelKind::Quaternion => "quaternion",
            ChannelKind::Scale => "scale",
        }
    }
}

/// Keyframes of one channel, one optional slot per axis
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    kind: ChannelKind,
    axes: SmallVec<[Option<Vec<Keyframe>>; 4]>,
}

impl ChannelGroup {
    /// Empty group with one slot per component
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            axes: SmallVec::from_elem(None, kind.arity()),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Store the keys of component `axis`
    pub fn set_axis(&mut self, axis: usize, keys: Vec<Keyframe>) -> Result<()> {
        let kind = self.kind;
        let arity = self.axes.len();
        let slot = self.axes.get_mut(axis).ok_or_else(|| {
            Error::consistency(format!(
                "{} has {} components, got index {}",
                kind.as_str(),
                arity,
                axis
            ))
        })?;
        if slot.is_some() {
            return Err(Error::consistency(format!(
                "{} component {} is driven twice",
                kind.as_str(),
                axis
            )));
        }
        *slot = Some(keys);
        Ok(())
    }

    /// Keys of component `axis`, if present
    pub fn axis(&self, axis: usize) -> Option<&[Keyframe]> {
        self.axes.get(axis).and_then(|slot| slot.as_deref())
    }

    /// Present axes with their graph codes, in component order
    pub fn graphs(&self) -> impl Iterator<Item = (GraphCode, &[Keyframe])> + '_ {
        let property = self.kind.property();
        self.axes.iter().enumerate().filter_map(move |(axis, slot)| {
            let keys = slot.as_deref()?;
            GraphCode::for_axis(property, axis).map(|code| (code, keys))
        })
    }

    /// Number of present axes
    pub fn graph_count(&self) -> usize {
        self.axes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph_count() == 0
    }

    /// Key count shared by all present axes
    pub fn keyframe_count(&self) -> usize {
        self.axes.iter().flatten().map(Vec::len).next().unwrap_or(0)
    }

    /// Check that all present axes have the same key count
    pub fn validate(&self) -> Result<()> {
        let mut counts = self
            .axes
            .iter()
            .enumerate()
            .filter_map(|(axis, slot)| slot.as_ref().map(|keys| (axis, keys.len())));

        if let Some((first_axis, expected)) = counts.next() {
            for (axis, count) in counts {
                if count != expected {
                    return Err(Error::consistency(format!(
                        "{} axis {} has {} keyframes but axis {} has {}",
                        self.kind.as_str(),
                        axis,
                        count,
                        first_axis,
                        expected
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The four transform channel groups of one target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelGroups {
    position: Option<ChannelGroup>,
    euler: Option<ChannelGroup>,
    quaternion: Option<ChannelGroup>,
    scale: Option<ChannelGroup>,
}

impl ChannelGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group for `kind`, created on first use
    pub fn group_mut(&mut self, kind: ChannelKind) -> &mut ChannelGroup {
        let slot = match kind {
            ChannelKind::Position => &mut self.position,
            ChannelKind::Euler => &mut self.euler,
            ChannelKind::Quaternion => &mut self.quaternion,
            ChannelKind::Scale => &mut self.scale,
        };
        slot.get_or_insert_with(|| ChannelGroup::new(kind))
    }

    pub fn group(&self, kind: ChannelKind) -> Option<&ChannelGroup> {
        match kind {
            ChannelKind::Position => self.position.as_ref(),
            ChannelKind::Euler => self.euler.as_ref(),
            ChannelKind::Quaternion => self.quaternion.as_ref(),
            ChannelKind::Scale => self.scale.as_ref(),
        }
    }

    /// Present groups in emission order
    pub fn iter(&self) -> impl Iterator<Item = &ChannelGroup> + '_ {
        ChannelKind::ALL
            .into_iter()
            .filter_map(move |kind| self.group(kind))
            .filter(|group| !group.is_empty())
    }

    /// All graphs of all groups, in emission order
    pub fn graphs(&self) -> impl Iterator<Item = (GraphCode, &[Keyframe])> + '_ {
        self.iter().flat_map(|group| group.graphs())
    }

    /// Total present axes over all groups
    pub fn graph_count(&self) -> usize {
        self.iter().map(ChannelGroup::graph_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.graph_count() == 0
    }

    /// Validate every present group
    pub fn validate(&self) -> Result<()> {
        for group in self.iter() {
            group.validate()?;
        }
        Ok(())
    }
}

/// Channel groups of one bone
#[derive(Debug, Clone, PartialEq)]
pub struct BoneChannels {
    pub name: String,
    pub groups: ChannelGroups,
}

/// A time range of one action with its regrouped channels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Strip {
    /// Start and end frame
    pub range: [f32; 2],
    /// Object-level channels
    pub object: ChannelGroups,
    /// Bone channels in first-seen order
    pub bones: Vec<BoneChannels>,
}

impl Strip {
    pub fn new(range: [f32; 2]) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    /// Groups of bone `name`, created on first use
    pub fn bone_mut(&mut self, name: &str) -> &mut ChannelGroups {
        let idx = match self.bones.iter().position(|b| b.name == name) {
            Some(idx) => idx,
            None => {
                self.bones.push(BoneChannels {
                    name: name.to_string(),
                    groups: ChannelGroups::new(),
                });
                self.bones.len() - 1
            }
        };
        &mut self.bones[idx].groups
    }

    pub fn bone(&self, name: &str) -> Option<&ChannelGroups> {
        self.bones.iter().find(|b| b.name == name).map(|b| &b.groups)
    }

    /// Whether any bone channel is present
    pub fn has_bones(&self) -> bool {
        !self.bones.is_empty()
    }

    /// Validate object and bone channels
    pub fn validate(&self) -> Result<()> {
        self.object.validate()?;
        for bone in &self.bones {
            bone.groups.validate().map_err(|e| e.with_context(format!("bone \"{}\"", bone.name)))?;
        }
        Ok(())
    }
}

/// A named sequence of strips
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: String,
    pub strips: Vec<Strip>,
    /// Whether the strips drive bones
    pub skeletal: bool,
}

impl Track {
    /// Build a track, deriving the skeletal flag from its strips
    pub fn new(name: impl Into<String>, strips: Vec<Strip>) -> Self {
        let skeletal = strips.iter().any(Strip::has_bones);
        Self {
            name: name.into(),
            strips,
            skeletal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<Keyframe> {
        (0..n)
            .map(|i| {
                let t = i as f32;
                Keyframe::new([t - 0.5, 0.0], [t, 0.0], [t + 0.5, 0.0])
            })
            .collect()
    }

    #[test]
    fn test_group_presized_to_arity() {
        let mut quat = ChannelGroup::new(ChannelKind::Quaternion);
        assert!(quat.set_axis(3, keys(1)).is_ok());
        assert_eq!(quat.graphs().map(|(c, _)| c).collect::<Vec<_>>(), vec![GraphCode::RotW]);

        let mut euler = ChannelGroup::new(ChannelKind::Euler);
        let err = euler.set_axis(3, keys(1)).unwrap_err();
        assert!(err.is_consistency_violation());
    }

    #[test]
    fn test_group_mismatch_detected() {
        let mut group = ChannelGroup::new(ChannelKind::Position);
        group.set_axis(0, keys(2)).unwrap();
        group.set_axis(1, keys(2)).unwrap();
        assert!(group.validate().is_ok());

        group.set_axis(2, keys(3)).unwrap();
        assert!(group.validate().unwrap_err().is_consistency_violation());
    }

    #[test]
    fn test_partial_axes_are_written_alone() {
        let mut group = ChannelGroup::new(ChannelKind::Scale);
        group.set_axis(2, keys(4)).unwrap();

        assert!(group.validate().is_ok());
        assert_eq!(group.graph_count(), 1);
        assert_eq!(group.keyframe_count(), 4);
        assert_eq!(group.graphs().next().unwrap().0, GraphCode::ScaleZ);
    }

    #[test]
    fn test_emission_order() {
        let mut groups = ChannelGroups::new();
        groups.group_mut(ChannelKind::Scale).set_axis(0, keys(1)).unwrap();
        groups.group_mut(ChannelKind::Position).set_axis(1, keys(1)).unwrap();
        groups.group_mut(ChannelKind::Quaternion).set_axis(3, keys(1)).unwrap();

        let codes: Vec<GraphCode> = groups.graphs().map(|(c, _)| c).collect();
        assert_eq!(codes, vec![GraphCode::LocY, GraphCode::RotW, GraphCode::ScaleX]);
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let mut group = ChannelGroup::new(ChannelKind::Position);
        group.set_axis(0, keys(1)).unwrap();
        assert!(group.set_axis(0, keys(1)).is_err());
    }

    #[test]
    fn test_track_skeletal_flag() {
        let mut strip = Strip::new([1.0, 10.0]);
        assert!(!Track::new("Idle", vec![strip.clone()]).skeletal);

        strip
            .bone_mut("Arm")
            .group_mut(ChannelKind::Position)
            .set_axis(0, keys(1))
            .unwrap();
        let track = Track::new("Wave", vec![Strip::new([0.0, 1.0]), strip]);
        assert!(track.skeletal);
    }

    #[test]
    fn test_keyframe_floats() {
        let key = Keyframe::new([1.0, 2.0], [3.0, 4.0], [5.0, 6.0]);
        assert_eq!(key.to_floats(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(Keyframe::from_floats(key.to_floats()), key);
    }
}
