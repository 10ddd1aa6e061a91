//! F-curve to track flattening

use bxporter_core::{Error, Result, ResultExt};
use bxporter_scene::{Action, FCurve, Object, Scene};
use tracing::{debug, warn};

use super::{ChannelKind, ChannelPath, Keyframe, Strip, Track};
use crate::options::ExportOptions;

/// Converts object animation into flattened tracks
#[derive(Debug, Clone)]
pub struct Flattener {
    skip_unknown_channels: bool,
}

impl Default for Flattener {
    fn default() -> Self {
        Self {
            skip_unknown_channels: true,
        }
    }
}

impl Flattener {
    /// Flattener configured from export options
    pub fn new(options: &ExportOptions) -> Self {
        Self {
            skip_unknown_channels: options.skip_unknown_channels,
        }
    }

    /// Fail on curves driving unknown properties instead of skipping them
    pub fn strict() -> Self {
        Self {
            skip_unknown_channels: false,
        }
    }

    /// All tracks of `object`, empty without animation data
    ///
    /// The active action comes first as a track of its own, followed by one
    /// track per NLA track.
    pub fn extract_tracks(&self, object: &Object, scene: &Scene) -> Result<Vec<Track>> {
        let Some(anim) = &object.animation else {
            return Ok(Vec::new());
        };

        let mut tracks = Vec::with_capacity(anim.nla_tracks.len() + 1);

        if let Some(action_name) = &anim.action {
            let action = scene.action(action_name)?;
            let strip = self
                .flatten_action(action)
                .with_context(|| format!("action \"{}\"", action.name))?;
            tracks.push(Track::new(action.name.clone(), vec![strip]));
        }

        for nla in &anim.nla_tracks {
            let mut strips = Vec::with_capacity(nla.strips.len());
            for nla_strip in &nla.strips {
                let action = scene
                    .action(&nla_strip.action)
                    .with_context(|| format!("strip \"{}\" of track \"{}\"", nla_strip.name, nla.name))?;
                let strip = self
                    .flatten_action(action)
                    .with_context(|| format!("action \"{}\" of track \"{}\"", action.name, nla.name))?;
                strips.push(strip);
            }
            tracks.push(Track::new(nla.name.clone(), strips));
        }

        debug!(object = %object.name, tracks = tracks.len(), "Extracted tracks");
        Ok(tracks)
    }

    /// Regroup the curves of one action into a strip
    pub fn flatten_action(&self, action: &Action) -> Result<Strip> {
        let mut strip = Strip::new(action.frame_range);

        for curve in &action.fcurves {
            let parsed = ChannelPath::parse(&curve.data_path)
                .and_then(|path| ChannelKind::from_property(path.property).map(|kind| (path, kind)));

            let Some((path, kind)) = parsed else {
                if self.skip_unknown_channels {
                    warn!(action = %action.name, path = %curve.data_path, "Skipping unsupported channel");
                    continue;
                }
                return Err(Error::unsupported(
                    "animation channel",
                    action.name.clone(),
                    curve.data_path.clone(),
                ));
            };

            let groups = match path.bone {
                Some(bone) => strip.bone_mut(bone),
                None => &mut strip.object,
            };
            groups
                .group_mut(kind)
                .set_axis(curve.array_index, collect_keys(curve))
                .with_context(|| format!("curve \"{}\"", curve.data_path))?;
        }

        strip.validate()?;
        Ok(strip)
    }
}

fn collect_keys(curve: &FCurve) -> Vec<Keyframe> {
    curve
        .keyframe_points
        .iter()
        .map(|k| Keyframe::new(k.handle_left, k.co, k.handle_right))
        .collect()
}

/// Flatten `object` animation with default settings
pub fn extract_tracks(object: &Object, scene: &Scene) -> Result<Vec<Track>> {
    Flattener::default().extract_tracks(object, scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bxporter_core::GraphCode;
    use bxporter_scene::{AnimationData, KeyframePoint, NlaStrip, NlaTrack, ObjectData};

    fn curve(path: &str, index: usize, frames: &[f32]) -> FCurve {
        frames.iter().fold(FCurve::new(path, index), |c, &f| {
            c.with_key(KeyframePoint::flat(f, f * 2.0))
        })
    }

    fn make_scene(actions: Vec<Action>) -> Scene {
        Scene {
            actions,
            ..Default::default()
        }
    }

    fn animated(name: &str, anim: AnimationData) -> Object {
        let mut obj = Object::new(name, ObjectData::Empty);
        obj.animation = Some(anim);
        obj
    }

    #[test]
    fn test_location_keys_become_one_position_group() {
        let mut action = Action::new("Move", [1.0, 20.0]);
        for axis in 0..3 {
            action.fcurves.push(curve("location", axis, &[1.0, 20.0]));
        }
        let scene = make_scene(vec![action]);
        let obj = animated("Cube", AnimationData::with_action("Move"));

        let tracks = extract_tracks(&obj, &scene).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Move");
        assert!(!tracks[0].skeletal);

        let strip = &tracks[0].strips[0];
        assert_eq!(strip.range, [1.0, 20.0]);
        let graphs: Vec<(GraphCode, usize)> =
            strip.object.graphs().map(|(c, k)| (c, k.len())).collect();
        assert_eq!(
            graphs,
            vec![(GraphCode::LocX, 2), (GraphCode::LocY, 2), (GraphCode::LocZ, 2)]
        );

        let key = strip.object.graphs().next().unwrap().1[1];
        assert_eq!(key.to_floats(), [19.0, 40.0, 20.0, 40.0, 21.0, 40.0]);
    }

    #[test]
    fn test_mismatched_axes_fail() {
        let mut action = Action::new("Broken", [0.0, 10.0]);
        action.fcurves.push(curve("location", 0, &[0.0, 10.0]));
        action.fcurves.push(curve("location", 1, &[0.0]));
        let scene = make_scene(vec![action]);
        let obj = animated("Cube", AnimationData::with_action("Broken"));

        let err = extract_tracks(&obj, &scene).unwrap_err();
        assert!(err.is_consistency_violation());
    }

    #[test]
    fn test_bone_channels_mark_track_skeletal() {
        let mut action = Action::new("Wave", [0.0, 30.0]);
        for axis in 0..4 {
            action
                .fcurves
                .push(curve("pose.bones[\"Hand\"].rotation_quaternion", axis, &[0.0, 15.0, 30.0]));
        }
        action.fcurves.push(curve("pose.bones[\"Arm\"].scale", 1, &[0.0]));
        let scene = make_scene(vec![action]);
        let obj = animated("Rig", AnimationData::with_action("Wave"));

        let tracks = extract_tracks(&obj, &scene).unwrap();
        assert!(tracks[0].skeletal);

        let strip = &tracks[0].strips[0];
        assert!(strip.object.is_empty());
        let names: Vec<&str> = strip.bones.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Hand", "Arm"]);
        assert_eq!(strip.bone("Hand").unwrap().graph_count(), 4);
    }

    #[test]
    fn test_nla_tracks_follow_active_action() {
        let mut idle = Action::new("Idle", [1.0, 10.0]);
        idle.fcurves.push(curve("scale", 0, &[1.0]));
        let mut jump = Action::new("Jump", [5.0, 8.0]);
        jump.fcurves.push(curve("rotation_euler", 2, &[5.0, 8.0]));
        let scene = make_scene(vec![idle, jump]);

        let anim = AnimationData {
            action: Some("Idle".into()),
            nla_tracks: vec![NlaTrack {
                name: "Moves".into(),
                strips: vec![
                    NlaStrip { name: "a".into(), action: "Jump".into() },
                    NlaStrip { name: "b".into(), action: "Idle".into() },
                ],
            }],
        };
        let tracks = extract_tracks(&animated("Ball", anim), &scene).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].name, "Moves");
        assert_eq!(tracks[1].strips.len(), 2);
        assert_eq!(tracks[1].strips[0].range, [5.0, 8.0]);
        assert_eq!(tracks[1].strips[1].range, [1.0, 10.0]);
    }

    #[test]
    fn test_missing_nla_action() {
        let scene = make_scene(Vec::new());
        let anim = AnimationData {
            action: None,
            nla_tracks: vec![NlaTrack {
                name: "T".into(),
                strips: vec![NlaStrip { name: "s".into(), action: "Gone".into() }],
            }],
        };
        let err = extract_tracks(&animated("Ball", anim), &scene).unwrap_err();
        assert!(err.is_reference_not_found());
    }

    #[test]
    fn test_unknown_channels() {
        let mut action = Action::new("Mixed", [0.0, 1.0]);
        action.fcurves.push(curve("hide_viewport", 0, &[0.0]));
        action.fcurves.push(curve("location", 2, &[0.0]));
        let scene = make_scene(vec![action]);
        let obj = animated("Cube", AnimationData::with_action("Mixed"));

        let tracks = Flattener::default().extract_tracks(&obj, &scene).unwrap();
        assert_eq!(tracks[0].strips[0].object.graph_count(), 1);

        let err = Flattener::strict().extract_tracks(&obj, &scene).unwrap_err();
        assert!(err.is_unsupported_type());
    }

    #[test]
    fn test_out_of_range_index() {
        let mut action = Action::new("Bad", [0.0, 1.0]);
        action.fcurves.push(curve("scale", 3, &[0.0]));
        let scene = make_scene(vec![action]);
        let obj = animated("Cube", AnimationData::with_action("Bad"));

        assert!(extract_tracks(&obj, &scene).unwrap_err().is_consistency_violation());
    }

    #[test]
    fn test_no_animation() {
        let obj = Object::new("Still", ObjectData::Empty);
        assert!(extract_tracks(&obj, &Scene::default()).unwrap().is_empty());
    }
}
