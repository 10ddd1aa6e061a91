//! F-curve data path parsing

const BONE_PREFIX: &str = "pose.bones[\"";
const BONE_SUFFIX: &str = "\"].";

/// A parsed F-curve data path
///
/// `location` parses to an object-level path; `pose.bones["Arm"].location`
/// parses to the same property scoped to bone `Arm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPath<'a> {
    /// Bone the curve is scoped to
    pub bone: Option<&'a str>,
    /// Property name without the bone prefix
    pub property: &'a str,
}

impl<'a> ChannelPath<'a> {
    /// Split a data path into bone and property
    ///
    /// Returns `None` for a bone-scoped path that is not terminated properly.
    pub fn parse(path: &'a str) -> Option<Self> {
        match path.strip_prefix(BONE_PREFIX) {
            Some(rest) => {
                // Last match, bone names may contain quotes
                let split = rest.rfind(BONE_SUFFIX)?;
                let bone = &rest[..split];
                let property = &rest[split + BONE_SUFFIX.len()..];
                if bone.is_empty() || property.is_empty() {
                    return None;
                }
                Some(Self {
                    bone: Some(bone),
                    property,
                })
            }
            None => Some(Self {
                bone: None,
                property: path,
            }),
        }
    }

    pub fn is_bone(&self) -> bool {
        self.bone.is_some()
    }
}
