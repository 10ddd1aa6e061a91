//! bXporter Scene Model
//!
//! An in-memory snapshot of a host scene, as handed over by the application
//! that owns it. Objects reference their datablocks by name; the [`Scene`]
//! libraries resolve those names. Everything here is plain data that
//! deserializes from JSON with `serde`.
//!
//! # Example
//!
//! ```no_run
//! use bxporter_scene::Scene;
//!
//! let scene = Scene::from_path("scene.json")?;
//! for object in &scene.objects {
//!     println!("{} -> {:?}", object.name, object.data);
//! }
//! # Ok::<(), bxporter_core::Error>(())
//! ```

pub mod action;
pub mod armature;
pub mod curve;
pub mod lamp;
pub mod material;
pub mod mesh;
pub mod object;
pub mod scene;

pub use action::{Action, FCurve, KeyframePoint};
pub use armature::{Armature, Bone};
pub use curve::{BezierPoint, Curve, Spline};
pub use lamp::{Camera, Lamp};
pub use material::{
    Image, Material, SlotInfluence, TexCoords, Texture, TextureSlot, TextureType,
    TransparencyMethod,
};
pub use mesh::{ColorLayer, Mesh, Polygon, UvLayer, Vertex, VertexWeight};
pub use object::{AnimationData, NlaStrip, NlaTrack, Object, ObjectData, Transform};
pub use scene::Scene;

/// Anything addressed by a unique name within its library
pub trait Named {
    /// The datablock name
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

impl_named!(Object, Mesh, Material, Texture, Lamp, Camera, Curve, Armature, Bone, Action);
