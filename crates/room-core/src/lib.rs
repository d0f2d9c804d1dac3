pub mod assets;
pub mod camera;
pub mod color;
pub mod composer;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod glow;
pub mod gltf_import;
pub mod material;
pub mod modal;
pub mod panels;
pub mod picking;
pub mod reflection;
pub mod room;
pub mod scene;
pub mod spotify;
pub mod texture;
pub static SCENE_WGSL: &str = include_str!("../shaders/scene.wgsl");

pub use assets::{AssetRegistry, AssetSource, LoadOutcome, LoadProgress, Model};
pub use camera::{Camera, OrbitController};
pub use error::{AssetError, AuthError};
pub use room::RoomScene;
pub use scene::{NodeId, SceneGraph};
