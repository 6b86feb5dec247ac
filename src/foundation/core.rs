pub use kurbo::{Point, Rect, Vec2};

/// Identifier of a scene, unique within the hosting application.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SceneId(pub u64);

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scene:{}", self.0)
    }
}

/// Identifier of a node (item or folder), unique within its scene.
///
/// Ids are allocated from a per-scene monotonic counter and are never reused
/// within a session, so a stale id can be detected rather than silently
/// resolving to an unrelated node.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Handle to a renderable source owned by the render collaborator.
///
/// The graph never dereferences `id`; `size` is the source's natural pixel
/// size and is the one renderer-owned datum the graph needs for placement
/// and bounding-box math.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceRef {
    pub id: u64,
    pub size: Vec2,
}

impl SourceRef {
    pub fn new(id: u64, width: f64, height: f64) -> Self {
        Self {
            id,
            size: Vec2::new(width, height),
        }
    }
}

/// Per-edge crop in source pixels, applied before scaling.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Crop {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Crop {
    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }
}

/// 2D placement of an item: position, per-axis scale, rotation and crop.
///
/// `rotation_deg` is kept normalized to `[0, 360)`; use [`Transform::set_rotation`]
/// or [`Transform::rotate_by`] rather than writing the field when wrapping
/// matters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform {
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation_deg: f64,
    pub crop: Crop,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            rotation_deg: 0.0,
            crop: Crop::default(),
        }
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let r = deg % 360.0;
    if r < 0.0 { r + 360.0 } else { r }
}

impl Transform {
    /// Set rotation, wrapping into `[0, 360)`.
    pub fn set_rotation(&mut self, deg: f64) {
        self.rotation_deg = normalize_degrees(deg);
    }

    /// Add to rotation, wrapping into `[0, 360)`.
    pub fn rotate_by(&mut self, deg: f64) {
        self.rotation_deg = normalize_degrees(self.rotation_deg + deg);
    }

    /// Source size after crop, before scaling.
    pub fn cropped_size(&self, source_size: Vec2) -> Vec2 {
        Vec2::new(
            (source_size.x - self.crop.left - self.crop.right).max(0.0),
            (source_size.y - self.crop.top - self.crop.bottom).max(0.0),
        )
    }

    /// Axis-aligned placement rect: `position` is the top-left corner, extent
    /// is the cropped size times `|scale|`.
    ///
    /// Rotation does not participate; bounds are used for selection box math
    /// and flips, which operate on the unrotated placement.
    pub fn bounds(&self, source_size: Vec2) -> Rect {
        let sz = self.cropped_size(source_size);
        let w = sz.x * self.scale.x.abs();
        let h = sz.y * self.scale.y.abs();
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + w,
            self.position.y + h,
        )
    }
}
