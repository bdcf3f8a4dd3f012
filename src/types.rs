// Strong typing over strings. Newtypes for scene and marker ids, angular positions.
// Configuration structs mirror the JSON handed over from JS.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scene identifier. Newtype for type safety.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        SceneId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        SceneId::new(id)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marker identifier. Unique across the whole tour.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        MarkerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MarkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MarkerId {
    fn from(id: &str) -> Self {
        MarkerId::new(id)
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Angular coordinate on the panorama sphere, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SphericalPosition {
    pub yaw: f64,
    pub pitch: f64,
}

impl SphericalPosition {
    pub fn new(yaw: f64, pitch: f64) -> Self {
        SphericalPosition { yaw, pitch }
    }

    /// Yaw may wrap freely; pitch is limited to the poles.
    pub fn is_valid(&self) -> bool {
        self.yaw.is_finite()
            && self.pitch.is_finite()
            && (-std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2).contains(&self.pitch)
    }
}

/// One interactive hotspot within a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    /// Thumbnail used to draw the hotspot.
    pub image: String,
    pub tooltip: String,
    pub position: SphericalPosition,
    pub target: SceneId,
}

/// One navigable panoramic viewpoint, as held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub label: Option<String>,
    pub panorama: String,
    pub markers: Vec<Marker>,
    pub start_position: Option<SphericalPosition>,
}

impl Scene {
    /// Human-readable name, falling back to the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Scene entry of the tour configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub panorama: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    /// Camera position animated to after entering the scene.
    #[serde(default)]
    pub start_position: Option<SphericalPosition>,
}

/// Tour configuration passed from JS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourConfig {
    pub entry_scene: SceneId,
    pub scenes: BTreeMap<SceneId, SceneConfig>,
    /// Navigation menu entries. Empty means one entry per scene.
    #[serde(default)]
    pub menu: Vec<MenuItem>,
    #[serde(default)]
    pub viewer: ViewerSettings,
    #[serde(default)]
    pub transition: TransitionSettings,
}

impl TourConfig {
    pub fn from_json(json: &str) -> Result<TourConfig, crate::TourError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Renderer settings forwarded to the host when it builds the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerSettings {
    #[serde(default = "default_true")]
    pub auto_rotate: bool,
    /// Idle time before auto-rotation kicks in (milliseconds).
    #[serde(default = "default_auto_rotate_delay")]
    pub auto_rotate_delay_ms: u64,
    /// Positive rotates counter-clockwise.
    #[serde(default = "default_auto_rotate_speed")]
    pub auto_rotate_speed: f64,
    #[serde(default)]
    pub navbar: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        ViewerSettings {
            auto_rotate: true,
            auto_rotate_delay_ms: default_auto_rotate_delay(),
            auto_rotate_speed: default_auto_rotate_speed(),
            navbar: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_auto_rotate_delay() -> u64 {
    5_000 // 5s
}

fn default_auto_rotate_speed() -> f64 {
    0.1
}

/// Transition behavior settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSettings {
    /// Upper bound on a single panorama load (milliseconds).
    #[serde(default = "default_load_timeout")]
    pub load_timeout_ms: u64,
    /// Re-request the previous panorama after a timed-out load.
    #[serde(default = "default_true")]
    pub restore_on_timeout: bool,
}

impl TransitionSettings {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for TransitionSettings {
    fn default() -> Self {
        TransitionSettings {
            load_timeout_ms: default_load_timeout(),
            restore_on_timeout: true,
        }
    }
}

fn default_load_timeout() -> u64 {
    15_000 // 15s
}

/// Navigation menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    pub scene: SceneId,
}

/// Payload for `Viewer::add_marker`. The rendered hotspot, not the navigation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub id: MarkerId,
    pub position: SphericalPosition,
    pub tooltip: String,
    pub image: String,
}

impl From<&Marker> for MarkerSpec {
    fn from(marker: &Marker) -> Self {
        MarkerSpec {
            id: marker.id.clone(),
            position: marker.position,
            tooltip: marker.tooltip.clone(),
            image: marker.image.clone(),
        }
    }
}

/// Result of a navigation request. Failures are reported here, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The new scene is displayed with its markers.
    Completed { from: SceneId, to: SceneId },
    /// Already on the requested scene; nothing was touched.
    Unchanged { scene: SceneId },
    /// Another transition is in flight; this one runs after it.
    Queued { scene: SceneId },
    /// No such scene in the registry.
    UnknownScene { scene: String },
    /// Load failed or timed out; the previous scene is still shown.
    Failed { scene: SceneId, reason: String },
}
