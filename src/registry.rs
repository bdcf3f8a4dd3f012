// Scene registry: the static scene graph, validated once and read-only afterwards.
// Closed graph: every marker target resolves. Marker ids are unique across all scenes.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::TourError;
use crate::types::*;

const OFFICE_TOUR_JSON: &str = include_str!("../assets/office_tour.json");

impl TourConfig {
    /// The office tour shipped with the viewer.
    pub fn office_tour() -> Result<TourConfig, TourError> {
        TourConfig::from_json(OFFICE_TOUR_JSON)
    }
}

/// Immutable mapping from scene id to panorama and hotspots.
#[derive(Debug, Clone)]
pub struct SceneRegistry {
    entry_scene: SceneId,
    scenes: BTreeMap<SceneId, Scene>,
    marker_index: HashMap<MarkerId, SceneId>,
}

impl SceneRegistry {
    /// Build and validate the registry from configuration.
    pub fn from_config(config: &TourConfig) -> Result<Self, TourError> {
        if config.scenes.is_empty() {
            return Err(TourError::EmptyRegistry);
        }

        let mut scenes = BTreeMap::new();
        let mut marker_index: HashMap<MarkerId, SceneId> = HashMap::new();

        for (id, scene_config) in &config.scenes {
            if scene_config.panorama.trim().is_empty() {
                return Err(TourError::InvalidConfig(format!(
                    "scene {} has no panorama",
                    id
                )));
            }

            if let Some(start) = &scene_config.start_position {
                if !start.is_valid() {
                    return Err(TourError::InvalidConfig(format!(
                        "scene {} has an invalid start position",
                        id
                    )));
                }
            }

            for marker in &scene_config.markers {
                Self::validate_marker(config, id, marker)?;

                if let Some(first_scene) = marker_index.insert(marker.id.clone(), id.clone()) {
                    return Err(TourError::DuplicateMarkerId {
                        marker: marker.id.to_string(),
                        first_scene: first_scene.to_string(),
                        second_scene: id.to_string(),
                    });
                }
            }

            scenes.insert(
                id.clone(),
                Scene {
                    id: id.clone(),
                    label: scene_config.label.clone(),
                    panorama: scene_config.panorama.clone(),
                    markers: scene_config.markers.clone(),
                    start_position: scene_config.start_position,
                },
            );
        }

        if !scenes.contains_key(&config.entry_scene) {
            return Err(TourError::SceneNotFound(config.entry_scene.to_string()));
        }

        Ok(SceneRegistry {
            entry_scene: config.entry_scene.clone(),
            scenes,
            marker_index,
        })
    }

    fn validate_marker(config: &TourConfig, scene: &SceneId, marker: &Marker) -> Result<(), TourError> {
        if marker.id.as_str().is_empty() {
            return Err(TourError::InvalidConfig(format!(
                "scene {} has a marker without id",
                scene
            )));
        }

        if !marker.position.is_valid() {
            return Err(TourError::InvalidPosition {
                marker: marker.id.to_string(),
                message: format!(
                    "yaw {} / pitch {} is outside the sphere",
                    marker.position.yaw, marker.position.pitch
                ),
            });
        }

        if marker.target.as_str().is_empty() || !config.scenes.contains_key(&marker.target) {
            return Err(TourError::DanglingTarget {
                scene: scene.to_string(),
                marker: marker.id.to_string(),
                target: marker.target.to_string(),
            });
        }

        Ok(())
    }

    pub fn entry_scene(&self) -> &SceneId {
        &self.entry_scene
    }

    /// Look up a scene, reporting a missing id as an error.
    pub fn get_scene(&self, id: &str) -> Result<&Scene, TourError> {
        self.scene(id)
            .ok_or_else(|| TourError::SceneNotFound(id.to_string()))
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.scenes.contains_key(id)
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    /// Scenes in walking order: breadth-first from the entry along marker order,
    /// followed by scenes no marker path reaches, by id.
    pub fn tour_order(&self) -> Vec<&Scene> {
        let mut order = Vec::with_capacity(self.scenes.len());
        let mut seen: HashSet<&SceneId> = HashSet::new();
        let mut queue = VecDeque::new();

        seen.insert(&self.entry_scene);
        queue.push_back(&self.entry_scene);
        while let Some(id) = queue.pop_front() {
            let Some(scene) = self.scenes.get(id) else {
                continue;
            };
            order.push(scene);
            for marker in &scene.markers {
                if seen.insert(&marker.target) {
                    queue.push_back(&marker.target);
                }
            }
        }

        order.extend(self.scenes.values().filter(|scene| !seen.contains(&scene.id)));
        order
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// All markers of all scenes, paired with the scene that owns them.
    pub fn all_markers(&self) -> impl Iterator<Item = (&Marker, &SceneId)> {
        self.scenes
            .values()
            .flat_map(|scene| scene.markers.iter().map(move |marker| (marker, &scene.id)))
    }

    /// Resolve a marker id regardless of which scene is displayed.
    pub fn find_marker(&self, id: &str) -> Option<(&Marker, &SceneId)> {
        let owner = self.marker_index.get(id)?;
        let scene = self.scenes.get(owner)?;
        scene
            .markers
            .iter()
            .find(|marker| marker.id.as_str() == id)
            .map(|marker| (marker, &scene.id))
    }
}
