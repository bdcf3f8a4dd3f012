// Navigation menu: scene shortcuts outside of marker clicks.
// Selections go through the navigator like any other request.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TourError;
use crate::navigator::Navigator;
use crate::registry::SceneRegistry;
use crate::types::*;
use crate::viewer::{Timer, Viewer};

/// Menu item as rendered, with the highlight for the current scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub label: String,
    pub scene: SceneId,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NavigationMenu {
    items: Vec<MenuItem>,
}

impl NavigationMenu {
    /// Use the configured items, or one item per scene in tour order when none are configured.
    pub fn from_config(config: &TourConfig, registry: &SceneRegistry) -> Result<Self, TourError> {
        if config.menu.is_empty() {
            let items = registry
                .tour_order()
                .into_iter()
                .map(|scene| MenuItem {
                    id: scene.id.to_string(),
                    label: scene.display_label().to_string(),
                    scene: scene.id.clone(),
                })
                .collect();
            return Ok(NavigationMenu { items });
        }

        let mut seen = HashSet::new();
        for item in &config.menu {
            if !seen.insert(item.id.as_str()) {
                return Err(TourError::InvalidMenuItem {
                    item: item.id.clone(),
                    message: "declared twice".to_string(),
                });
            }
            if !registry.contains(item.scene.as_str()) {
                return Err(TourError::InvalidMenuItem {
                    item: item.id.clone(),
                    message: format!("unknown scene {}", item.scene),
                });
            }
        }

        Ok(NavigationMenu {
            items: config.menu.clone(),
        })
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn entries(&self, current: &SceneId) -> Vec<MenuEntry> {
        self.items
            .iter()
            .map(|item| MenuEntry {
                id: item.id.clone(),
                label: item.label.clone(),
                scene: item.scene.clone(),
                active: &item.scene == current,
            })
            .collect()
    }

    pub fn scene_for(&self, item_id: &str) -> Option<&SceneId> {
        self.items
            .iter()
            .find(|item| item.id == item_id)
            .map(|item| &item.scene)
    }

    /// Navigate to the item's scene. Unknown items are ignored.
    pub async fn select<V: Viewer, T: Timer>(
        &self,
        navigator: &Navigator<V, T>,
        item_id: &str,
    ) -> Option<TransitionOutcome> {
        let Some(scene) = self.scene_for(item_id) else {
            log::debug!("Ignoring unknown menu item {}", item_id);
            return None;
        };
        Some(navigator.switch_to_scene(scene.as_str()).await)
    }
}
