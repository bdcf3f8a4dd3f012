// Marker dispatch: turns a "marker selected" event from the viewer into a navigation request.
// The host translates the renderer's event object into a plain marker id before calling in.

use std::rc::Rc;

use crate::navigator::Navigator;
use crate::registry::SceneRegistry;
use crate::types::*;
use crate::viewer::{Timer, Viewer};

pub struct MarkerDispatch<V, T> {
    registry: Rc<SceneRegistry>,
    navigator: Rc<Navigator<V, T>>,
}

impl<V: Viewer, T: Timer> MarkerDispatch<V, T> {
    pub fn new(navigator: Rc<Navigator<V, T>>) -> Self {
        MarkerDispatch {
            registry: Rc::clone(navigator.registry()),
            navigator,
        }
    }

    /// Target scene of a marker, searched across all scenes.
    pub fn resolve_target(&self, marker_id: &str) -> Option<&SceneId> {
        self.registry
            .find_marker(marker_id)
            .map(|(marker, _)| &marker.target)
            .filter(|target| !target.as_str().is_empty())
    }

    /// Navigate to the selected marker's target.
    ///
    /// Returns `None` for ids that belong to no marker; those come from other UI
    /// sharing the event channel and are ignored.
    pub async fn on_marker_selected(&self, marker_id: &str) -> Option<TransitionOutcome> {
        let Some(target) = self.resolve_target(marker_id) else {
            log::debug!("Ignoring selection of unknown marker {}", marker_id);
            return None;
        };

        let outcome = self.navigator.switch_to_scene(target.as_str()).await;
        if let TransitionOutcome::UnknownScene { scene } = &outcome {
            log::warn!("Marker {} points at missing scene {}", marker_id, scene);
        }
        Some(outcome)
    }
}
