// Navigator: owns the current scene and runs the transition protocol against the viewer.
// Order per transition: stop rotation, load panorama, clear markers, render markers,
// move camera, commit scene, resume rotation. Clearing never precedes the new image.
// At most one transition runs at a time; later requests wait in a single slot (latest wins).

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{self, Either};

use crate::error::TourError;
use crate::registry::SceneRegistry;
use crate::types::*;
use crate::viewer::{Timer, Viewer};

/// Mutable runtime state of the navigator.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState {
    pub current_scene_id: SceneId,
    pub transition_in_flight: bool,
    /// The current scene's panorama and markers are on screen.
    pub displayed: bool,
    /// Request that arrived during the in-flight transition.
    pub pending: Option<SceneId>,
}

/// Releases the transition slot, also when the transition future is dropped mid-load.
struct TransitionGuard<'a> {
    state: &'a RefCell<NavigationState>,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.transition_in_flight = false;
            state.pending = None;
        }
    }
}

/// Stateful controller mediating every scene change.
pub struct Navigator<V, T> {
    registry: Rc<SceneRegistry>,
    viewer: V,
    timer: T,
    settings: TransitionSettings,
    state: RefCell<NavigationState>,
}

impl<V: Viewer, T: Timer> Navigator<V, T> {
    /// Starts at the registry's entry scene. Nothing is shown until `initialize`.
    pub fn new(registry: Rc<SceneRegistry>, viewer: V, timer: T, settings: TransitionSettings) -> Self {
        let state = NavigationState {
            current_scene_id: registry.entry_scene().clone(),
            transition_in_flight: false,
            displayed: false,
            pending: None,
        };

        Navigator {
            registry,
            viewer,
            timer,
            settings,
            state: RefCell::new(state),
        }
    }

    /// Show the entry scene and start auto-rotation.
    ///
    /// An unknown entry id is a configuration error. A failed load is returned as
    /// well, but the navigator stays usable on the entry scene.
    pub async fn initialize(&self, entry_id: &str) -> Result<(), TourError> {
        let scene = self.registry.get_scene(entry_id)?;

        {
            let mut state = self.state.borrow_mut();
            if state.transition_in_flight {
                return Err(TourError::TransitionInFlight(scene.id.to_string()));
            }
            state.transition_in_flight = true;
            state.current_scene_id = scene.id.clone();
            state.displayed = false;
        }
        let guard = TransitionGuard { state: &self.state };

        let loaded = self.load_panorama(&scene.panorama).await;
        match &loaded {
            Ok(()) => {
                self.show_scene(scene);
                log::info!("Tour started at scene {}", scene.id);
            }
            Err(err) => log::warn!("Entry scene {} could not be shown: {}", scene.id, err),
        }
        self.viewer.start_auto_rotate();

        self.run_pending().await;
        drop(guard);
        loaded
    }

    /// Navigate to `target_id`. Never fails: problems are reported in the outcome.
    pub async fn switch_to_scene(&self, target_id: &str) -> TransitionOutcome {
        let Some(scene) = self.registry.scene(target_id) else {
            log::warn!("Ignoring navigation to unknown scene {}", target_id);
            return TransitionOutcome::UnknownScene {
                scene: target_id.to_string(),
            };
        };

        {
            let mut state = self.state.borrow_mut();
            if state.transition_in_flight {
                log::debug!("Transition in flight, queueing scene {}", scene.id);
                state.pending = Some(scene.id.clone());
                return TransitionOutcome::Queued {
                    scene: scene.id.clone(),
                };
            }
            if state.displayed && state.current_scene_id == scene.id {
                return TransitionOutcome::Unchanged {
                    scene: scene.id.clone(),
                };
            }
            state.transition_in_flight = true;
        }
        let guard = TransitionGuard { state: &self.state };

        let outcome = self.transition(scene).await;
        self.run_pending().await;
        drop(guard);
        outcome
    }

    pub fn current_scene_id(&self) -> SceneId {
        self.state.borrow().current_scene_id.clone()
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.borrow().transition_in_flight
    }

    /// Snapshot of the runtime state.
    pub fn state(&self) -> NavigationState {
        self.state.borrow().clone()
    }

    pub fn registry(&self) -> &Rc<SceneRegistry> {
        &self.registry
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    /// Apply requests queued while the slot was held. Caller holds the slot.
    async fn run_pending(&self) {
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                match state.pending.take() {
                    Some(next) if !state.displayed || next != state.current_scene_id => next,
                    _ => break,
                }
            };

            if let Some(scene) = self.registry.scene(next.as_str()) {
                let outcome = self.transition(scene).await;
                log::debug!("Queued navigation finished: {:?}", outcome);
            }
        }
    }

    async fn transition(&self, scene: &Scene) -> TransitionOutcome {
        let from = self.current_scene_id();
        self.viewer.stop_auto_rotate();

        let outcome = match self.load_panorama(&scene.panorama).await {
            Ok(()) => {
                self.show_scene(scene);
                self.state.borrow_mut().current_scene_id = scene.id.clone();
                log::info!("Entered scene {} from {}", scene.id, from);
                TransitionOutcome::Completed {
                    from,
                    to: scene.id.clone(),
                }
            }
            Err(err) => {
                log::warn!("Staying on scene {}: {}", from, err);
                let was_displayed = self.state.borrow().displayed;
                if matches!(err, TourError::LoadTimeout { .. }) && self.settings.restore_on_timeout && was_displayed {
                    self.restore_panorama(&from).await;
                }
                TransitionOutcome::Failed {
                    scene: scene.id.clone(),
                    reason: err.to_string(),
                }
            }
        };

        self.viewer.start_auto_rotate();
        outcome
    }

    /// Replace the rendered hotspots and aim the camera.
    fn show_scene(&self, scene: &Scene) {
        self.state.borrow_mut().displayed = true;
        self.viewer.clear_markers();
        for marker in &scene.markers {
            self.viewer.add_marker(&MarkerSpec::from(marker));
        }
        if let Some(position) = &scene.start_position {
            self.viewer.animate(position);
        }
    }

    /// Race the viewer's load against the configured timeout.
    async fn load_panorama(&self, panorama: &str) -> Result<(), TourError> {
        let load = self.viewer.set_panorama(panorama);
        let expired = self.timer.sleep(self.settings.load_timeout());

        match future::select(load, expired).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(TourError::LoadTimeout {
                panorama: panorama.to_string(),
                timeout_ms: self.settings.load_timeout_ms,
            }),
        }
    }

    /// Put the previous image back so a late load cannot replace the visible scene.
    async fn restore_panorama(&self, scene_id: &SceneId) {
        let Some(previous) = self.registry.scene(scene_id.as_str()) else {
            return;
        };
        if let Err(err) = self.load_panorama(&previous.panorama).await {
            log::error!("Could not restore panorama of scene {}: {}", scene_id, err);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;
    use proptest::prelude::*;

    fn started(viewer: RecordingViewer) -> Navigator<RecordingViewer, ManualTimer> {
        let navigator = office_navigator(viewer, ManualTimer::never());
        block_on(navigator.initialize("ENTRY")).expect("entry loads");
        navigator.viewer().take_calls();
        navigator
    }

    fn expected_markers<V: Viewer, T: Timer>(navigator: &Navigator<V, T>) -> Vec<String> {
        navigator
            .registry()
            .get_scene(navigator.current_scene_id().as_str())
            .unwrap()
            .markers
            .iter()
            .map(|marker| marker.id.to_string())
            .collect()
    }

    // =========================================================================
    // Property-Based Tests
    // =========================================================================

    const SCENE_IDS: [&str; 10] = [
        "ENTRY",
        "ROOM1",
        "ADMIN-BLOCK",
        "WORKSPACE",
        "NEW-OFFICE",
        "NEW-OFFICE-INSIDE",
        "STUDIO-OUTSIDE",
        "STUDIO",
        "LOBBY",
        "",
    ];

    proptest! {
        /// After every request the rendered markers are exactly the current scene's.
        #[test]
        fn rendered_markers_follow_current_scene(picks in prop::collection::vec(0..SCENE_IDS.len(), 1..20)) {
            let navigator = started(RecordingViewer::new());
            for pick in picks {
                block_on(navigator.switch_to_scene(SCENE_IDS[pick]));
                prop_assert!(!navigator.is_transitioning());
                prop_assert_eq!(navigator.viewer().marker_ids(), expected_markers(&navigator));
                prop_assert!(navigator.viewer().rotating.get());
            }
        }

        /// Two overlapping requests end on one scene with only that scene's markers.
        #[test]
        fn overlapping_requests_never_mix_scenes(first in 0..8usize, second in 0..8usize) {
            let navigator = started(RecordingViewer::new().yielding());
            let (_, _) = block_on(async {
                futures::join!(
                    navigator.switch_to_scene(SCENE_IDS[first]),
                    navigator.switch_to_scene(SCENE_IDS[second])
                )
            });

            prop_assert!(!navigator.is_transitioning());
            let current = navigator.current_scene_id();
            prop_assert_eq!(current.as_str(), SCENE_IDS[second]);
            prop_assert_eq!(navigator.viewer().marker_ids(), expected_markers(&navigator));
        }
    }

    // =========================================================================
    // Unit Tests
    // =========================================================================

    #[test]
    fn initialize_shows_entry_scene() {
        let navigator = office_navigator(RecordingViewer::new(), ManualTimer::never());
        block_on(navigator.initialize("ENTRY")).unwrap();

        assert_eq!(navigator.current_scene_id().as_str(), "ENTRY");
        assert_eq!(
            navigator.viewer().marker_ids(),
            vec!["TO-ROOM1", "TO-STUDIO-OUTSIDE", "TO-NEW-OFFICE"]
        );
        assert_eq!(
            navigator.viewer().panorama.borrow().as_deref(),
            Some("/office-15.jpg")
        );
        assert!(navigator.viewer().rotating.get());
        assert!(!navigator.is_transitioning());
    }

    #[test]
    fn initialize_rejects_unknown_entry() {
        let navigator = office_navigator(RecordingViewer::new(), ManualTimer::never());
        let result = block_on(navigator.initialize("LOBBY"));

        assert_eq!(result, Err(TourError::SceneNotFound("LOBBY".to_string())));
        assert!(navigator.viewer().calls.borrow().is_empty());
    }

    #[test]
    fn initialize_reports_load_failure_and_keeps_rotating() {
        let viewer = RecordingViewer::new().failing("/office-15.jpg");
        let navigator = office_navigator(viewer, ManualTimer::never());
        let result = block_on(navigator.initialize("ENTRY"));

        assert!(matches!(result, Err(TourError::PanoramaLoad { .. })));
        assert_eq!(navigator.current_scene_id().as_str(), "ENTRY");
        assert!(navigator.viewer().markers.borrow().is_empty());
        assert!(navigator.viewer().rotating.get());
        assert!(!navigator.is_transitioning());
    }

    #[test]
    fn transition_runs_steps_in_order() {
        let navigator = started(RecordingViewer::new());
        let outcome = block_on(navigator.switch_to_scene("ROOM1"));

        assert_eq!(
            outcome,
            TransitionOutcome::Completed {
                from: SceneId::new("ENTRY"),
                to: SceneId::new("ROOM1"),
            }
        );
        assert_eq!(
            navigator.viewer().take_calls(),
            vec![
                ViewerCall::StopAutoRotate,
                ViewerCall::SetPanorama("/office-10.jpg".to_string()),
                ViewerCall::ClearMarkers,
                ViewerCall::AddMarker("TO-ADMIN-BLOCK".to_string()),
                ViewerCall::AddMarker("ROOM1-BACK".to_string()),
                ViewerCall::Animate(SphericalPosition::new(0.4, 0.0)),
                ViewerCall::StartAutoRotate,
            ]
        );
    }

    #[test]
    fn scene_without_start_position_skips_camera() {
        let navigator = started(RecordingViewer::new());
        block_on(navigator.switch_to_scene("STUDIO-OUTSIDE"));

        let calls = navigator.viewer().take_calls();
        assert!(!calls.iter().any(|call| matches!(call, ViewerCall::Animate(_))));
    }

    #[test]
    fn unknown_target_is_ignored() {
        let navigator = started(RecordingViewer::new());
        let outcome = block_on(navigator.switch_to_scene("LOBBY"));

        assert_eq!(
            outcome,
            TransitionOutcome::UnknownScene {
                scene: "LOBBY".to_string()
            }
        );
        assert!(navigator.viewer().take_calls().is_empty());
        assert_eq!(navigator.current_scene_id().as_str(), "ENTRY");
    }

    #[test]
    fn current_scene_is_unchanged() {
        let navigator = started(RecordingViewer::new());
        let outcome = block_on(navigator.switch_to_scene("ENTRY"));

        assert_eq!(
            outcome,
            TransitionOutcome::Unchanged {
                scene: SceneId::new("ENTRY")
            }
        );
        assert!(navigator.viewer().take_calls().is_empty());
        assert_eq!(navigator.viewer().marker_ids().len(), 3);
    }

    #[test]
    fn load_failure_keeps_previous_scene() {
        let navigator = started(RecordingViewer::new().failing("/office-10.jpg"));
        let outcome = block_on(navigator.switch_to_scene("ROOM1"));

        assert!(matches!(outcome, TransitionOutcome::Failed { .. }));
        assert_eq!(navigator.current_scene_id().as_str(), "ENTRY");
        assert_eq!(
            navigator.viewer().marker_ids(),
            vec!["TO-ROOM1", "TO-STUDIO-OUTSIDE", "TO-NEW-OFFICE"]
        );
        assert_eq!(
            navigator.viewer().take_calls(),
            vec![
                ViewerCall::StopAutoRotate,
                ViewerCall::SetPanorama("/office-10.jpg".to_string()),
                ViewerCall::StartAutoRotate,
            ]
        );
        assert!(!navigator.is_transitioning());
    }

    #[test]
    fn timeout_restores_previous_panorama() {
        let navigator = office_navigator(
            RecordingViewer::new().stalled("/office-10.jpg"),
            ManualTimer::immediate(),
        );
        block_on(navigator.initialize("ENTRY")).unwrap();
        navigator.viewer().take_calls();

        let outcome = block_on(navigator.switch_to_scene("ROOM1"));

        match outcome {
            TransitionOutcome::Failed { scene, reason } => {
                assert_eq!(scene.as_str(), "ROOM1");
                assert!(reason.contains("did not load"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            navigator.viewer().panorama_requests(),
            vec!["/office-10.jpg", "/office-15.jpg"]
        );
        assert_eq!(navigator.current_scene_id().as_str(), "ENTRY");
        assert!(navigator.viewer().rotating.get());
        assert!(!navigator.is_transitioning());
    }

    #[test]
    fn overlapping_request_is_queued_and_applied() {
        let navigator = started(RecordingViewer::new().yielding());
        let (first, second) = block_on(async {
            futures::join!(
                navigator.switch_to_scene("ROOM1"),
                navigator.switch_to_scene("STUDIO-OUTSIDE")
            )
        });

        assert!(matches!(first, TransitionOutcome::Completed { .. }));
        assert_eq!(
            second,
            TransitionOutcome::Queued {
                scene: SceneId::new("STUDIO-OUTSIDE")
            }
        );
        assert_eq!(navigator.current_scene_id().as_str(), "STUDIO-OUTSIDE");
        assert_eq!(
            navigator.viewer().marker_ids(),
            vec!["TO-STUDIO", "STUDIO-OUTSIDE-BACK"]
        );
        assert_eq!(
            navigator.viewer().panorama_requests(),
            vec!["/office-10.jpg", "/office-1.jpg"]
        );
    }

    #[test]
    fn latest_queued_request_wins() {
        let navigator = started(RecordingViewer::new().yielding());
        block_on(async {
            futures::join!(
                navigator.switch_to_scene("ROOM1"),
                navigator.switch_to_scene("STUDIO-OUTSIDE"),
                navigator.switch_to_scene("NEW-OFFICE")
            )
        });

        assert_eq!(navigator.current_scene_id().as_str(), "NEW-OFFICE");
        assert_eq!(
            navigator.viewer().panorama_requests(),
            vec!["/office-10.jpg", "/office-3.jpg"]
        );
    }

    #[test]
    fn queued_request_for_reached_scene_is_dropped() {
        let navigator = started(RecordingViewer::new().yielding());
        block_on(async {
            futures::join!(
                navigator.switch_to_scene("ROOM1"),
                navigator.switch_to_scene("ROOM1")
            )
        });

        assert_eq!(navigator.viewer().panorama_requests(), vec!["/office-10.jpg"]);
        assert_eq!(navigator.viewer().marker_ids(), vec!["TO-ADMIN-BLOCK", "ROOM1-BACK"]);
    }

    #[test]
    fn failed_entry_can_be_retried() {
        let navigator = office_navigator(
            RecordingViewer::new().failing("/office-15.jpg"),
            ManualTimer::never(),
        );
        assert!(block_on(navigator.initialize("ENTRY")).is_err());
        assert!(!navigator.state().displayed);

        let outcome = block_on(navigator.switch_to_scene("ENTRY"));
        assert!(matches!(outcome, TransitionOutcome::Failed { .. }));
        assert_eq!(
            navigator.viewer().panorama_requests(),
            vec!["/office-15.jpg", "/office-15.jpg"]
        );
    }

    #[test]
    fn blank_entry_is_replaced_by_next_scene() {
        let navigator = office_navigator(
            RecordingViewer::new().failing("/office-15.jpg"),
            ManualTimer::never(),
        );
        assert!(block_on(navigator.initialize("ENTRY")).is_err());

        block_on(navigator.switch_to_scene("ROOM1"));
        assert_eq!(navigator.current_scene_id().as_str(), "ROOM1");
        assert!(navigator.state().displayed);

        let outcome = block_on(navigator.switch_to_scene("ROOM1"));
        assert!(matches!(outcome, TransitionOutcome::Unchanged { .. }));
    }

    #[test]
    fn queued_request_runs_after_failed_load() {
        let navigator = started(RecordingViewer::new().yielding().failing("/office-10.jpg"));
        let (first, second) = block_on(async {
            futures::join!(
                navigator.switch_to_scene("ROOM1"),
                navigator.switch_to_scene("STUDIO-OUTSIDE")
            )
        });

        assert!(matches!(first, TransitionOutcome::Failed { .. }));
        assert!(matches!(second, TransitionOutcome::Queued { .. }));
        assert_eq!(navigator.current_scene_id().as_str(), "STUDIO-OUTSIDE");
        assert_eq!(
            navigator.viewer().marker_ids(),
            vec!["TO-STUDIO", "STUDIO-OUTSIDE-BACK"]
        );
        assert!(navigator.viewer().rotating.get());
        assert!(!navigator.is_transitioning());
    }

    #[test]
    fn dropped_transition_releases_slot() {
        let navigator = started(RecordingViewer::new().stalled("/office-10.jpg"));
        assert!(navigator.switch_to_scene("ROOM1").now_or_never().is_none());

        assert!(!navigator.is_transitioning());
        assert_eq!(navigator.current_scene_id().as_str(), "ENTRY");
        assert_eq!(navigator.state().pending, None);
    }

    #[test]
    fn initialize_waits_for_free_slot() {
        let navigator = office_navigator(
            RecordingViewer::new().yielding(),
            ManualTimer::never(),
        );
        let (first, second) = block_on(async {
            futures::join!(navigator.initialize("ENTRY"), navigator.initialize("ROOM1"))
        });

        assert!(first.is_ok());
        assert_eq!(
            second,
            Err(TourError::TransitionInFlight("ROOM1".to_string()))
        );
        assert_eq!(navigator.current_scene_id().as_str(), "ENTRY");
    }
}
