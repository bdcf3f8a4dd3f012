// tour_core: scene navigation engine for the 360° office tour viewer.
// The renderer, chat widget and UI chrome live in JS; scene graph and transitions live here.

mod dispatch;
mod error;
mod logging;
mod menu;
mod navigator;
mod registry;
mod types;
mod viewer;
mod web;

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub use dispatch::MarkerDispatch;
pub use error::TourError;
pub use logging::ConsoleLog;
pub use menu::{MenuEntry, NavigationMenu};
pub use navigator::{NavigationState, Navigator};
pub use registry::SceneRegistry;
pub use types::*;
pub use viewer::{Timer, Viewer};
pub use web::{JsTimer, JsViewer, ViewerAdapter};

/// Initialize panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    logging::install(log::LevelFilter::Debug);
}

/// Navigator, dispatch and menu wired to one viewer.
struct Assembly<V, T> {
    navigator: Rc<Navigator<V, T>>,
    dispatch: Rc<MarkerDispatch<V, T>>,
    menu: Rc<NavigationMenu>,
}

fn assemble<V: Viewer, T: Timer>(config: &TourConfig, viewer: V, timer: T) -> Result<Assembly<V, T>, TourError> {
    let registry = Rc::new(SceneRegistry::from_config(config)?);
    let menu = NavigationMenu::from_config(config, &registry)?;
    let navigator = Rc::new(Navigator::new(
        registry,
        viewer,
        timer,
        config.transition.clone(),
    ));
    let dispatch = MarkerDispatch::new(Rc::clone(&navigator));

    Ok(Assembly {
        navigator,
        dispatch: Rc::new(dispatch),
        menu: Rc::new(menu),
    })
}

fn to_js(err: TourError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn outcome_to_js(outcome: Option<TransitionOutcome>) -> Result<JsValue, JsValue> {
    match outcome {
        Some(outcome) => serde_json::to_string(&outcome)
            .map(|json| JsValue::from_str(&json))
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e))),
        None => Ok(JsValue::NULL),
    }
}

/// Main tour interface exposed to JavaScript.
/// The only owner of the viewer adapter; every scene change goes through it.
#[wasm_bindgen]
pub struct Tour {
    config: TourConfig,
    navigator: Rc<Navigator<JsViewer, JsTimer>>,
    dispatch: Rc<MarkerDispatch<JsViewer, JsTimer>>,
    menu: Rc<NavigationMenu>,
}

#[wasm_bindgen]
impl Tour {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, adapter: ViewerAdapter) -> Result<Tour, JsValue> {
        let config = TourConfig::from_json(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        Tour::from_config(config, adapter).map_err(to_js)
    }

    /// Tour over the embedded office scenes.
    #[wasm_bindgen(js_name = withOfficeTour)]
    pub fn with_office_tour(adapter: ViewerAdapter) -> Result<Tour, JsValue> {
        let config = TourConfig::office_tour().map_err(to_js)?;
        Tour::from_config(config, adapter).map_err(to_js)
    }

    /// Show the entry scene. Rejects if it cannot be displayed.
    pub fn initialize(&self) -> js_sys::Promise {
        let navigator = Rc::clone(&self.navigator);
        let entry = self.config.entry_scene.clone();

        future_to_promise(async move {
            navigator
                .initialize(entry.as_str())
                .await
                .map(|()| JsValue::UNDEFINED)
                .map_err(to_js)
        })
    }

    /// Resolves with the transition outcome as JSON.
    #[wasm_bindgen(js_name = switchToScene)]
    pub fn switch_to_scene(&self, scene_id: String) -> js_sys::Promise {
        let navigator = Rc::clone(&self.navigator);

        future_to_promise(async move {
            let outcome = navigator.switch_to_scene(&scene_id).await;
            outcome_to_js(Some(outcome))
        })
    }

    /// Feed the renderer's marker selection. Resolves with `null` for unknown markers.
    #[wasm_bindgen(js_name = onMarkerSelected)]
    pub fn on_marker_selected(&self, marker_id: String) -> js_sys::Promise {
        let dispatch = Rc::clone(&self.dispatch);

        future_to_promise(async move { outcome_to_js(dispatch.on_marker_selected(&marker_id).await) })
    }

    #[wasm_bindgen(js_name = selectMenuItem)]
    pub fn select_menu_item(&self, item_id: String) -> js_sys::Promise {
        let menu = Rc::clone(&self.menu);
        let navigator = Rc::clone(&self.navigator);

        future_to_promise(async move { outcome_to_js(menu.select(&navigator, &item_id).await) })
    }

    #[wasm_bindgen(js_name = currentSceneId)]
    pub fn current_scene_id(&self) -> String {
        self.navigator.current_scene_id().to_string()
    }

    #[wasm_bindgen(js_name = isTransitioning)]
    pub fn is_transitioning(&self) -> bool {
        self.navigator.is_transitioning()
    }

    /// Menu entries with the current scene marked active.
    #[wasm_bindgen(js_name = menuJson)]
    pub fn menu_json(&self) -> Result<String, JsValue> {
        let entries = self.menu.entries(&self.navigator.current_scene_id());
        serde_json::to_string(&entries)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Settings for the host to construct its renderer with.
    #[wasm_bindgen(js_name = viewerSettingsJson)]
    pub fn viewer_settings_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.config.viewer)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

impl Tour {
    fn from_config(config: TourConfig, adapter: ViewerAdapter) -> Result<Tour, TourError> {
        let Assembly {
            navigator,
            dispatch,
            menu,
        } = assemble(&config, JsViewer::new(adapter), JsTimer)?;

        Ok(Tour {
            config,
            navigator,
            dispatch,
            menu,
        })
    }
}
