// JS adapters for the viewer and timer capabilities.
// The host wraps its panorama renderer in a small adapter object; data crosses as JSON.

use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::error::TourError;
use crate::types::{MarkerSpec, SphericalPosition};
use crate::viewer::{Timer, Viewer};

#[wasm_bindgen]
extern "C" {
    /// Host-side object wrapping the panorama renderer.
    ///
    /// ```js
    /// {
    ///   setPanorama(url) { return psv.setPanorama(url); },
    ///   clearMarkers() { markers.clearMarkers(); },
    ///   addMarker(json) { markers.addMarker(toPsvMarker(JSON.parse(json))); },
    ///   animate(json) { psv.animate({ ...JSON.parse(json), speed: 1000 }); },
    ///   startAutoRotate() { autorotate.start(); },
    ///   stopAutoRotate() { autorotate.stop(); },
    /// }
    /// ```
    #[derive(Clone, Debug)]
    pub type ViewerAdapter;

    /// May return a promise or any plain value; plain values count as loaded.
    #[wasm_bindgen(method, catch, js_name = setPanorama)]
    fn set_panorama(this: &ViewerAdapter, panorama: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = clearMarkers)]
    fn clear_markers(this: &ViewerAdapter);

    #[wasm_bindgen(method, js_name = addMarker)]
    fn add_marker(this: &ViewerAdapter, marker_json: &str);

    #[wasm_bindgen(method)]
    fn animate(this: &ViewerAdapter, position_json: &str);

    #[wasm_bindgen(method, js_name = startAutoRotate)]
    fn start_auto_rotate(this: &ViewerAdapter);

    #[wasm_bindgen(method, js_name = stopAutoRotate)]
    fn stop_auto_rotate(this: &ViewerAdapter);
}

/// `Viewer` backed by a host adapter.
pub struct JsViewer {
    adapter: ViewerAdapter,
}

impl JsViewer {
    pub fn new(adapter: ViewerAdapter) -> Self {
        JsViewer { adapter }
    }
}

fn load_error(panorama: &str, err: &JsValue) -> TourError {
    TourError::PanoramaLoad {
        panorama: panorama.to_string(),
        message: err.as_string().unwrap_or_else(|| format!("{:?}", err)),
    }
}

fn to_json<T: Serialize>(what: &str, value: &T) -> Option<String> {
    serde_json::to_string(value)
        .map_err(|err| log::error!("Could not serialize {}: {}", what, err))
        .ok()
}

impl Viewer for JsViewer {
    fn set_panorama(&self, panorama: &str) -> LocalBoxFuture<'static, Result<(), TourError>> {
        let panorama = panorama.to_string();
        // Issued now; the future only waits for the promise.
        let request = self.adapter.set_panorama(&panorama);

        async move {
            let returned = request.map_err(|err| load_error(&panorama, &err))?;
            JsFuture::from(js_sys::Promise::resolve(&returned))
                .await
                .map(|_| ())
                .map_err(|err| load_error(&panorama, &err))
        }
        .boxed_local()
    }

    fn clear_markers(&self) {
        self.adapter.clear_markers();
    }

    fn add_marker(&self, marker: &MarkerSpec) {
        if let Some(json) = to_json("marker", marker) {
            self.adapter.add_marker(&json);
        }
    }

    fn animate(&self, position: &SphericalPosition) {
        if let Some(json) = to_json("camera position", position) {
            self.adapter.animate(&json);
        }
    }

    fn start_auto_rotate(&self) {
        self.adapter.start_auto_rotate();
    }

    fn stop_auto_rotate(&self) {
        self.adapter.stop_auto_rotate();
    }
}

/// `Timer` on top of `window.setTimeout`.
#[derive(Default)]
pub struct JsTimer;

impl Timer for JsTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let delay = duration.min(Duration::from_millis(i32::MAX as u64)).as_millis() as i32;

        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let Some(window) = web_sys::window() else {
                log::warn!("No global `window`, panorama loads will not time out");
                return;
            };
            if let Err(err) = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, delay) {
                log::warn!("Failed to call `setTimeout`: {:?}", err);
            }
        });

        async move {
            let _ = JsFuture::from(promise).await;
        }
        .boxed_local()
    }
}
