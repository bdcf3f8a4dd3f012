// Capabilities the navigation engine consumes: the panorama renderer and a timer.
// Only the navigator drives these; everything else routes through it.

use std::time::Duration;

use futures::future::LocalBoxFuture;

use crate::error::TourError;
use crate::types::{MarkerSpec, SphericalPosition};

/// The shared rendering surface.
///
/// `set_panorama` must issue the request as soon as it is called; the returned
/// future only reports when the image is displayed. Dropping the future does not
/// cancel the load.
pub trait Viewer {
    fn set_panorama(&self, panorama: &str) -> LocalBoxFuture<'static, Result<(), TourError>>;

    fn clear_markers(&self);

    fn add_marker(&self, marker: &MarkerSpec);

    /// Move the camera. Fire-and-forget.
    fn animate(&self, position: &SphericalPosition);

    fn start_auto_rotate(&self);

    fn stop_auto_rotate(&self);
}

/// Source of delays for load timeouts.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}
