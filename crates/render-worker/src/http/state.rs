//! Shared state for the worker's HTTP surface.

use std::sync::Arc;

use render_queue::RenderQueue;

use crate::busy_flag::BusyFlag;
use crate::renditions::RenditionGenerator;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<RenderQueue>,
    pub busy: BusyFlag,
    pub rendition_generator: Arc<RenditionGenerator>,
    pub shared_secret: Option<Arc<str>>,
}
