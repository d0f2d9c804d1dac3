use crate::dom;
use room_core::assets::LoadProgress;
use room_core::constants::{LOADING_FADE_MS, LOADING_MIN_VISIBLE_MS};
use web_sys as web;

#[inline]
pub fn set_progress(document: &web::Document, progress: LoadProgress) {
    if let Some(bar) = dom::html_by_id(document, "loading-progress") {
        let _ = bar
            .style()
            .set_property("width", &format!("{:.0}%", progress.percent()));
    }
}

/// Fade the loading screen out after its minimum display time, then remove it.
pub fn hide_loading_screen(document: &web::Document) {
    let Some(screen) = document.get_element_by_id("loading-screen") else {
        return;
    };
    dom::set_timeout(LOADING_MIN_VISIBLE_MS, move || {
        dom::set_class(&screen, "hidden", true);
        dom::set_timeout(LOADING_FADE_MS, move || screen.remove());
    });
}
