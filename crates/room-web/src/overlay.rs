use crate::dom;
use crate::SharedApp;
use room_core::camera::Camera;
use room_core::composer::MENU_TARGETS;
use room_core::modal::{section_id, ModalEffect};
use room_core::panels::{self, FolderAction};
use room_core::picking::project_to_screen;
use room_core::RoomScene;
use wasm_bindgen::JsCast;
use web_sys as web;

/// Inner panels of each section; a click outside them closes the panel.
const PANEL_CONTENT_SELECTOR: &str = ".scrapbook-content, .desktop-window, .resume-preview-content, .education-content, .contact-content";

/// A DOM label pinned over a piece of menu furniture.
pub struct MenuLabel {
    el: web::HtmlElement,
    slot: &'static str,
}

pub fn collect_menu_labels(document: &web::Document) -> Vec<MenuLabel> {
    dom::query_all(document, ".menu-label[data-section]")
        .into_iter()
        .filter_map(|el| {
            let section = section_id(&el.get_attribute("data-section")?)?;
            let slot = MENU_TARGETS
                .iter()
                .find(|(_, s)| *s == section)
                .map(|(slot, _)| *slot)?;
            let el = el.dyn_into::<web::HtmlElement>().ok()?;
            Some(MenuLabel { el, slot })
        })
        .collect()
}

pub fn position_menu_labels(
    labels: &[MenuLabel],
    scene: &RoomScene,
    camera: &Camera,
    width: f32,
    height: f32,
) {
    for label in labels {
        let style = label.el.style();
        let screen = scene
            .menu_anchor(label.slot)
            .and_then(|p| project_to_screen(camera, p, width, height));
        match screen {
            Some(p) => {
                let _ = style.set_property("left", &format!("{:.1}px", p.x));
                let _ = style.set_property("top", &format!("{:.1}px", p.y));
                let _ = style.set_property("display", "block");
            }
            None => {
                let _ = style.set_property("display", "none");
            }
        }
    }
}

fn lock_body_scroll(document: &web::Document, offset: f64) {
    let Some(body) = document.body() else { return };
    let style = body.style();
    let _ = style.set_property("position", "fixed");
    let _ = style.set_property("top", &format!("-{offset}px"));
    let _ = style.set_property("width", "100%");
}

fn unlock_body_scroll(document: &web::Document, offset: f64) {
    if let Some(body) = document.body() {
        let style = body.style();
        let _ = style.remove_property("position");
        let _ = style.remove_property("top");
        let _ = style.remove_property("width");
    }
    if let Some(w) = web::window() {
        w.scroll_to_with_x_and_y(0.0, offset);
    }
}

fn set_music_widget_visible(document: &web::Document, visible: bool) {
    if let Some(player) = dom::html_by_selector(document, ".music-player") {
        dom::set_display(&player, if visible { "block" } else { "none" });
    }
}

/// Mirror the modal controller's transitions onto the page.
pub fn apply_effects(document: &web::Document, effects: &[ModalEffect]) {
    for effect in effects {
        log::debug!("modal effect: {effect:?}");
        match effect {
            ModalEffect::OpenOverlay | ModalEffect::CloseOverlay => {
                if let Some(body) = document.body() {
                    dom::set_class(&body, "modal-open", *effect == ModalEffect::OpenOverlay);
                }
            }
            ModalEffect::Activate(id) => {
                if let Some(section) = document.get_element_by_id(id) {
                    dom::set_class(&section, "closing", false);
                    dom::set_class(&section, "active", true);
                }
            }
            ModalEffect::BeginFadeOut(id) => {
                if let Some(section) = document.get_element_by_id(id) {
                    dom::set_class(&section, "active", false);
                    dom::set_class(&section, "closing", true);
                }
            }
            ModalEffect::Deactivate(id) => {
                if let Some(section) = document.get_element_by_id(id) {
                    dom::set_class(&section, "closing", false);
                }
            }
            ModalEffect::HideMusicWidget => set_music_widget_visible(document, false),
            ModalEffect::ShowMusicWidget => set_music_widget_visible(document, true),
            ModalEffect::LockScroll { offset } => lock_body_scroll(document, *offset),
            ModalEffect::UnlockScroll { offset } => unlock_body_scroll(document, *offset),
        }
    }
}

fn hover_hides_glow(target: &web::EventTarget, app: &SharedApp) {
    for (event, visible) in [("mouseenter", false), ("mouseleave", true)] {
        let app = app.clone();
        dom::listen(target, event, move |_: web::MouseEvent| {
            let mut app = app.borrow_mut();
            let now = app.now();
            app.scene.set_glow_visible(visible, now);
        });
    }
}

fn clicked_outside_active_panel(document: &web::Document, active: &str, target: &web::Element) -> bool {
    let Some(section) = document.get_element_by_id(active) else {
        return false;
    };
    let Ok(Some(content)) = section.query_selector(PANEL_CONTENT_SELECTOR) else {
        return false;
    };
    let on_nav_link = target.closest(".nav-link").ok().flatten().is_some();
    let node: &web::Node = target;
    !content.contains(Some(node)) && !on_nav_link
}

fn close_panels(app: &SharedApp) {
    let mut app = app.borrow_mut();
    let now = app.now();
    app.modal.hide_all(now);
}

fn open_in_new_tab(url: &str) {
    let Some(window) = web::window() else { return };
    if let Err(e) = window.open_with_url_and_target(url, "_blank") {
        log::warn!("could not open {url}: {e:?}");
    }
}

/// Folders on the projects desktop: click or Enter/Space opens the project.
fn install_project_folders(document: &web::Document, app: &SharedApp) {
    for folder in dom::query_all(document, ".project-folder") {
        let Ok(folder) = folder.dyn_into::<web::HtmlElement>() else {
            continue;
        };
        let name = folder
            .query_selector(".folder-name")
            .ok()
            .flatten()
            .and_then(|n| n.text_content())
            .unwrap_or_default();
        let _ = folder.set_attribute("tabindex", "0");
        let _ = folder.set_attribute("role", "button");
        let _ = folder.set_attribute("aria-label", &panels::folder_aria_label(&name));

        let project = folder.get_attribute("data-project").unwrap_or_default();
        {
            let app = app.clone();
            let el = folder.clone();
            dom::listen(&folder, "click", move |ev: web::MouseEvent| {
                ev.prevent_default();
                ev.stop_propagation();
                match panels::folder_action(&project) {
                    FolderAction::Open(url) => {
                        let _ = el.style().set_property("transform", "scale(0.95)");
                        let el = el.clone();
                        dom::set_timeout(panels::FOLDER_PRESS_MS, move || {
                            let _ = el.style().remove_property("transform");
                            open_in_new_tab(url);
                        });
                    }
                    FolderAction::ClosePanel => close_panels(&app),
                    FolderAction::Ignore => log::debug!("folder {project:?} has no link"),
                }
            });
        }
        let el = folder.clone();
        dom::listen(&folder, "keydown", move |ev: web::KeyboardEvent| {
            if panels::is_activation_key(&ev.key()) {
                ev.prevent_default();
                el.click();
            }
        });
    }
}

fn set_collapsed(toggle: &web::Element, content: &web::Element, collapsed: bool) {
    dom::set_class(content, "collapsed", collapsed);
    dom::set_class(toggle, "collapsed", collapsed);
    let Some(icon) = toggle
        .query_selector("i")
        .ok()
        .flatten()
        .and_then(|i| i.dyn_into::<web::HtmlElement>().ok())
    else {
        return;
    };
    let rotation = panels::chevron_rotation(collapsed);
    if collapsed {
        let _ = icon.style().set_property("transform", rotation);
    } else {
        dom::set_timeout(panels::CHEVRON_RESET_DELAY_MS, move || {
            let _ = icon.style().set_property("transform", rotation);
        });
    }
}

/// `[data-collapse="name"]` buttons fold the `#name-content` body in and out.
fn install_collapsible_sections(document: &web::Document) {
    for toggle in dom::query_all(document, "[data-collapse]") {
        let Some(section) = toggle.get_attribute("data-collapse") else {
            continue;
        };
        let content_id = panels::collapsible_content_id(&section);
        let doc = document.clone();
        let el = toggle.clone();
        dom::listen(&toggle, "click", move |_: web::MouseEvent| {
            let Some(content) = doc.get_element_by_id(&content_id) else {
                log::info!("#{content_id} not in page");
                return;
            };
            let collapsed = !content.class_list().contains("collapsed");
            set_collapsed(&el, &content, collapsed);
        });
    }
}

pub fn install(document: &web::Document, app: SharedApp) {
    match document.get_element_by_id("navigation-modal") {
        Some(modal) => {
            if let Ok(modal) = modal.clone().dyn_into::<web::HtmlElement>() {
                dom::set_display(&modal, "block");
            }
            hover_hides_glow(&modal, &app);
        }
        None => log::info!("#navigation-modal not in page"),
    }

    for link in dom::query_all(document, ".nav-link") {
        hover_hides_glow(&link, &app);
        let app = app.clone();
        let href = link.get_attribute("href").unwrap_or_default();
        dom::listen(&link, "click", move |ev: web::MouseEvent| {
            ev.prevent_default();
            let mut app = app.borrow_mut();
            let now = app.now();
            app.modal.show(&href, now, dom::scroll_offset());
        });
    }

    {
        let app = app.clone();
        dom::add_click_listener(document, "close-modal", move || close_panels(&app));
    }
    // The experience briefcase carries its own close button.
    for close in dom::query_all(document, ".briefcase-close") {
        let app = app.clone();
        dom::listen(&close, "click", move |ev: web::MouseEvent| {
            ev.stop_propagation();
            close_panels(&app);
        });
    }
    install_project_folders(document, &app);
    install_collapsible_sections(document);

    let doc = document.clone();
    dom::listen(document, "click", move |ev: web::MouseEvent| {
        let Some(target) = ev.target().and_then(|t| t.dyn_into::<web::Element>().ok()) else {
            return;
        };
        let Some(active) = app.borrow().modal.active() else {
            return;
        };
        if clicked_outside_active_panel(&doc, active, &target) {
            close_panels(&app);
        }
    });
}
