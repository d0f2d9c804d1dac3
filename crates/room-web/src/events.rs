use crate::dom;
use crate::SharedApp;
use glam::Vec2;
use room_core::camera::ZoomDirection;
use room_core::picking::{screen_to_world_ray, PointerPress};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
fn pointer_client_px(ev: &web::PointerEvent) -> Vec2 {
    Vec2::new(ev.client_x() as f32, ev.client_y() as f32)
}

// ---------------- Pointer helpers ----------------
#[inline]
pub fn pointer_canvas_px(ev: &web::PointerEvent, canvas: &web::HtmlCanvasElement) -> Vec2 {
    let rect = canvas.get_bounding_client_rect();
    let x_css = ev.client_x() as f32 - rect.left() as f32;
    let y_css = ev.client_y() as f32 - rect.top() as f32;
    let sx = (x_css / rect.width() as f32) * canvas.width() as f32;
    let sy = (y_css / rect.height() as f32) * canvas.height() as f32;
    Vec2::new(sx, sy)
}

#[inline]
fn set_cursor(canvas: &web::HtmlCanvasElement, cursor: &str) {
    let _ = canvas.style().set_property("cursor", cursor);
}

/// Open the panel belonging to whatever menu furniture sits under the pointer.
fn pick_menu(app: &SharedApp, ev: &web::PointerEvent, canvas: &web::HtmlCanvasElement) {
    let px = pointer_canvas_px(ev, canvas);
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);
    let mut app = app.borrow_mut();
    let camera = app.orbit.camera(w / h.max(1.0));
    let ray = screen_to_world_ray(&camera, px.x, px.y, w, h);
    let Some(section) = app.scene.menu_hit(&ray) else {
        return;
    };
    log::info!("menu hit: {section}");
    let now = app.now();
    app.modal.show(section, now, dom::scroll_offset());
}

pub fn install(canvas: &web::HtmlCanvasElement, document: &web::Document, app: SharedApp) {
    let press: Rc<Cell<Option<PointerPress>>> = Rc::new(Cell::new(None));
    set_cursor(canvas, "grab");

    // pointerdown
    {
        let press = press.clone();
        let canvas_cl = canvas.clone();
        dom::listen(canvas, "pointerdown", move |ev: web::PointerEvent| {
            if ev.button() != 0 {
                return;
            }
            let _ = canvas_cl.set_pointer_capture(ev.pointer_id());
            press.set(Some(PointerPress::new(pointer_client_px(&ev))));
            set_cursor(&canvas_cl, "grabbing");
        });
    }
    // pointermove
    {
        let press = press.clone();
        let app = app.clone();
        dom::listen(canvas, "pointermove", move |ev: web::PointerEvent| {
            let Some(mut p) = press.get() else { return };
            let delta = p.moved_to(pointer_client_px(&ev));
            press.set(Some(p));
            app.borrow_mut().orbit.on_drag_delta(delta.x, delta.y);
        });
    }
    // pointerup
    {
        let press = press.clone();
        let app = app.clone();
        let canvas_cl = canvas.clone();
        dom::listen(canvas, "pointerup", move |ev: web::PointerEvent| {
            let Some(p) = press.take() else { return };
            let _ = canvas_cl.release_pointer_capture(ev.pointer_id());
            set_cursor(&canvas_cl, "grab");
            if p.is_click() {
                pick_menu(&app, &ev, &canvas_cl);
            }
        });
    }
    // pointercancel / leaving without release ends the drag without a click
    {
        let press = press.clone();
        let canvas_cl = canvas.clone();
        dom::listen(canvas, "pointercancel", move |_: web::PointerEvent| {
            press.set(None);
            set_cursor(&canvas_cl, "grab");
        });
    }

    // wheel zoom; must be non-passive to suppress page scroll
    {
        let app = app.clone();
        let closure = Closure::wrap(Box::new(move |ev: web::WheelEvent| {
            ev.prevent_default();
            let dir = if ev.delta_y() < 0.0 {
                ZoomDirection::In
            } else {
                ZoomDirection::Out
            };
            app.borrow_mut().orbit.on_zoom(dir);
        }) as Box<dyn FnMut(_)>);
        let opts = web::AddEventListenerOptions::new();
        opts.set_passive(false);
        let _ = canvas.add_event_listener_with_callback_and_add_event_listener_options(
            "wheel",
            closure.as_ref().unchecked_ref(),
            &opts,
        );
        closure.forget();
    }

    // keyboard zoom, unless the visitor is typing into a field
    dom::listen(document, "keydown", move |ev: web::KeyboardEvent| {
        let typing = ev
            .target()
            .and_then(|t| t.dyn_into::<web::HtmlInputElement>().ok())
            .is_some();
        if typing {
            return;
        }
        app.borrow_mut().orbit.on_key(&ev.key());
    });
}
