use crate::overlay;
use crate::render;
use crate::SharedApp;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

pub struct FrameContext<'a> {
    pub app: SharedApp,
    pub canvas: web::HtmlCanvasElement,
    pub document: web::Document,
    pub labels: Vec<overlay::MenuLabel>,
    pub gpu: Option<render::GpuState<'a>>,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        app: SharedApp,
        canvas: web::HtmlCanvasElement,
        document: web::Document,
        gpu: Option<render::GpuState<'a>>,
    ) -> Self {
        let labels = overlay::collect_menu_labels(&document);
        Self {
            app,
            canvas,
            document,
            labels,
            gpu,
        }
    }

    pub fn frame(&mut self) {
        let mut app = self.app.borrow_mut();
        let app = &mut *app;
        let now = app.now();

        app.orbit.tick();
        app.scene.animate(now);
        app.modal.advance(now);
        let effects = app.modal.take_effects();
        if !effects.is_empty() {
            overlay::apply_effects(&self.document, &effects);
        }

        // Labels live in CSS pixels, the render target in device pixels.
        let rect = self.canvas.get_bounding_client_rect();
        let css_aspect = rect.width() as f32 / (rect.height() as f32).max(1.0);
        let camera = app.orbit.camera(css_aspect);
        overlay::position_menu_labels(
            &self.labels,
            &app.scene,
            &camera,
            rect.width() as f32,
            rect.height() as f32,
        );

        if let Some(g) = &mut self.gpu {
            g.resize_if_needed(self.canvas.width(), self.canvas.height());
            let camera = app.orbit.camera(g.aspect());
            match g.render(app.scene.graph(), &camera) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => g.reconfigure(),
                Err(e) => log::error!("render error: {:?}", e),
            }
        }
    }
}

pub async fn init_gpu(canvas: &web::HtmlCanvasElement) -> Option<render::GpuState<'static>> {
    // leak a canvas clone to satisfy 'static lifetime for surface
    let leaked_canvas = Box::leak(Box::new(canvas.clone()));
    match render::GpuState::new(leaked_canvas).await {
        Ok(g) => Some(g),
        Err(e) => {
            log::error!("WebGPU init error: {:?}", e);
            None
        }
    }
}

/// Drive `frame_ctx` from `requestAnimationFrame` until the page unloads.
pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext<'static>>>) {
    let Some(window) = web::window() else { return };
    let handle: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

    let tick_clone = tick.clone();
    let handle_tick = handle.clone();
    let window_tick = window.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        frame_ctx.borrow_mut().frame();
        if let Some(cb) = tick_clone.borrow().as_ref() {
            handle_tick.set(
                window_tick
                    .request_animation_frame(cb.as_ref().unchecked_ref())
                    .ok(),
            );
        }
    }) as Box<dyn FnMut()>));

    if let Some(cb) = tick.borrow().as_ref() {
        handle.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
    }

    let window_unload = window.clone();
    crate::dom::listen(&window, "beforeunload", move |_: web::Event| {
        if let Some(id) = handle.take() {
            let _ = window_unload.cancel_animation_frame(id);
        }
        // Dropping the closure ends the loop for good.
        tick.borrow_mut().take();
    });
}
