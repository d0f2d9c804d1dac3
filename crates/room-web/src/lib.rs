#![cfg(target_arch = "wasm32")]
use instant::Instant;
use room_core::assets::{load_each, split_tiers, AssetDescriptor, LoadOutcome, MANIFEST};
use room_core::modal::ModalController;
use room_core::{AssetRegistry, OrbitController, RoomScene};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

mod dom;
mod events;
mod fetch;
mod frame;
mod music;
mod overlay;
mod render;
mod ui;

/// Everything the callbacks share. Only touched from the main thread, one
/// callback at a time.
pub(crate) struct App {
    pub scene: RoomScene,
    pub registry: AssetRegistry,
    pub orbit: OrbitController,
    pub modal: ModalController,
    clock: Instant,
}

impl App {
    fn new(seed: u64) -> Self {
        let mut registry = AssetRegistry::new();
        registry.expect(MANIFEST.iter().map(|d| d.name));
        Self {
            scene: RoomScene::new(seed),
            registry,
            orbit: OrbitController::new(),
            modal: ModalController::new(),
            clock: Instant::now(),
        }
    }

    /// Seconds since start-up; the time base for fades and pulses.
    pub fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }
}

type SharedApp = Rc<RefCell<App>>;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("room-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

fn settle(app: &SharedApp, document: &web::Document, desc: &AssetDescriptor, outcome: LoadOutcome) {
    let mut app = app.borrow_mut();
    let app = &mut *app;
    if !app.registry.settle(desc.name, outcome) {
        return;
    }
    if app.scene.mirror().is_some() {
        app.scene.update(&app.registry);
    }
    ui::set_progress(document, app.registry.progress());
}

async fn load_tier(app: SharedApp, document: web::Document, tier: Vec<AssetDescriptor>) {
    load_each(&fetch::HttpSource, &tier, |d, outcome| {
        settle(&app, &document, d, outcome)
    })
    .await;
    let progress = app.borrow().registry.progress();
    if progress.is_complete() {
        log::info!("all {} assets settled", progress.total);
    }
}

async fn init() -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow::anyhow!("no document"))?;

    let canvas: web::HtmlCanvasElement = document
        .get_element_by_id("room-canvas")
        .ok_or_else(|| anyhow::anyhow!("missing #room-canvas"))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;

    // Keep the backing store at CSS size * devicePixelRatio
    dom::sync_canvas_backing_size(&canvas);
    {
        let canvas = canvas.clone();
        dom::listen(&window, "resize", move |_: web::Event| {
            dom::sync_canvas_backing_size(&canvas)
        });
    }

    let seed = (js_sys::Math::random() * u32::MAX as f64) as u64;
    let app: SharedApp = Rc::new(RefCell::new(App::new(seed)));
    ui::set_progress(&document, app.borrow().registry.progress());

    events::install(&canvas, &document, app.clone());
    overlay::install(&document, app.clone());
    music::install(&document);

    // Critical tier first; the room is built once it has settled.
    let tiers = split_tiers(MANIFEST);
    load_each(&fetch::HttpSource, &tiers.critical, |d, outcome| {
        settle(&app, &document, d, outcome)
    })
    .await;
    {
        let mut a = app.borrow_mut();
        let a = &mut *a;
        a.scene.build(&a.registry);
    }
    log::info!(
        "room built with {} nodes",
        app.borrow().scene.graph().len()
    );

    let gpu = frame::init_gpu(&canvas).await;
    let ctx = frame::FrameContext::new(app.clone(), canvas.clone(), document.clone(), gpu);
    frame::start_loop(Rc::new(RefCell::new(ctx)));
    ui::hide_loading_screen(&document);

    // Secondary and decorative tiers race each other.
    for tier in [tiers.secondary, tiers.decorative] {
        spawn_local(load_tier(app.clone(), document.clone(), tier));
    }
    Ok(())
}
