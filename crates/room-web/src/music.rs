//! The music widget: Spotify login, search and playback wired to the page.
//!
//! Auth state and payload parsing live in `room_core::spotify`; this module
//! only moves bytes over HTTP and keeps the DOM in step.

use crate::dom;
use gloo_net::http::Request;
use room_core::error::AuthError;
use room_core::spotify::{
    self, CallbackAction, Playback, SpotifyConfig, SpotifySession, TokenRequest, Track,
    VerifierStore, DEFAULT_TRACK_ARTIST, DEFAULT_TRACK_ID, DEFAULT_TRACK_TITLE, VERIFIER_STORAGE_KEY,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys as web;

const ICON_PLAY: &str = r#"<i class="fas fa-play"></i>"#;
const ICON_PAUSE: &str = r#"<i class="fas fa-pause"></i>"#;
const ICON_EXPANDED: &str = r#"<i class="fas fa-chevron-up"></i>"#;
const ICON_COLLAPSED: &str = r#"<i class="fas fa-music"></i>"#;
const ICON_SPOTIFY_LOGIN: &str = r#"<i class="fab fa-spotify"></i> Login to Spotify"#;

const DEFAULT_EMBED_ID: &str = "spotify-default-embed";
const TRACK_EMBED_ID: &str = "spotify-embed";
const COMPACT_LOGIN_ID: &str = "compact-login-btn";
const EMBED_ALLOW: &str = "autoplay; clipboard-write; encrypted-media; fullscreen; picture-in-picture";

/// Parts of the custom player hidden while an embed iframe does the playing.
const CUSTOM_PLAYER_SECTIONS: [&str; 4] = [
    ".track-info",
    ".music-controls",
    ".volume-control",
    ".progress-container",
];

/// Keeps the PKCE verifier in `sessionStorage` across the authorize redirect.
struct SessionVerifierStore(Option<web::Storage>);

impl SessionVerifierStore {
    fn open() -> Self {
        Self(web::window().and_then(|w| w.session_storage().ok().flatten()))
    }
}

impl VerifierStore for SessionVerifierStore {
    fn load(&self) -> Option<String> {
        self.0.as_ref()?.get_item(VERIFIER_STORAGE_KEY).ok().flatten()
    }

    fn store(&mut self, verifier: &str) {
        let Some(storage) = &self.0 else {
            log::warn!("sessionStorage unavailable; login cannot complete");
            return;
        };
        if let Err(e) = storage.set_item(VERIFIER_STORAGE_KEY, verifier) {
            log::warn!("could not store code verifier: {e:?}");
        }
    }

    fn clear(&mut self) {
        if let Some(storage) = &self.0 {
            let _ = storage.remove_item(VERIFIER_STORAGE_KEY);
        }
    }
}

/// A preview element and the listeners hung on it. Dropping the binding
/// pauses the element and detaches every listener.
struct AudioBinding {
    audio: web::HtmlAudioElement,
    listeners: Vec<(&'static str, Closure<dyn FnMut(web::Event)>)>,
}

impl AudioBinding {
    fn new(audio: web::HtmlAudioElement) -> Self {
        Self {
            audio,
            listeners: Vec::new(),
        }
    }

    fn listen(&mut self, event: &'static str, handler: impl FnMut(web::Event) + 'static) {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web::Event)>);
        if let Err(e) = self
            .audio
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            log::warn!("could not listen for {event} on audio: {e:?}");
            return;
        }
        self.listeners.push((event, closure));
    }
}

impl Drop for AudioBinding {
    fn drop(&mut self) {
        let _ = self.audio.pause();
        for (event, closure) in self.listeners.drain(..) {
            let _ = self
                .audio
                .remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        }
    }
}

struct Widget {
    document: web::Document,
    session: SpotifySession,
    expanded: bool,
    current: Option<Track>,
    audio: Option<AudioBinding>,
    playing: bool,
}

type SharedWidget = Rc<RefCell<Widget>>;

impl Widget {
    fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
        if let Some(content) = self.document.get_element_by_id("music-content") {
            dom::set_class(&content, "show", expanded);
        }
        if let Some(toggle) = self.document.get_element_by_id("music-toggle") {
            toggle.set_inner_html(if expanded { ICON_EXPANDED } else { ICON_COLLAPSED });
        }
    }

    fn toggle_expanded(&mut self) {
        self.set_expanded(!self.expanded);
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        if let Some(btn) = self.document.get_element_by_id("play-pause") {
            btn.set_inner_html(if playing { ICON_PAUSE } else { ICON_PLAY });
        }
    }
}

// ---------------- DOM helpers ----------------

fn set_text(document: &web::Document, id: &str, text: &str) {
    if let Some(el) = document.get_element_by_id(id) {
        el.set_text_content(Some(text));
    }
}

fn set_display_by_id(document: &web::Document, id: &str, value: &str) {
    if let Some(el) = dom::html_by_id(document, id) {
        dom::set_display(&el, value);
    }
}

fn remove_by_id(document: &web::Document, id: &str) {
    if let Some(el) = document.get_element_by_id(id) {
        el.remove();
    }
}

fn set_header(document: &web::Document, title: Option<&str>) {
    if let Some(header) = document.query_selector(".music-title").ok().flatten() {
        header.set_text_content(Some(&spotify::now_playing_header(title)));
    }
}

fn set_custom_player_visible(document: &web::Document, visible: bool) {
    for selector in CUSTOM_PLAYER_SECTIONS {
        if let Some(el) = dom::html_by_selector(document, selector) {
            dom::set_display(&el, if visible { "" } else { "none" });
        }
    }
}

fn make_embed(document: &web::Document, id: &str) -> Result<web::Element, JsValue> {
    let embed = document.create_element("iframe")?;
    embed.set_id(id);
    embed.set_attribute("width", "100%")?;
    embed.set_attribute("height", "152")?;
    embed.set_attribute("frameborder", "0")?;
    embed.set_attribute("allow", EMBED_ALLOW)?;
    embed.set_attribute("allowfullscreen", "")?;
    embed.set_attribute("loading", "lazy")?;
    embed.set_attribute("style", "border-radius: 12px")?;
    Ok(embed)
}

fn volume_slider_value(document: &web::Document) -> f64 {
    document
        .get_element_by_id("volume")
        .and_then(|el| el.dyn_into::<web::HtmlInputElement>().ok())
        .and_then(|input| input.value().parse().ok())
        .unwrap_or(100.0)
}

fn strip_callback_from_url() {
    let Some(window) = web::window() else { return };
    let path = window.location().pathname().unwrap_or_else(|_| "/".into());
    if let Ok(history) = window.history() {
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&path));
    }
}

// ---------------- HTTP ----------------

async fn get_text(url: &str, bearer: &str) -> Result<String, AuthError> {
    let net = |e: gloo_net::Error| AuthError::Network(e.to_string());
    let resp = Request::get(url)
        .header("Authorization", bearer)
        .send()
        .await
        .map_err(net)?;
    if !resp.ok() {
        return Err(AuthError::Network(format!(
            "{url}: {} {}",
            resp.status(),
            resp.status_text()
        )));
    }
    resp.text().await.map_err(net)
}

/// POST the token request; returns the status and raw body for the session to judge.
async fn post_form(req: &TokenRequest) -> Result<(u16, String), AuthError> {
    let net = |e: gloo_net::Error| AuthError::Network(e.to_string());
    let resp = Request::post(req.url)
        .header("Content-Type", req.content_type)
        .body(req.body.clone())
        .map_err(net)?
        .send()
        .await
        .map_err(net)?;
    let status = resp.status();
    let body = resp.text().await.map_err(net)?;
    Ok((status, body))
}

// ---------------- Login ----------------

fn login(widget: &SharedWidget) {
    let url = {
        let mut store = SessionVerifierStore::open();
        widget
            .borrow_mut()
            .session
            .begin_login(&mut rand::thread_rng(), &mut store)
    };
    log::info!("redirecting to Spotify authorization");
    if let Some(window) = web::window() {
        if let Err(e) = window.location().set_href(&url) {
            log::error!("could not navigate to authorize url: {e:?}");
        }
    }
}

fn show_compact_login_button(widget: &SharedWidget, document: &web::Document, after: &web::Element) {
    remove_by_id(document, COMPACT_LOGIN_ID);
    let Ok(button) = document.create_element("button") else {
        return;
    };
    button.set_id(COMPACT_LOGIN_ID);
    button.set_inner_html(ICON_SPOTIFY_LOGIN);
    let w = widget.clone();
    dom::listen(&button, "click", move |_: web::MouseEvent| login(&w));
    let _ = after.after_with_node_1(&button);
}

/// Logged-out listening: the default track as an embed plus a small login button.
fn show_default_embed(widget: &SharedWidget) {
    let document = widget.borrow().document.clone();
    widget.borrow_mut().set_expanded(true);
    let Some(content) = document.get_element_by_id("music-content") else {
        return;
    };
    let embed = match document.get_element_by_id(DEFAULT_EMBED_ID) {
        Some(embed) => embed,
        None => match make_embed(&document, DEFAULT_EMBED_ID) {
            Ok(embed) => {
                let _ = content.append_child(&embed);
                embed
            }
            Err(e) => {
                log::warn!("could not create default embed: {e:?}");
                return;
            }
        },
    };
    let _ = embed.set_attribute("src", &spotify::embed_url(DEFAULT_TRACK_ID));
    set_text(&document, "track-title", DEFAULT_TRACK_TITLE);
    set_text(&document, "track-artist", DEFAULT_TRACK_ARTIST);
    set_display_by_id(&document, "music-player-content", "none");
    set_display_by_id(&document, "spotify-login", "none");
    show_compact_login_button(widget, &document, &embed);
}

fn remove_default_embed(document: &web::Document) {
    remove_by_id(document, DEFAULT_EMBED_ID);
    remove_by_id(document, COMPACT_LOGIN_ID);
    set_custom_player_visible(document, true);
}

fn show_login_interface(widget: &SharedWidget) {
    let document = widget.borrow().document.clone();
    set_display_by_id(&document, "spotify-login", "block");
    set_display_by_id(&document, "music-player-content", "none");
    remove_default_embed(&document);
}

fn show_music_player(widget: &SharedWidget) {
    let (document, needs_track) = {
        let w = widget.borrow();
        (w.document.clone(), w.current.is_none() && w.session.is_logged_in())
    };
    set_display_by_id(&document, "spotify-login", "none");
    set_display_by_id(&document, "music-player-content", "block");
    remove_default_embed(&document);
    set_header(&document, None);
    if needs_track {
        spawn_local(play_track(widget.clone(), DEFAULT_TRACK_ID.to_string()));
    }
}

async fn exchange_code(widget: SharedWidget, req: TokenRequest) {
    let result = post_form(&req).await;
    let outcome = {
        let mut w = widget.borrow_mut();
        match result {
            Ok((status, body)) => w.session.finish_exchange(status, &body),
            Err(e) => Err(w.session.fail(e)),
        }
    };
    match outcome {
        Ok(()) => show_music_player(&widget),
        Err(e) => {
            log::error!("PKCE token exchange failed: {e}");
            show_login_interface(&widget);
            initialize_default_music(&widget);
        }
    }
}

/// Pick up whatever the authorize redirect left in the page URL.
fn handle_redirect(widget: &SharedWidget) {
    let href = web::window()
        .and_then(|w| w.location().href().ok())
        .unwrap_or_default();
    let params = spotify::parse_callback(&href);
    let action = {
        let mut store = SessionVerifierStore::open();
        widget.borrow_mut().session.handle_callback(&params, &mut store)
    };
    if params.is_callback() {
        strip_callback_from_url();
    }
    match action {
        CallbackAction::Exchange(req) => spawn_local(exchange_code(widget.clone(), req)),
        CallbackAction::LoggedIn => show_music_player(widget),
        CallbackAction::None => show_login_interface(widget),
    }
}

fn is_compact() -> bool {
    let ua = web::window()
        .and_then(|w| w.navigator().user_agent().ok())
        .unwrap_or_default();
    spotify::is_compact_viewport(dom::viewport_width(), &ua)
}

fn initialize_default_music(widget: &SharedWidget) {
    let logged_in = widget.borrow().session.is_logged_in();
    if is_compact() {
        widget.borrow_mut().set_expanded(false);
    } else if logged_in {
        widget.borrow_mut().set_expanded(true);
    } else {
        show_default_embed(widget);
    }
}

// ---------------- Search & playback ----------------

async fn search(widget: SharedWidget) {
    let (document, bearer) = {
        let w = widget.borrow();
        (w.document.clone(), w.session.bearer())
    };
    let query = document
        .get_element_by_id("search-input")
        .and_then(|el| el.dyn_into::<web::HtmlInputElement>().ok())
        .map(|input| input.value().trim().to_string())
        .unwrap_or_default();
    if query.is_empty() {
        return;
    }
    let Ok(bearer) = bearer else {
        log::info!("search needs a Spotify login");
        return;
    };
    let tracks = match get_text(&spotify::search_url(&query), &bearer)
        .await
        .and_then(|body| spotify::parse_search(&body))
    {
        Ok(tracks) => tracks,
        Err(e) => {
            log::error!("search failed: {e}");
            return;
        }
    };
    log::debug!("search {query:?}: {} results", tracks.len());
    render_results(&widget, &document, &tracks);
}

fn result_item(document: &web::Document, track: &Track) -> Result<(web::Element, web::Element), JsValue> {
    let item = document.create_element("div")?;
    item.set_class_name("result-item");
    if let Some(art) = track.album_art() {
        let img = document.create_element("img")?;
        img.set_attribute("src", art)?;
        img.set_attribute("alt", "Album Art")?;
        item.append_child(&img)?;
    }
    let info = document.create_element("div")?;
    info.set_class_name("result-info");
    let title = document.create_element("div")?;
    title.set_class_name("result-title");
    title.set_text_content(Some(&track.name));
    let artist = document.create_element("div")?;
    artist.set_class_name("result-artist");
    artist.set_text_content(Some(track.artist_name()));
    info.append_child(&title)?;
    info.append_child(&artist)?;
    item.append_child(&info)?;
    let play = document.create_element("button")?;
    play.set_class_name("play-preview");
    play.set_inner_html(ICON_PLAY);
    item.append_child(&play)?;
    Ok((item, play))
}

fn render_results(widget: &SharedWidget, document: &web::Document, tracks: &[Track]) {
    let Some(list) = document.get_element_by_id("results-list") else {
        return;
    };
    list.set_inner_html("");
    set_display_by_id(document, "search-results", "block");
    for track in tracks {
        let (item, play) = match result_item(document, track) {
            Ok(parts) => parts,
            Err(e) => {
                log::warn!("could not render result {}: {e:?}", track.id);
                continue;
            }
        };
        let w = widget.clone();
        let id = track.id.clone();
        dom::listen(&play, "click", move |_: web::MouseEvent| {
            spawn_local(play_track(w.clone(), id.clone()))
        });
        let _ = list.append_child(&item);
    }
}

fn update_track_display(document: &web::Document, track: &Track) {
    set_text(document, "track-title", &track.name);
    set_text(document, "track-artist", track.artist_name());
    set_header(document, Some(&track.name));
    let Some(art) = document.get_element_by_id("album-art") else {
        return;
    };
    let src = track.album_art().unwrap_or("");
    match art.query_selector("img").ok().flatten() {
        Some(img) => {
            let _ = img.set_attribute("src", src);
        }
        None => {
            if let Ok(img) = document.create_element("img") {
                let _ = img.set_attribute("src", src);
                let _ = img.set_attribute("alt", "Album Art");
                let _ = art.append_child(&img);
            }
        }
    }
}

fn show_track_embed(document: &web::Document, url: &str) {
    let embed = match document.get_element_by_id(TRACK_EMBED_ID) {
        Some(embed) => embed,
        None => {
            let Some(content) = document.get_element_by_id("music-player-content") else {
                return;
            };
            let Ok(embed) = make_embed(document, TRACK_EMBED_ID) else {
                return;
            };
            let _ = content.prepend_with_node_1(&embed);
            embed
        }
    };
    let _ = embed.set_attribute("src", url);
    set_custom_player_visible(document, false);
}

fn remove_track_embed(document: &web::Document) {
    remove_by_id(document, TRACK_EMBED_ID);
    set_custom_player_visible(document, true);
}

async fn play_track(widget: SharedWidget, id: String) {
    let (document, bearer) = {
        let w = widget.borrow();
        (w.document.clone(), w.session.bearer())
    };
    let Ok(bearer) = bearer else {
        log::info!("not logged in; cannot play {id}");
        return;
    };
    let track = match get_text(&spotify::track_url(&id), &bearer)
        .await
        .and_then(|body| spotify::parse_track(&body))
    {
        Ok(track) => track,
        Err(e) => {
            log::error!("track fetch failed: {e}");
            return;
        }
    };
    update_track_display(&document, &track);
    let playback = track.playback();
    widget.borrow_mut().current = Some(track);
    match playback {
        Playback::Preview(url) => {
            play_preview(&widget, &url);
            remove_track_embed(&document);
        }
        Playback::Embed(url) => show_track_embed(&document, &url),
    }
}

fn update_progress(document: &web::Document, audio: &web::HtmlAudioElement) {
    let duration = audio.duration();
    let current = audio.current_time();
    let percent = if duration.is_finite() && duration > 0.0 {
        current / duration * 100.0
    } else {
        0.0
    };
    if let Some(bar) = dom::html_by_selector(document, "#progress .progress") {
        let _ = bar.style().set_property("width", &format!("{percent}%"));
    }
    set_text(document, "current-time", &spotify::format_time(current));
}

fn start_playback(widget: &SharedWidget, audio: &web::HtmlAudioElement) {
    widget.borrow_mut().set_playing(true);
    match audio.play() {
        Ok(promise) => {
            let widget = widget.clone();
            spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    log::info!("autoplay prevented: {e:?}");
                    widget.borrow_mut().set_playing(false);
                }
            });
        }
        Err(e) => {
            log::warn!("audio play failed: {e:?}");
            widget.borrow_mut().set_playing(false);
        }
    }
}

fn play_preview(widget: &SharedWidget, url: &str) {
    let document = widget.borrow().document.clone();
    // Detaches the old element's listeners and stops it.
    let previous = widget.borrow_mut().audio.take();
    drop(previous);
    let audio = match web::HtmlAudioElement::new_with_src(url) {
        Ok(audio) => audio,
        Err(e) => {
            log::error!("could not create audio element: {e:?}");
            return;
        }
    };
    audio.set_volume(volume_slider_value(&document) / 100.0);

    let mut binding = AudioBinding::new(audio.clone());
    {
        let (doc, a) = (document.clone(), audio.clone());
        binding.listen("loadedmetadata", move |_| {
            set_text(&doc, "duration", &spotify::format_time(a.duration()))
        });
    }
    {
        let (doc, a) = (document.clone(), audio.clone());
        binding.listen("timeupdate", move |_| update_progress(&doc, &a));
    }
    {
        let w = widget.clone();
        binding.listen("ended", move |_| w.borrow_mut().set_playing(false));
    }

    start_playback(widget, &audio);
    widget.borrow_mut().audio = Some(binding);
}

fn toggle_play_pause(widget: &SharedWidget) {
    let (audio, playing) = {
        let w = widget.borrow();
        (w.audio.as_ref().map(|b| b.audio.clone()), w.playing)
    };
    let Some(audio) = audio else { return };
    if playing {
        let _ = audio.pause();
        widget.borrow_mut().set_playing(false);
    } else {
        start_playback(widget, &audio);
    }
}

fn current_audio(widget: &SharedWidget) -> Option<web::HtmlAudioElement> {
    widget.borrow().audio.as_ref().map(|b| b.audio.clone())
}

// ---------------- Wiring ----------------

fn wire_controls(widget: &SharedWidget, document: &web::Document) {
    let toggles = document
        .get_element_by_id("music-toggle")
        .into_iter()
        .chain(document.query_selector(".music-title").ok().flatten());
    for toggle in toggles {
        let w = widget.clone();
        dom::listen(&toggle, "click", move |ev: web::MouseEvent| {
            ev.stop_propagation();
            w.borrow_mut().toggle_expanded();
        });
    }
    if let Some(title) = dom::html_by_selector(document, ".music-title") {
        let _ = title.style().set_property("cursor", "pointer");
        let _ = title.style().set_property("user-select", "none");
    }

    {
        let w = widget.clone();
        dom::add_click_listener(document, "spotify-login-btn", move || login(&w));
    }
    {
        let w = widget.clone();
        dom::add_click_listener(document, "search-btn", move || spawn_local(search(w.clone())));
    }
    if let Some(input) = document.get_element_by_id("search-input") {
        let w = widget.clone();
        dom::listen(&input, "keydown", move |ev: web::KeyboardEvent| {
            if ev.key() == "Enter" {
                spawn_local(search(w.clone()));
            }
        });
    }
    {
        let w = widget.clone();
        dom::add_click_listener(document, "play-pause", move || toggle_play_pause(&w));
    }
    // No queue: both skip buttons restart the current preview.
    for id in ["rewind", "forward"] {
        let w = widget.clone();
        dom::add_click_listener(document, id, move || {
            if let Some(audio) = current_audio(&w) {
                audio.set_current_time(0.0);
            }
        });
    }
    if let Some(slider) = document.get_element_by_id("volume") {
        let w = widget.clone();
        let doc = document.clone();
        dom::listen(&slider, "input", move |_: web::Event| {
            let volume = volume_slider_value(&doc);
            if let Some(audio) = current_audio(&w) {
                audio.set_volume(volume / 100.0);
            }
            if let Some(icon) = doc.query_selector(".volume-control i").ok().flatten() {
                icon.set_class_name(spotify::volume_icon(volume));
            }
        });
    }
    if let Some(progress) = document.get_element_by_id("progress") {
        let w = widget.clone();
        let bar = progress.clone();
        dom::listen(&progress, "click", move |ev: web::MouseEvent| {
            let Some(audio) = current_audio(&w) else { return };
            let duration = audio.duration();
            if !duration.is_finite() {
                return;
            }
            let rect = bar.get_bounding_client_rect();
            let x = ev.client_x() as f64 - rect.left();
            audio.set_current_time(spotify::seek_fraction(x, rect.width()) * duration);
        });
    }
}

pub fn install(document: &web::Document) {
    let Some(window) = web::window() else { return };
    if document.get_element_by_id("music-content").is_none() {
        log::info!("music widget not in page; skipping");
        return;
    }
    let origin = window.location().origin().unwrap_or_default();
    let widget: SharedWidget = Rc::new(RefCell::new(Widget {
        document: document.clone(),
        session: SpotifySession::new(SpotifyConfig::for_origin(&origin)),
        expanded: false,
        current: None,
        audio: None,
        playing: false,
    }));

    wire_controls(&widget, document);
    handle_redirect(&widget);
    initialize_default_music(&widget);

    // Narrowing the window folds an open widget away.
    let w = widget.clone();
    dom::listen(&window, "resize", move |_: web::Event| {
        let expanded = w.borrow().expanded;
        if expanded && is_compact() {
            w.borrow_mut().toggle_expanded();
        }
    });
}
