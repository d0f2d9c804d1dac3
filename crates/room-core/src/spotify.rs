//! Spotify client: PKCE authorization, token handling, API payloads and the
//! small formatting rules the music widget follows.
//!
//! Nothing here performs I/O. The front-end sends the requests described by
//! [`TokenRequest`] and the URL helpers, then feeds responses back in.

use crate::error::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::{form_urlencoded, Url};

pub const CLIENT_ID: &str = "b3629d1eb6a34dbd91aed2ef24c497f1";
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";
pub const API_BASE: &str = "https://api.spotify.com/v1";
pub const SCOPES: &str = "user-read-private user-read-email user-top-read user-read-recently-played";
pub const VERIFIER_STORAGE_KEY: &str = "spotify_code_verifier";

pub const DEFAULT_TRACK_ID: &str = "5VBjyOQzqlPNgdRPMM6prF";
pub const DEFAULT_TRACK_TITLE: &str = "seasons";
pub const DEFAULT_TRACK_ARTIST: &str = "wave to earth";

pub const SEARCH_LIMIT: u32 = 10;
/// Viewports at least this wide start with the widget expanded.
pub const EXPANDED_MIN_WIDTH: f64 = 1024.0;
pub const MOBILE_MAX_WIDTH: f64 = 768.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: String,
}

impl SpotifyConfig {
    /// Redirect back to the site root of `origin` (trailing slash included).
    pub fn for_origin(origin: &str) -> Self {
        Self {
            client_id: CLIENT_ID.to_string(),
            redirect_uri: format!("{}/", origin.trim_end_matches('/')),
            scopes: SCOPES.to_string(),
        }
    }
}

// ---------------- PKCE ----------------

/// 32 random bytes, base64url without padding (43 characters).
pub fn generate_verifier<R: RngCore>(rng: &mut R) -> String {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

pub fn authorize_url(config: &SpotifyConfig, challenge: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scopes)
        .append_pair("code_challenge_method", "S256")
        .append_pair("code_challenge", challenge)
        .finish();
    format!("{AUTHORIZE_ENDPOINT}?{query}")
}

/// Form-encoded POST to the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequest {
    pub url: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

pub fn token_request(config: &SpotifyConfig, code: &str, verifier: &str) -> TokenRequest {
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &config.client_id)
        .append_pair("grant_type", "authorization_code")
        .append_pair("code", code)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("code_verifier", verifier)
        .finish();
    TokenRequest {
        url: TOKEN_ENDPOINT,
        content_type: "application/x-www-form-urlencoded",
        body,
    }
}

// ---------------- URLs ----------------

pub fn search_url(query: &str) -> String {
    let q = form_urlencoded::Serializer::new(String::new())
        .append_pair("q", query)
        .append_pair("type", "track")
        .append_pair("limit", &SEARCH_LIMIT.to_string())
        .finish();
    format!("{API_BASE}/search?{q}")
}

pub fn track_url(id: &str) -> String {
    let id: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
    format!("{API_BASE}/tracks/{id}")
}

pub fn embed_url(id: &str) -> String {
    let id: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
    format!("https://open.spotify.com/embed/track/{id}?utm_source=generator")
}

/// What the page URL carried back from the authorize redirect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    /// Legacy implicit-grant `#access_token=…` fragment.
    pub implicit_token: Option<String>,
}

impl CallbackParams {
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some() || self.implicit_token.is_some()
    }
}

pub fn parse_callback(page_url: &str) -> CallbackParams {
    let Ok(url) = Url::parse(page_url) else {
        return CallbackParams::default();
    };
    let mut out = CallbackParams::default();
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "code" if !v.is_empty() => out.code = Some(v.into_owned()),
            "error" => out.error = Some(v.into_owned()),
            _ => {}
        }
    }
    if let Some(fragment) = url.fragment() {
        out.implicit_token = form_urlencoded::parse(fragment.as_bytes())
            .find(|(k, v)| k == "access_token" && !v.is_empty())
            .map(|(_, v)| v.into_owned());
    }
    out
}

// ---------------- Verifier storage ----------------

/// Survives the authorize redirect. The browser implementation is `sessionStorage`.
pub trait VerifierStore {
    fn load(&self) -> Option<String>;
    fn store(&mut self, verifier: &str);
    fn clear(&mut self);
}

#[derive(Debug, Default)]
pub struct MemoryVerifierStore(Option<String>);

impl VerifierStore for MemoryVerifierStore {
    fn load(&self) -> Option<String> {
        self.0.clone()
    }

    fn store(&mut self, verifier: &str) {
        self.0 = Some(verifier.to_string());
    }

    fn clear(&mut self) {
        self.0 = None;
    }
}

// ---------------- API payloads ----------------

#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Playback {
    /// 30 second preview played through an `<audio>` element.
    Preview(String),
    /// Embedded player iframe.
    Embed(String),
}

impl Track {
    pub fn artist_name(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or("")
    }

    pub fn album_art(&self) -> Option<&str> {
        self.album.images.first().map(|i| i.url.as_str())
    }

    pub fn playback(&self) -> Playback {
        match self.preview_url.as_deref() {
            Some(url) if !url.is_empty() => Playback::Preview(url.to_string()),
            _ => Playback::Embed(embed_url(&self.id)),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
}

#[derive(Clone, Debug, Deserialize)]
struct SearchResponse {
    tracks: Paging<Track>,
}

pub fn parse_search(body: &str) -> Result<Vec<Track>, AuthError> {
    serde_json::from_str::<SearchResponse>(body)
        .map(|r| r.tracks.items)
        .map_err(|e| AuthError::Malformed(e.to_string()))
}

pub fn parse_track(body: &str) -> Result<Track, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::Malformed(e.to_string()))
}

/// Access token from a token endpoint response.
pub fn parse_token_response(status: u16, body: &str) -> Result<String, AuthError> {
    if (200..300).contains(&status) {
        let token: TokenResponse =
            serde_json::from_str(body).map_err(|e| AuthError::Malformed(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(AuthError::Malformed("empty access_token".into()));
        }
        return Ok(token.access_token);
    }
    let message = match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(e) => e.error_description.unwrap_or(e.error),
        Err(_) => body.to_string(),
    };
    Err(AuthError::TokenRejected { status, message })
}

// ---------------- Session ----------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    Redirecting,
    Exchanging,
    LoggedIn,
}

/// Next step after inspecting the page URL on load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Nothing to do; stay logged out.
    None,
    /// POST this request, then call [`SpotifySession::finish_exchange`].
    Exchange(TokenRequest),
    /// An implicit-grant token was accepted.
    LoggedIn,
}

#[derive(Debug)]
pub struct SpotifySession {
    config: SpotifyConfig,
    state: AuthState,
    token: Option<String>,
    last_error: Option<AuthError>,
}

impl SpotifySession {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            config,
            state: AuthState::LoggedOut,
            token: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == AuthState::LoggedIn
    }

    pub fn last_error(&self) -> Option<&AuthError> {
        self.last_error.as_ref()
    }

    /// Create and store a verifier; returns the authorize URL to navigate to.
    pub fn begin_login<R: RngCore, S: VerifierStore>(&mut self, rng: &mut R, store: &mut S) -> String {
        let verifier = generate_verifier(rng);
        store.store(&verifier);
        self.state = AuthState::Redirecting;
        authorize_url(&self.config, &code_challenge(&verifier))
    }

    pub fn begin_exchange<S: VerifierStore>(
        &mut self,
        code: &str,
        store: &mut S,
    ) -> Result<TokenRequest, AuthError> {
        let Some(verifier) = store.load() else {
            return Err(self.fail(AuthError::MissingVerifier));
        };
        store.clear();
        self.state = AuthState::Exchanging;
        Ok(token_request(&self.config, code, &verifier))
    }

    pub fn finish_exchange(&mut self, status: u16, body: &str) -> Result<(), AuthError> {
        match parse_token_response(status, body) {
            Ok(token) => {
                self.token = Some(token);
                self.state = AuthState::LoggedIn;
                self.last_error = None;
                log::info!("spotify login complete");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Return to logged-out, remembering why.
    pub fn fail(&mut self, err: AuthError) -> AuthError {
        log::warn!("spotify auth failed: {err}");
        self.state = AuthState::LoggedOut;
        self.token = None;
        self.last_error = Some(err.clone());
        err
    }

    pub fn accept_implicit_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
        self.state = AuthState::LoggedIn;
        self.last_error = None;
    }

    /// Decide what the redirect left us: a code to exchange first, else a
    /// legacy implicit token, else nothing.
    pub fn handle_callback<S: VerifierStore>(
        &mut self,
        params: &CallbackParams,
        store: &mut S,
    ) -> CallbackAction {
        if let Some(err) = params.error.as_deref() {
            log::warn!("spotify authorize returned error: {err}");
        }
        if let Some(code) = params.code.as_deref() {
            if let Ok(req) = self.begin_exchange(code, store) {
                return CallbackAction::Exchange(req);
            }
        }
        if let Some(token) = params.implicit_token.as_deref() {
            self.accept_implicit_token(token);
            return CallbackAction::LoggedIn;
        }
        CallbackAction::None
    }

    pub fn access_token(&self) -> Result<&str, AuthError> {
        match (&self.state, &self.token) {
            (AuthState::LoggedIn, Some(t)) => Ok(t),
            _ => Err(AuthError::NotLoggedIn),
        }
    }

    pub fn bearer(&self) -> Result<String, AuthError> {
        self.access_token().map(|t| format!("Bearer {t}"))
    }
}

// ---------------- Widget rules ----------------

/// `m:ss`; anything not finite or negative reads as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Icon class for a 0–100 volume.
pub fn volume_icon(volume: f64) -> &'static str {
    if volume <= 0.0 {
        "fas fa-volume-mute"
    } else if volume < 50.0 {
        "fas fa-volume-down"
    } else {
        "fas fa-volume-up"
    }
}

pub fn now_playing_header(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => format!("Now Playing · {t}"),
        _ => "Now Playing".to_string(),
    }
}

pub fn is_mobile_user_agent(ua: &str) -> bool {
    const MARKERS: [&str; 8] = [
        "Android",
        "webOS",
        "iPhone",
        "iPad",
        "iPod",
        "BlackBerry",
        "IEMobile",
        "Opera Mini",
    ];
    MARKERS.iter().any(|m| ua.contains(m))
}

pub fn is_compact_viewport(width: f64, user_agent: &str) -> bool {
    width <= MOBILE_MAX_WIDTH || width < EXPANDED_MIN_WIDTH || is_mobile_user_agent(user_agent)
}

/// Fraction of the track a click at `x` on a bar of `width` seeks to.
pub fn seek_fraction(x: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    (x / width).clamp(0.0, 1.0)
}
