// Host-side tests for the Spotify PKCE flow and API payload parsing.

use rand::rngs::StdRng;
use rand::SeedableRng;
use room_core::error::AuthError;
use room_core::spotify::*;
use std::collections::HashMap;
use url::Url;

fn config() -> SpotifyConfig {
    SpotifyConfig::for_origin("https://example.github.io")
}

fn query_map(url: &str) -> HashMap<String, String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[test]
fn challenge_matches_rfc7636_vector() {
    assert_eq!(
        code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
        "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
    );
}

#[test]
fn verifiers_are_url_safe_and_fresh() {
    let mut rng = StdRng::seed_from_u64(1);
    let a = generate_verifier(&mut rng);
    let b = generate_verifier(&mut rng);
    assert_eq!(a.len(), 43);
    assert_ne!(a, b);
    assert!(a
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn login_stores_verifier_and_builds_authorize_url() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut store = MemoryVerifierStore::default();
    let mut session = SpotifySession::new(config());
    let url = session.begin_login(&mut rng, &mut store);
    assert_eq!(session.state(), AuthState::Redirecting);
    assert!(url.starts_with(AUTHORIZE_ENDPOINT));

    let q = query_map(&url);
    let verifier = store.load().unwrap();
    assert_eq!(q["client_id"], CLIENT_ID);
    assert_eq!(q["response_type"], "code");
    assert_eq!(q["redirect_uri"], "https://example.github.io/");
    assert_eq!(q["scope"], SCOPES);
    assert_eq!(q["code_challenge_method"], "S256");
    assert_eq!(q["code_challenge"], code_challenge(&verifier));
}

#[test]
fn callback_params_from_query_and_fragment() {
    let p = parse_callback("https://example.github.io/?code=abc123&state=x");
    assert_eq!(p.code.as_deref(), Some("abc123"));
    assert!(p.is_callback());

    let p = parse_callback("https://example.github.io/?error=access_denied");
    assert_eq!(p.error.as_deref(), Some("access_denied"));
    assert_eq!(p.code, None);

    let p = parse_callback("https://example.github.io/#access_token=tok&token_type=Bearer");
    assert_eq!(p.implicit_token.as_deref(), Some("tok"));

    assert!(!parse_callback("https://example.github.io/").is_callback());
    assert!(!parse_callback("not a url").is_callback());
}

#[test]
fn code_without_verifier_stays_logged_out() {
    let mut store = MemoryVerifierStore::default();
    let mut session = SpotifySession::new(config());
    let params = parse_callback("https://example.github.io/?code=abc");
    let action = session.handle_callback(&params, &mut store);
    assert_eq!(action, CallbackAction::None);
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert_eq!(session.last_error(), Some(&AuthError::MissingVerifier));
    assert_eq!(session.access_token(), Err(AuthError::NotLoggedIn));
}

#[test]
fn full_pkce_round_trip() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut store = MemoryVerifierStore::default();
    let mut session = SpotifySession::new(config());
    session.begin_login(&mut rng, &mut store);
    let verifier = store.load().unwrap();

    let params = parse_callback("https://example.github.io/?code=the-code");
    let CallbackAction::Exchange(req) = session.handle_callback(&params, &mut store) else {
        panic!("expected a token exchange");
    };
    assert_eq!(session.state(), AuthState::Exchanging);
    assert_eq!(store.load(), None);
    assert_eq!(req.url, TOKEN_ENDPOINT);
    assert_eq!(req.content_type, "application/x-www-form-urlencoded");

    let body: HashMap<String, String> = url::form_urlencoded::parse(req.body.as_bytes())
        .into_owned()
        .collect();
    assert_eq!(body["grant_type"], "authorization_code");
    assert_eq!(body["code"], "the-code");
    assert_eq!(body["code_verifier"], verifier);
    assert_eq!(body["redirect_uri"], "https://example.github.io/");

    session
        .finish_exchange(200, r#"{"access_token":"AT","token_type":"Bearer","expires_in":3600}"#)
        .unwrap();
    assert!(session.is_logged_in());
    assert_eq!(session.bearer().unwrap(), "Bearer AT");
}

#[test]
fn rejected_exchange_returns_to_logged_out() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut store = MemoryVerifierStore::default();
    let mut session = SpotifySession::new(config());
    session.begin_login(&mut rng, &mut store);
    session.begin_exchange("c", &mut store).unwrap();

    let err = session
        .finish_exchange(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#,
        )
        .unwrap_err();
    assert_eq!(
        err,
        AuthError::TokenRejected {
            status: 400,
            message: "Invalid authorization code".into()
        }
    );
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert!(session.bearer().is_err());
}

#[test]
fn implicit_token_logs_in_when_no_code() {
    let mut store = MemoryVerifierStore::default();
    let mut session = SpotifySession::new(config());
    let params = parse_callback("https://example.github.io/#access_token=legacy");
    assert_eq!(
        session.handle_callback(&params, &mut store),
        CallbackAction::LoggedIn
    );
    assert_eq!(session.access_token(), Ok("legacy"));
}

const SEARCH_BODY: &str = r#"{
  "tracks": {
    "href": "https://api.spotify.com/v1/search",
    "items": [
      {
        "id": "t1",
        "name": "seasons",
        "artists": [{ "name": "wave to earth" }, { "name": "guest" }],
        "album": { "name": "summer flows", "images": [{ "url": "https://i.scdn.co/a.jpg", "width": 640, "height": 640 }] },
        "preview_url": "https://p.scdn.co/mp3-preview/t1",
        "duration_ms": 255000
      },
      {
        "id": "t2",
        "name": "no preview",
        "artists": [],
        "album": { "images": [] },
        "preview_url": null
      }
    ],
    "total": 2
  }
}"#;

#[test]
fn search_results_pick_preview_or_embed() {
    let tracks = parse_search(SEARCH_BODY).unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].artist_name(), "wave to earth");
    assert_eq!(tracks[0].album_art(), Some("https://i.scdn.co/a.jpg"));
    assert_eq!(
        tracks[0].playback(),
        Playback::Preview("https://p.scdn.co/mp3-preview/t1".into())
    );
    assert_eq!(tracks[1].artist_name(), "");
    assert_eq!(tracks[1].album_art(), None);
    assert_eq!(
        tracks[1].playback(),
        Playback::Embed("https://open.spotify.com/embed/track/t2?utm_source=generator".into())
    );
}

#[test]
fn malformed_payloads_are_errors() {
    assert!(matches!(parse_search("{}"), Err(AuthError::Malformed(_))));
    assert!(matches!(parse_track("<html>"), Err(AuthError::Malformed(_))));
    assert!(matches!(
        parse_token_response(200, r#"{"access_token":""}"#),
        Err(AuthError::Malformed(_))
    ));
    assert_eq!(
        parse_token_response(500, "upstream down"),
        Err(AuthError::TokenRejected {
            status: 500,
            message: "upstream down".into()
        })
    );
}

#[test]
fn api_urls() {
    assert_eq!(
        search_url("wave to earth"),
        "https://api.spotify.com/v1/search?q=wave+to+earth&type=track&limit=10"
    );
    assert_eq!(
        track_url(DEFAULT_TRACK_ID),
        "https://api.spotify.com/v1/tracks/5VBjyOQzqlPNgdRPMM6prF"
    );
}

#[test]
fn widget_header_and_seek() {
    assert_eq!(now_playing_header(Some("seasons")), "Now Playing · seasons");
    assert_eq!(now_playing_header(Some("  ")), "Now Playing");
    assert_eq!(now_playing_header(None), "Now Playing");
    assert_eq!(seek_fraction(50.0, 200.0), 0.25);
    assert_eq!(seek_fraction(-5.0, 200.0), 0.0);
    assert_eq!(seek_fraction(10.0, 0.0), 0.0);
}
