use gloo_net::http::Request;
use room_core::assets::AssetSource;
use room_core::error::AssetError;

/// Fetches model files over HTTP, relative to the page.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpSource;

impl AssetSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let fail = |reason: String| AssetError::Fetch {
            path: path.to_string(),
            reason,
        };
        let resp = Request::get(path)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !resp.ok() {
            return Err(fail(format!("{} {}", resp.status(), resp.status_text())));
        }
        resp.binary().await.map_err(|e| fail(e.to_string()))
    }
}
