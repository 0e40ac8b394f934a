use std::path::PathBuf;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

use crate::error::{ReelError, ReelResult};
use crate::story::Story;

/// Where an asset's bytes come from, parsed from the URI the generation
/// collaborators hand us.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSource {
    /// Inline `data:` URI with a base64 payload.
    Data { payload: String },
    /// Remote `http(s)` URL.
    Remote { url: String },
    /// Local filesystem path.
    File { path: PathBuf },
}

impl AssetSource {
    pub fn parse(uri: &str) -> ReelResult<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ReelError::asset("empty asset URI"));
        }
        if let Some(rest) = uri.strip_prefix("data:") {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| ReelError::asset("malformed data URI (missing ',')"))?;
            if !meta.ends_with(";base64") {
                return Err(ReelError::asset("data URIs must carry a base64 payload"));
            }
            return Ok(Self::Data {
                payload: payload.to_string(),
            });
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(Self::Remote {
                url: uri.to_string(),
            });
        }
        Ok(Self::File {
            path: PathBuf::from(uri),
        })
    }
}

/// Fetches asset bytes with a bounded timeout.
///
/// Every fetch is labeled by the caller ("page 2 image", "background music")
/// so failures identify the asset that broke the export.
pub struct AssetFetcher {
    client: reqwest::blocking::Client,
}

impl AssetFetcher {
    pub fn new(timeout: Duration) -> ReelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReelError::asset(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    pub fn fetch(&self, uri: &str, label: &str) -> ReelResult<Vec<u8>> {
        let bytes = match AssetSource::parse(uri)? {
            AssetSource::Data { payload } => BASE64
                .decode(payload.as_bytes())
                .map_err(|e| ReelError::asset(format!("{label}: bad base64 payload: {e}")))?,
            AssetSource::Remote { url } => self.fetch_remote(&url, label)?,
            AssetSource::File { path } => std::fs::read(&path).map_err(|e| {
                ReelError::asset(format!("{label}: failed to read '{}': {e}", path.display()))
            })?,
        };
        debug!(label, bytes = bytes.len(), "fetched asset");
        Ok(bytes)
    }

    fn fetch_remote(&self, url: &str, label: &str) -> ReelResult<Vec<u8>> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                ReelError::timeout(format!("{label}: fetch of '{url}' timed out"))
            } else {
                ReelError::asset(format!("{label}: fetch of '{url}' failed: {e}"))
            }
        };

        let response = self.client.get(url).send().map_err(map_err)?;
        if !response.status().is_success() {
            return Err(ReelError::asset(format!(
                "{label}: fetch of '{url}' returned {}",
                response.status()
            )));
        }
        Ok(response.bytes().map_err(map_err)?.to_vec())
    }
}

/// Decode image bytes to straight-alpha RGBA8.
///
/// Premultiplication happens after the letterbox rescale, which expects
/// straight alpha.
pub fn decode_image(bytes: &[u8], label: &str) -> ReelResult<image::RgbaImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ReelError::asset(format!("{label}: image decode failed: {e}")))?;
    Ok(dyn_img.to_rgba8())
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((u16::from(px[0]) * a + 127) / 255) as u8;
        px[1] = ((u16::from(px[1]) * a + 127) / 255) as u8;
        px[2] = ((u16::from(px[2]) * a + 127) / 255) as u8;
    }
}

/// Fetch and decode every page's illustration, in parallel.
///
/// All-or-nothing: any single failure fails the whole load, so the export
/// never renders a partial image set.
pub fn load_page_images(fetcher: &AssetFetcher, story: &Story) -> ReelResult<Vec<image::RgbaImage>> {
    let results: Vec<ReelResult<image::RgbaImage>> = std::thread::scope(|scope| {
        let handles: Vec<_> = story
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                scope.spawn(move || {
                    let label = format!("page {i} image");
                    let bytes = fetcher.fetch(&page.image_url, &label)?;
                    decode_image(&bytes, &label)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(ReelError::asset("image loader thread panicked")))
            })
            .collect()
    });

    results.into_iter().collect()
}
