/**
 * This module contains all logic for loading assets from external files.
 */
pub mod texture;


/// Where asset bytes come from.
///
/// [`Assets`] reads from the `assets/` directory natively and fetches from
/// `<origin>/assets/` on the web. Other sources (in-memory, archives) can be
/// plugged into the loaders through this trait.
pub trait AssetSource {
    fn load_binary(&self, file_name: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>>;
}

/// The platform default asset location.
#[derive(Debug, Clone, Copy, Default)]
pub struct Assets;

impl AssetSource for Assets {
    fn load_binary(&self, file_name: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>> {
        load_binary(file_name)
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    use anyhow::Context;

    let window = web_sys::window().context("no global window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("cannot read the page origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path).await?
    };

    Ok(data)
}
