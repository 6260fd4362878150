use anyhow::Context;

#[cfg(target_arch = "wasm32")]
fn format_url(root: &str, file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no browser window available"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("cannot read page origin: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/{}/", origin, root.trim_matches('/')))?;
    Ok(base.join(file_name)?)
}

/// Reads `file_name` relative to the asset `root`. On the web the root is a path below the page origin.
pub async fn load_binary(root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(root, file_name)?;
        let response = reqwest::get(url.clone()).await?.error_for_status()?;
        response
            .bytes()
            .await
            .with_context(|| format!("failed to download {}", url))?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new(root).join(file_name);
        std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?
    };

    Ok(data)
}

/// Resolves `uri` against the directory `file_name` lives in.
pub fn sibling_path(file_name: &str, uri: &str) -> String {
    match file_name.rfind('/') {
        Some(idx) => format!("{}{}", &file_name[..=idx], uri),
        None => uri.to_string(),
    }
}
