use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// HTTP agent whose every call, body read included, ends within `timeout`.
pub fn agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Stream the body behind `url` into `dest`. Returns the number of bytes written.
pub fn download(agent: &ureq::Agent, url: &str, dest: &Path) -> Result<u64, String> {
    let response = agent
        .get(url)
        .call()
        .map_err(|e| format!("GET {url} failed: {e}"))?;

    let mut file =
        File::create(dest).map_err(|e| format!("Failed to create {}: {e}", dest.display()))?;
    let mut reader = response.into_body().into_reader();
    std::io::copy(&mut reader, &mut file)
        .map_err(|e| format!("Failed to write {}: {e}", dest.display()))
}
