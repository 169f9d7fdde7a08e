//! File-based prompting: read the prompt from disk, optionally write the
//! responses back out

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{error, info};

use crate::fanout::FanOutOrchestrator;

/// Read `file` and fan its content out to `models` (or the defaults)
pub async fn prompt_from_file(
    fan: &FanOutOrchestrator,
    file: &Path,
    models: Option<Vec<String>>,
    correction_model: Option<&str>,
) -> Result<Vec<String>> {
    let text = read_prompt_file(file).await?;
    let models = fan.models_or_default(models);
    Ok(fan.fan_out(&text, &models, correction_model).await?)
}

/// Fan out the content of `file` and write each response to
/// `output_dir/{stem}_{provider}_{model}.txt`.
///
/// Returns one entry per model in input order: the written path, or
/// `Error: <message>` if that response could not be written.
pub async fn prompt_from_file_to_file(
    fan: &FanOutOrchestrator,
    file: &Path,
    models: Option<Vec<String>>,
    output_dir: &Path,
    correction_model: Option<&str>,
) -> Result<Vec<String>> {
    ensure_output_dir(output_dir).await?;

    let models = fan.models_or_default(models);
    let responses = prompt_from_file(fan, file, Some(models.clone()), correction_model).await?;

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "prompt".to_string());

    let mut output_files = Vec::with_capacity(responses.len());
    for (model, response) in models.iter().zip(responses) {
        let path = output_dir.join(response_file_name(&stem, model));
        match tokio::fs::write(&path, response).await {
            Ok(()) => output_files.push(path.display().to_string()),
            Err(e) => {
                error!("Error writing response to {}: {}", path.display(), e);
                output_files.push(format!("Error: {}", e));
            }
        }
    }

    info!(
        "Wrote {} response file(s) to {}",
        output_files.len(),
        output_dir.display()
    );
    Ok(output_files)
}

/// `{stem}_{identifier}.txt` with the separators made filename-safe
pub fn response_file_name(stem: &str, model: &str) -> String {
    format!("{}_{}.txt", stem, sanitize_model_name(model))
}

pub(crate) fn sanitize_model_name(model: &str) -> String {
    model.replace([':', '/', '\\'], "_")
}

pub(crate) async fn read_prompt_file(file: &Path) -> Result<String> {
    let metadata = match tokio::fs::metadata(file).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!("File not found: {}", file.display())
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("Error reading file: {}", file.display())));
        }
    };
    if !metadata.is_file() {
        bail!("Not a file: {}", file.display());
    }
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Error reading file: {}", file.display()))
}

/// Create `dir` if it is missing; fail if it exists and is not a directory
pub(crate) async fn ensure_output_dir(dir: &Path) -> Result<()> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
    }
    if !tokio::fs::metadata(dir).await?.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    Ok(())
}
