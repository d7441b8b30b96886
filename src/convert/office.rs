//! Conversions delegated to host binaries: LibreOffice for office formats,
//! Poppler's `pdftoppm` for rasterizing PDFs.

use super::{ConvertError, Format};
use crate::config::ConvertConfig;
use crate::runtime::{CommandRunner, ProcessSpec};
use crate::util::truncate_with_ellipsis;
use std::path::{Path, PathBuf};
use std::time::Duration;

const STDERR_PREVIEW_CHARS: usize = 300;
/// Raster resolution for pdf → image.
const RASTER_DPI: &str = "150";
const RASTER_BASENAME: &str = "page";
/// LibreOffice user profile directory, created inside each workspace.
const SOFFICE_PROFILE_DIR: &str = "lo-profile";

/// Argument for `--convert-to`. Writer needs an explicit filter to emit UTF-8 text.
fn soffice_target(target: Format) -> &'static str {
    match target {
        Format::Txt => "txt:Text (encoded):UTF8",
        other => other.extension(),
    }
}

/// `-env:UserInstallation=file:///...` pointing at a profile inside `workdir`.
///
/// Processes sharing a profile hand jobs to each other or fail on its lock.
fn soffice_profile_arg(workdir: &Path) -> String {
    let profile = workdir.join(SOFFICE_PROFILE_DIR);
    let profile = std::path::absolute(&profile).unwrap_or(profile);
    let encoded = profile
        .to_string_lossy()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    let separator = if encoded.starts_with('/') { "" } else { "/" };
    format!("-env:UserInstallation=file://{separator}{encoded}")
}

async fn run_checked(runner: &dyn CommandRunner, spec: ProcessSpec) -> Result<(), ConvertError> {
    let output = runner.run(&spec).await.map_err(|e| {
        tracing::error!(command = %spec.display(), "Conversion process failed to run: {e:#}");
        ConvertError::Backend(format!("{e:#}"))
    })?;

    if !output.success {
        let stderr = truncate_with_ellipsis(output.stderr.trim(), STDERR_PREVIEW_CHARS);
        tracing::warn!(
            command = %spec.display(),
            code = ?output.code,
            "Conversion process exited unsuccessfully"
        );
        return Err(ConvertError::Backend(format!(
            "{} exited with {}: {stderr}",
            spec.program,
            output
                .code
                .map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
        )));
    }
    Ok(())
}

async fn read_output(path: &Path, program: &str) -> Result<Vec<u8>, ConvertError> {
    tokio::fs::read(path).await.map_err(|_| {
        ConvertError::Backend(format!(
            "{program} reported success but produced no {}",
            path.file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
        ))
    })
}

/// `soffice --headless --convert-to <target> --outdir <workdir> <input>`, with
/// a private user profile under `workdir`.
///
/// LibreOffice names the result after the input stem.
pub async fn soffice(
    runner: &dyn CommandRunner,
    config: &ConvertConfig,
    workdir: &Path,
    input: &Path,
    target: Format,
) -> Result<Vec<u8>, ConvertError> {
    let spec = ProcessSpec::new(
        &config.soffice_bin,
        workdir,
        Duration::from_secs(config.process_timeout_secs),
    )
    .arg(soffice_profile_arg(workdir))
    .arg("--headless")
    .arg("--norestore")
    .arg("--convert-to")
    .arg(soffice_target(target))
    .arg("--outdir")
    .path_arg(workdir)
    .path_arg(input);

    run_checked(runner, spec).await?;
    read_output(&soffice_output_path(workdir, input, target), &config.soffice_bin).await
}

fn soffice_output_path(workdir: &Path, input: &Path, target: Format) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "input".into(), |s| s.to_string_lossy().into_owned());
    workdir.join(format!("{stem}.{}", target.extension()))
}

/// First page of a PDF as JPEG or PNG via `pdftoppm -singlefile`.
pub async fn pdftoppm(
    runner: &dyn CommandRunner,
    config: &ConvertConfig,
    workdir: &Path,
    input: &Path,
    target: Format,
) -> Result<Vec<u8>, ConvertError> {
    let (flag, ext) = match target {
        Format::Jpg | Format::Jpeg => ("-jpeg", "jpg"),
        Format::Png => ("-png", "png"),
        other => {
            return Err(ConvertError::Backend(format!(
                "pdftoppm cannot produce {other}"
            )))
        }
    };

    let out_base = workdir.join(RASTER_BASENAME);
    let spec = ProcessSpec::new(
        &config.pdftoppm_bin,
        workdir,
        Duration::from_secs(config.process_timeout_secs),
    )
    .arg(flag)
    .arg("-singlefile")
    .arg("-r")
    .arg(RASTER_DPI)
    .path_arg(input)
    .path_arg(&out_base);

    run_checked(runner, spec).await?;
    read_output(&workdir.join(format!("{RASTER_BASENAME}.{ext}")), &config.pdftoppm_bin).await
}
