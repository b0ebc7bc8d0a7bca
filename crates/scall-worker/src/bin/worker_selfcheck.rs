use std::path::Path;

use scall_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_ffmpeg()?;
    ensure_env_present(&[
        "DATABASE_URL",
        "STORAGE_ENDPOINT_URL",
        "STORAGE_BUCKET",
        "MAILER_API_URL",
    ])?;
    ensure_render_engine()?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    scall_media::check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    scall_media::check_ffprobe().map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}

fn ensure_render_engine() -> anyhow::Result<()> {
    let mode = std::env::var("RENDER_MODE").unwrap_or_else(|_| "local".to_string());
    if mode == "serverless" {
        if std::env::var("RENDER_SERVICE_URL").is_err() {
            return Err(anyhow::anyhow!("RENDER_MODE=serverless but RENDER_SERVICE_URL unset"));
        }
        return Ok(());
    }

    let engine_bin =
        std::env::var("RENDER_ENGINE_BIN").unwrap_or_else(|_| "santacall-renderer".to_string());
    which::which(&engine_bin)
        .map_err(|_| anyhow::anyhow!("render engine binary '{}' not in PATH", engine_bin))?;
    Ok(())
}
