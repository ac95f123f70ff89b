//! # 图片检查工具 — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与结果输出。
//! 业务逻辑位于 `image_store` 模块，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use image_inspector::error::AppError;
use image_inspector::image_store::{ImageInfo, ImageServiceState};
use image_inspector::settings::{self, AppSettings};

#[derive(Parser, Debug)]
#[command(name = "image-inspector", version, about = "加载、合成、降采样并导出多帧图片")]
struct Cli {
    /// 设置文件路径（JSON），缺失或损坏时使用默认设置
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 加载图片文件并输出元数据
    Inspect {
        files: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// 合成纯色图片
    Create {
        #[arg(long)]
        width: i64,
        #[arg(long)]
        height: i64,
        #[arg(long, default_value_t = 1)]
        frames: i64,
        #[arg(long, default_value = "#00000000")]
        color: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// 输出当前生效的设置
    Settings {
        /// 将默认设置写入 `--settings` 指定的路径
        #[arg(long, default_value_t = false)]
        init: bool,
    },
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// 降采样系数，(0, 1) 之外的值不生效
    #[arg(long)]
    downscale: Option<f64>,
    /// 缩放档位：quality / balanced / speed
    #[arg(long)]
    quality: Option<String>,
    /// 导出格式：png / jpeg / bmp / gif / tga / tiff
    #[arg(long, default_value = "png")]
    format: String,
    /// 导出目录，指定后每一帧写成 `{id}_{frame}.{ext}`
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let app_settings = match cli.settings.as_deref() {
        Some(path) => settings::load_settings_from_path(path),
        None => AppSettings::default(),
    };

    if let Command::Settings { init } = &cli.command {
        if *init {
            let path = cli
                .settings
                .as_deref()
                .ok_or_else(|| AppError::Settings("--init 需要同时指定 --settings".to_string()))?;
            settings::save_settings_to_path(path, &app_settings)?;
            log::info!("💾 设置已写入 {}", path.display());
        }
        print_json(&app_settings)?;
        return Ok(());
    }

    let service = ImageServiceState::with_config(app_settings.to_store_config()?);

    match cli.command {
        Command::Inspect { files, output } => {
            for file in files {
                let info = service.load_file(file.to_string_lossy().to_string()).await?;
                finish(&service, info, &output).await?;
            }
        }
        Command::Create {
            width,
            height,
            frames,
            color,
            output,
        } => {
            let info = service.create(width, height, frames, &color).await?;
            finish(&service, info, &output).await?;
        }
        Command::Settings { .. } => {}
    }

    service.clear_all().await?;
    Ok(())
}

async fn finish(service: &ImageServiceState, info: ImageInfo, output: &OutputArgs) -> Result<(), AppError> {
    let id = info.id.to_string();

    if let Some(quality) = output.quality.as_deref() {
        service.set_resize_quality(quality)?;
    }

    let info = match output.downscale {
        Some(factor) => service.downscale(&id, factor).await?,
        None => info,
    };

    if let Some(dir) = output.out_dir.as_deref() {
        export_frames(service, &info, &output.format, dir).await?;
    }

    print_json(&info)
}

async fn export_frames(
    service: &ImageServiceState,
    info: &ImageInfo,
    format: &str,
    dir: &Path,
) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)?;

    let id = info.id.to_string();
    for frame_id in 0..info.frames_count {
        let download = service.download(&id, frame_id, format).await?;
        let path = dir.join(&download.file_name);
        std::fs::write(&path, &download.bytes)?;
        log::info!("📤 已导出 {} ({})", path.display(), download.content_type);
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
