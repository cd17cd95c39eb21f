use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use menu_allergen_scan::{logger, App, Config, ProgressObserver};

/// 把进度打到日志的观察者
struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, percent: u8) {
        info!("📊 分析进度: {}%", percent);
    }

    fn on_analyzing(&self, analyzing: bool) {
        if analyzing {
            info!("⏳ 开始分析...");
        } else {
            info!("⏹️ 分析结束");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置：配置文件打底，环境变量覆盖
    let config = match std::env::var("MENU_SCAN_CONFIG") {
        Ok(path) => Config::from_file(&path)?.with_env_overrides(),
        Err(_) => Config::from_env(),
    };

    let image_path = std::env::args()
        .nth(1)
        .context("用法: menu_allergen_scan <菜单照片路径>")?;

    let app = App::new(config);
    let run = app.analyze_photo(Path::new(&image_path), &LogProgress).await?;

    info!(
        "✅ 完成: {} 道菜品，{} 条分析结果",
        run.dishes.len(),
        run.results.len()
    );

    Ok(())
}
