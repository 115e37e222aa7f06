use anyhow::Result;
use proctor_session::utils::logging;
use proctor_session::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let report = App::initialize(config).await?.run().await?;

    if let Some(payload) = &report.payload {
        println!("{}", serde_json::to_string_pretty(payload)?);
    }

    Ok(())
}
