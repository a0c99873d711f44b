use std::sync::Arc;

use ksk_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), ksk_core::Error> {
    ksk_core::logging::init("ksk")?;

    let cfg = Arc::new(Config::load()?);

    ksk_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| ksk_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
