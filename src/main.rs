use anyhow::Result;
use epl_etl::{Config, EtlContext};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let ctx = EtlContext::init(config)?;
    info!("Loaded configuration: {:?}", ctx.config);

    // One-shot mode (manual trigger)
    if ctx.config.run_once {
        info!("Running in one-shot mode (RUN_ONCE=true)");
        let outcome = ctx.pipeline().run().await;
        if let Err(e) = &outcome {
            error!("One-shot sync failed at {}: {}", e.stage, e.source);
        }
        ctx.shutdown();
        outcome?;
        return Ok(());
    }

    let mut scheduler = ctx.scheduler();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        _ = scheduler.run_forever(ctx.pipeline()) => {}
        _ = &mut ctrl_c => {
            info!("Received Ctrl-C");
        }
    }

    ctx.shutdown();
    Ok(())
}
