use matchstats_service::common::init;
use matchstats_service::settings::AppSettings;
use matchstats_service::workers::{crons, daemons};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = AppSettings::get();
    init::initialize_logging(&settings);
    match settings.app_component.as_str() {
        "ingest" => daemons::log_watcher::serve(settings).await,
        "replay" => crons::log_replay::serve(settings).await,
        component => anyhow::bail!("Unknown app component: {component}"),
    }
}
