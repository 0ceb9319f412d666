use anyhow::{Context, Result};
use skycast_core::Config;
use skycast_services::AppServices;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, validation) = Config::load_validated().context("Failed to load configuration")?;

    skycast_core::init(&config.logging.level)?;

    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let mut services = AppServices::open(&config)?;
    services.initialize().await?;

    tracing::info!("SkyCast started");

    let refreshed = if config.weather.is_configured() {
        services.refresh_current_all().await
    } else {
        0
    };

    println!("SkyCast - Weather for your saved places");
    println!("\nConfiguration:");
    println!("  Database: {}", config.database_path().display());
    println!("  Units: {}", config.weather.units.as_query());
    println!("\nSaved locations ({}):", services.registry().len());
    for location in services.registry().locations() {
        let reading = location
            .id
            .and_then(|id| services.weather().current(id))
            .map(|report| format!("{:.1}°", report.current.temp))
            .unwrap_or_else(|| "no data".to_string());
        println!("  {} - {}", location.display_name(), reading);
    }

    tracing::info!(
        "Refreshed {} of {} locations",
        refreshed,
        services.registry().len()
    );

    Ok(())
}
