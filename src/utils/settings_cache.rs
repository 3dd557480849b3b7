use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::model::settings::AttendanceSettings;

/// Attendance settings are read on every check-in, so a short-TTL cache
/// fronts the settings table. Snapshots may lag an admin update by up to the
/// TTL; status determination makes no mid-day consistency guarantee.
static SETTINGS_CACHE: Lazy<Cache<(), AttendanceSettings>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(Duration::from_secs(30))
        .build()
});

/// Fetch the current settings snapshot, hitting the database on a cache miss.
pub async fn get(pool: &MySqlPool) -> Result<AttendanceSettings, sqlx::Error> {
    if let Some(settings) = SETTINGS_CACHE.get(&()).await {
        return Ok(settings);
    }

    let settings = AttendanceSettings::load(pool).await?;
    SETTINGS_CACHE.insert((), settings).await;
    Ok(settings)
}

/// Drop the cached snapshot after an administrative settings update.
pub async fn invalidate() {
    SETTINGS_CACHE.invalidate(&()).await;
}
