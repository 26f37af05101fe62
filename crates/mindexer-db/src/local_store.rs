use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use mindexer_core::CoreError;
use std::path::Path;

use crate::models::{KnownDeviceRow, NewKnownDeviceRow, NewPluginSettingRow, PluginSettingRow};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Local SQLite-backed persistence for the handful of small tables the
/// external document database has no business owning: which devices have
/// been seen before (so their display metadata survives a restart even
/// while the device is unplugged), and which plugins are enabled.
#[derive(Clone)]
pub struct LocalStore {
  pool: SqlitePool,
}

impl LocalStore {
  pub fn new(db_path: &Path, journal_mode: &str) -> Result<Self, CoreError> {
    let db_path_str = db_path.to_str().ok_or_else(|| CoreError::Db("invalid db path".into()))?;
    let manager = ConnectionManager::<SqliteConnection>::new(db_path_str);

    let pool = r2d2::Pool::builder()
      .test_on_check_out(true)
      .build(manager)
      .map_err(|e| CoreError::Db(format!("pool error: {e}")))?;

    let mut conn = pool.get().map_err(|e| CoreError::Db(e.to_string()))?;

    diesel::sql_query(format!("PRAGMA journal_mode = {journal_mode}"))
      .execute(&mut conn)
      .map_err(|e| CoreError::Db(format!("journal mode error: {e}")))?;

    conn.run_pending_migrations(MIGRATIONS).map_err(|e| CoreError::Db(format!("migration error: {e}")))?;

    Ok(Self { pool })
  }

  fn get_conn(&self) -> Result<r2d2::PooledConnection<ConnectionManager<SqliteConnection>>, CoreError> {
    self.pool.get().map_err(|e| CoreError::Db(format!("connection error: {e}")))
  }

  pub fn upsert_known_device(&self, row: NewKnownDeviceRow) -> Result<(), CoreError> {
    use crate::schema::known_devices::dsl::*;

    let mut conn = self.get_conn()?;
    diesel::insert_into(known_devices)
      .values(&row)
      .on_conflict(uri)
      .do_update()
      .set(&row)
      .execute(&mut conn)
      .map_err(|e| CoreError::Db(e.to_string()))?;

    Ok(())
  }

  /// Every known device for a plugin, most recently used for injecting
  /// previously-seen devices back into a plugin at startup.
  pub fn known_devices_for_prefix(&self, prefix: &str) -> Result<Vec<KnownDeviceRow>, CoreError> {
    use crate::schema::known_devices::dsl::*;

    let mut conn = self.get_conn()?;
    known_devices
      .filter(plugin_prefix.eq(prefix))
      .load::<KnownDeviceRow>(&mut conn)
      .map_err(|e| CoreError::Db(e.to_string()))
  }

  pub fn set_plugin_enabled(&self, prefix: &str, is_enabled: bool) -> Result<(), CoreError> {
    use crate::schema::plugin_settings::dsl::*;

    let row = NewPluginSettingRow { plugin_prefix: prefix.to_string(), enabled: is_enabled };
    let mut conn = self.get_conn()?;

    diesel::insert_into(plugin_settings)
      .values(&row)
      .on_conflict(plugin_prefix)
      .do_update()
      .set(&row)
      .execute(&mut conn)
      .map_err(|e| CoreError::Db(e.to_string()))?;

    Ok(())
  }

  /// Any plugin is eligible to be queried here — there is no hardcoded
  /// subset of plugin kinds the settings table only applies to.
  pub fn plugin_enabled(&self, prefix: &str) -> Result<bool, CoreError> {
    use crate::schema::plugin_settings::dsl::*;
    use diesel::OptionalExtension;

    let mut conn = self.get_conn()?;
    let row = plugin_settings
      .filter(plugin_prefix.eq(prefix))
      .first::<PluginSettingRow>(&mut conn)
      .optional()
      .map_err(|e| CoreError::Db(e.to_string()))?;

    Ok(row.map(|r| r.enabled).unwrap_or(true))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upsert_then_lookup_known_device() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::new(&tmp.path().join("test.sqlite"), "WAL").unwrap();

    store
      .upsert_known_device(NewKnownDeviceRow {
        uri: "msc:///uuid-1".into(),
        plugin_prefix: "msc".into(),
        uuid: "uuid-1".into(),
        name: "Thumb Drive".into(),
        description: "".into(),
        icon: "".into(),
        enabled: true,
      })
      .unwrap();

    let rows = store.known_devices_for_prefix("msc").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Thumb Drive");
  }

  #[test]
  fn plugin_enabled_defaults_to_true_when_unset() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::new(&tmp.path().join("test.sqlite"), "WAL").unwrap();
    assert!(store.plugin_enabled("upnp").unwrap());
  }

  #[test]
  fn plugin_enabled_reflects_explicit_setting() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::new(&tmp.path().join("test.sqlite"), "WAL").unwrap();
    store.set_plugin_enabled("upnp", false).unwrap();
    assert!(!store.plugin_enabled("upnp").unwrap());
  }
}
