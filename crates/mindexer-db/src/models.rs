use crate::schema::{known_devices, plugin_settings};
use diesel::prelude::*;

#[derive(Debug, Queryable)]
#[diesel(table_name = known_devices)]
pub struct KnownDeviceRow {
  pub uri: String,
  pub plugin_prefix: String,
  pub uuid: String,
  pub name: String,
  pub description: String,
  pub icon: String,
  pub enabled: bool,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = known_devices)]
pub struct NewKnownDeviceRow {
  pub uri: String,
  pub plugin_prefix: String,
  pub uuid: String,
  pub name: String,
  pub description: String,
  pub icon: String,
  pub enabled: bool,
}

#[derive(Debug, Queryable)]
#[diesel(table_name = plugin_settings)]
pub struct PluginSettingRow {
  pub plugin_prefix: String,
  pub enabled: bool,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = plugin_settings)]
pub struct NewPluginSettingRow {
  pub plugin_prefix: String,
  pub enabled: bool,
}
