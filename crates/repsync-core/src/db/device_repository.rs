//! Server-side device registry

use crate::error::{Error, Result};
use libsql::{params, Connection, Value};

/// Device details sent with every push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub device_id: String,
    pub device_name: Option<String>,
    pub platform: Option<String>,
}

/// A registered device of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device_id: String,
    pub device_name: Option<String>,
    pub platform: Option<String>,
    pub first_seen_at: i64,
    pub last_seen_at: i64,
    /// Pull cursor the device reported on its latest push
    pub last_sync_at: Option<i64>,
}

/// Device registry scoped to one user
pub struct LibSqlDeviceRepository<'a> {
    conn: &'a Connection,
    user_id: &'a str,
}

impl<'a> LibSqlDeviceRepository<'a> {
    pub const fn new(conn: &'a Connection, user_id: &'a str) -> Self {
        Self { conn, user_id }
    }

    /// Insert or refresh a device; name and platform are kept when omitted.
    pub async fn register(&self, device: &DeviceRegistration, seen_at: i64) -> Result<()> {
        if device.device_id.trim().is_empty() {
            return Err(Error::InvalidInput("deviceId must not be empty".into()));
        }

        self.conn
            .execute(
                "INSERT INTO devices
                    (user_id, device_id, device_name, platform, first_seen_at, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(user_id, device_id) DO UPDATE SET
                    device_name = COALESCE(excluded.device_name, devices.device_name),
                    platform = COALESCE(excluded.platform, devices.platform),
                    last_seen_at = excluded.last_seen_at",
                params![
                    self.user_id,
                    device.device_id.as_str(),
                    optional_text(device.device_name.as_deref()),
                    optional_text(device.platform.as_deref()),
                    seen_at
                ],
            )
            .await?;
        Ok(())
    }

    /// Record the pull cursor a device has caught up to. Never moves back.
    pub async fn mark_synced(&self, device_id: &str, sync_time: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE devices SET last_sync_at = MAX(COALESCE(last_sync_at, ?3), ?3)
                 WHERE user_id = ?1 AND device_id = ?2",
                params![self.user_id, device_id, sync_time],
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, device_id: &str) -> Result<Option<DeviceRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT device_id, device_name, platform, first_seen_at, last_seen_at, last_sync_at
                 FROM devices WHERE user_id = ?1 AND device_id = ?2",
                params![self.user_id, device_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(DeviceRecord {
                device_id: row.get(0)?,
                device_name: row.get(1)?,
                platform: row.get(2)?,
                first_seen_at: row.get(3)?,
                last_seen_at: row.get(4)?,
                last_sync_at: row.get(5)?,
            })),
            None => Ok(None),
        }
    }
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |value| Value::Text(value.to_string()))
}
