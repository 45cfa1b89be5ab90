use async_trait::async_trait;
use libsql::{Connection, Row, params};
use uuid::Uuid;

use super::StoreError;
use super::models::{Device, DeviceStatus, NewDevice, StatusUpdate, i64_to_timestamp, timestamp_to_i64};
use crate::pool::{LibsqlManager, LibsqlPool};

const DEVICE_COLUMNS: &str =
    "id, name, ip, device_type, location, status, created_at, last_checked";

/// Device store operations used by the refresh cycle and the HTTP adapters
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Every stored device, oldest first
    async fn list_all(&self) -> Result<Vec<Device>, StoreError>;

    /// Get a device by id
    async fn get(&self, id: &str) -> Result<Option<Device>, StoreError>;

    /// Apply all updates as one unit. Nothing is written if any update fails.
    async fn batch_update_status(&self, updates: &[StatusUpdate]) -> Result<(), StoreError>;

    /// Insert a new device and return the id the store assigned to it
    async fn insert(&self, device: &NewDevice) -> Result<String, StoreError>;
}

/// LibSQL device store
pub struct LibsqlDeviceRepository {
    pool: LibsqlPool,
}

impl LibsqlDeviceRepository {
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, StoreError> {
        Ok(self.pool.get().await?)
    }

    fn device_from_row(row: &Row) -> Result<Device, StoreError> {
        let status: String = row.get(5)?;
        let created_at: i64 = row.get(6)?;
        let last_checked: Option<i64> = row.get(7)?;

        Ok(Device {
            id: row.get(0)?,
            name: row.get(1)?,
            ip: row.get(2)?,
            device_type: row.get(3)?,
            location: row.get(4)?,
            status: DeviceStatus::from_db(&status),
            created_at: i64_to_timestamp(created_at),
            last_checked: last_checked.map(i64_to_timestamp),
        })
    }

    async fn apply_updates(conn: &Connection, updates: &[StatusUpdate]) -> Result<(), StoreError> {
        for update in updates {
            // lastChecked never moves backwards, even if the host clock does
            let changed = conn
                .execute(
                    "UPDATE devices SET status = ?1, last_checked = MAX(COALESCE(last_checked, ?2), ?2) WHERE id = ?3",
                    params![
                        update.status.as_str(),
                        timestamp_to_i64(update.checked_at),
                        update.id.clone()
                    ],
                )
                .await?;

            if changed == 0 {
                return Err(StoreError::DeviceNotFound(update.id.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceRepository for LibsqlDeviceRepository {
    async fn list_all(&self) -> Result<Vec<Device>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {DEVICE_COLUMNS} FROM devices ORDER BY created_at, id"),
                (),
            )
            .await?;

        let mut devices = Vec::new();
        while let Some(row) = rows.next().await? {
            devices.push(Self::device_from_row(&row)?);
        }

        Ok(devices)
    }

    async fn get(&self, id: &str) -> Result<Option<Device>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"), params![id])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::device_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn batch_update_status(&self, updates: &[StatusUpdate]) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }

        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;

        match Self::apply_updates(&tx, updates).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!("Rollback of status batch failed: {rollback_error}");
                }
                Err(error)
            }
        }
    }

    async fn insert(&self, device: &NewDevice) -> Result<String, StoreError> {
        let conn = self.get_conn().await?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO devices (id, name, ip, device_type, location, status, created_at, last_checked) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id.clone(),
                device.name.clone(),
                device.ip.clone(),
                device.device_type.clone(),
                device.location.clone(),
                device.status.as_str(),
                timestamp_to_i64(device.created_at),
                device.last_checked.map(timestamp_to_i64)
            ],
        )
        .await?;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_test_pool, insert_raw_device};
    use anyhow::Result;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_insert_and_list() -> Result<()> {
        let (pool, _dir) = create_test_pool().await?;
        let repository = LibsqlDeviceRepository::new_from_pool(pool);

        assert!(repository.list_all().await?.is_empty());

        let first = NewDevice::new("Router".into(), "10.0.0.1".into(), None, None);
        let first_id = repository.insert(&first).await?;
        let second = NewDevice::new(
            "NAS".into(),
            "10.0.0.2".into(),
            Some("Storage".into()),
            Some("Rack 1".into()),
        );
        let second_id = repository.insert(&second).await?;
        assert_ne!(first_id, second_id);

        let devices = repository.list_all().await?;
        assert_eq!(devices.len(), 2);

        let stored = repository.get(&second_id).await?.expect("stored device");
        assert_eq!(stored.name, "NAS");
        assert_eq!(stored.ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(stored.device_type, "Storage");
        assert_eq!(stored.location, "Rack 1");
        assert_eq!(stored.status, DeviceStatus::Unknown);
        assert!(stored.last_checked.is_none());

        assert!(repository.get("missing").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_update_applies_all() -> Result<()> {
        let (pool, _dir) = create_test_pool().await?;
        let repository = LibsqlDeviceRepository::new_from_pool(pool);

        let a = repository.insert(&NewDevice::new("A".into(), "10.0.0.1".into(), None, None)).await?;
        let b = repository.insert(&NewDevice::new("B".into(), "10.0.0.2".into(), None, None)).await?;
        let checked_at = Utc::now();

        repository
            .batch_update_status(&[
                StatusUpdate { id: a.clone(), status: DeviceStatus::Online, checked_at },
                StatusUpdate { id: b.clone(), status: DeviceStatus::Offline, checked_at },
            ])
            .await?;

        let a = repository.get(&a).await?.expect("a");
        let b = repository.get(&b).await?.expect("b");
        assert_eq!(a.status, DeviceStatus::Online);
        assert_eq!(b.status, DeviceStatus::Offline);
        assert_eq!(a.last_checked.map(|t| t.timestamp_millis()), Some(checked_at.timestamp_millis()));
        assert_eq!(b.last_checked, a.last_checked);
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_update_is_all_or_nothing() -> Result<()> {
        let (pool, _dir) = create_test_pool().await?;
        let repository = LibsqlDeviceRepository::new_from_pool(pool);

        let known =
            repository.insert(&NewDevice::new("A".into(), "10.0.0.1".into(), None, None)).await?;
        let checked_at = Utc::now();

        let result = repository
            .batch_update_status(&[
                StatusUpdate { id: known.clone(), status: DeviceStatus::Online, checked_at },
                StatusUpdate { id: "ghost".into(), status: DeviceStatus::Offline, checked_at },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::DeviceNotFound(ref id)) if id == "ghost"));

        let device = repository.get(&known).await?.expect("device");
        assert_eq!(device.status, DeviceStatus::Unknown);
        assert!(device.last_checked.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_last_checked_never_decreases() -> Result<()> {
        let (pool, _dir) = create_test_pool().await?;
        let repository = LibsqlDeviceRepository::new_from_pool(pool);

        let id = repository.insert(&NewDevice::new("A".into(), "10.0.0.1".into(), None, None)).await?;
        let later = Utc::now();
        let earlier = later - Duration::minutes(5);

        repository
            .batch_update_status(&[StatusUpdate { id: id.clone(), status: DeviceStatus::Online, checked_at: later }])
            .await?;
        repository
            .batch_update_status(&[StatusUpdate { id: id.clone(), status: DeviceStatus::Offline, checked_at: earlier }])
            .await?;

        let device = repository.get(&id).await?.expect("device");
        assert_eq!(device.status, DeviceStatus::Offline);
        assert_eq!(device.last_checked.map(|t| t.timestamp_millis()), Some(later.timestamp_millis()));
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_rows_without_ip() -> Result<()> {
        let (pool, _dir) = create_test_pool().await?;
        insert_raw_device(&pool, "bare", "Switch", None).await?;
        let repository = LibsqlDeviceRepository::new_from_pool(pool);

        let devices = repository.list_all().await?;
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "bare");
        assert!(devices[0].ip.is_none());
        assert!(devices[0].probe_address().is_none());
        Ok(())
    }
}
