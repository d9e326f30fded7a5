use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Storage medium a blob was admitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Memory,
    Disk,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Memory => write!(f, "memory"),
            Tier::Disk => write!(f, "disk"),
        }
    }
}

/// Where a blob's bytes live. Fixed at admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobLocation {
    /// Key into the in-memory content table.
    Memory { key: String },
    /// Backing file under the disk root.
    Disk { path: PathBuf },
}

impl BlobLocation {
    pub fn tier(&self) -> Tier {
        match self {
            BlobLocation::Memory { .. } => Tier::Memory,
            BlobLocation::Disk { .. } => Tier::Disk,
        }
    }
}

/// Metadata for one stored blob. Write-once: a record is replaced only by
/// removing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    pub id: String,
    pub display_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub location: BlobLocation,
    pub content_type: String,
}

impl BlobRecord {
    pub fn tier(&self) -> Tier {
        self.location.tier()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(location: BlobLocation) -> BlobRecord {
        let created_at = Utc::now();
        BlobRecord {
            id: "abc".to_string(),
            display_name: "a.txt".to_string(),
            size_bytes: 3,
            created_at,
            expires_at: created_at + Duration::seconds(10),
            location,
            content_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn test_tier_follows_location() {
        let mem = record(BlobLocation::Memory {
            key: "abc".to_string(),
        });
        assert_eq!(mem.tier(), Tier::Memory);

        let disk = record(BlobLocation::Disk {
            path: PathBuf::from("/tmp/abc.blob"),
        });
        assert_eq!(disk.tier(), Tier::Disk);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let r = record(BlobLocation::Memory {
            key: "abc".to_string(),
        });
        assert!(!r.is_expired_at(r.expires_at - Duration::milliseconds(1)));
        assert!(r.is_expired_at(r.expires_at));
        assert!(r.is_expired_at(r.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Memory.to_string(), "memory");
        assert_eq!(Tier::Disk.to_string(), "disk");
    }
}
