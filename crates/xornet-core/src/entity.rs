//! Entity types mirrored from the backend.
//!
//! These are **transport-agnostic** values:
//! - [`User`]: an account, including the logged-in one.
//! - [`Machine`]: a reporting host, with its static descriptor and the
//!   most recent dynamic telemetry snapshot.
//!
//! Fields the client does not model explicitly are kept in `extra` so a
//! newer backend never loses data on the way through the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ids::EntityId;

/// Counters the reporter may send as `1234` or `1234.0`; fractions are
/// truncated and negatives clamp to zero.
fn whole<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    f64::deserialize(deserializer).map(|n| n as u64)
}

fn whole_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<f64>::deserialize(deserializer).map(|n| n.map(|n| n as u64))
}

/// Anything the [`EntityStore`](crate::store::EntityStore) can hold.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> &EntityId;
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub uuid: EntityId,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Avatar URL, if the user uploaded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(default)]
    pub is_admin: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for User {
    fn id(&self) -> &EntityId {
        &self.uuid
    }
}

/// Memory usage, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ram {
    #[serde(default, deserialize_with = "whole")]
    pub total: u64,
    #[serde(default, deserialize_with = "whole")]
    pub used: u64,
}

impl Ram {
    /// Used memory as a percentage of total; `None` when total is unknown.
    pub fn usage_percent(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.used as f64 / self.total as f64 * 100.0)
        }
    }
}

/// GPU snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gpu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_usage: Option<f64>,
}

/// One dynamic telemetry snapshot, as pushed by the reporter.
///
/// Column abbreviations follow the backend:
/// - `cau`: average CPU usage (%)
/// - `cas`: average CPU speed (MHz)
/// - `td` / `tu`: total download / upload (Mbps)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineDynamicData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cau: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cas: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<Ram>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Gpu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub td: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tu: Option<f64>,
    #[serde(
        default,
        deserialize_with = "whole_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub process_count: Option<u64>,
    /// Milliseconds.
    #[serde(
        default,
        deserialize_with = "whole_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub host_uptime: Option<u64>,
    /// Milliseconds.
    #[serde(
        default,
        deserialize_with = "whole_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub reporter_uptime: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,

    /// Everything else the reporter sends (network interfaces, disks,
    /// temperatures, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MachineDynamicData {
    /// Look up a field the struct does not model explicitly.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

/// A reporting machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub uuid: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_uuid: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,

    /// Latest telemetry; `None` until the first `machineData` is applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_data: Option<MachineDynamicData>,

    /// Local time the last telemetry snapshot was applied.
    #[serde(skip)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Machine {
    /// A machine we have only heard about through telemetry so far.
    pub fn placeholder(uuid: EntityId) -> Self {
        Machine {
            uuid,
            owner_uuid: None,
            name: None,
            hostname: None,
            os_name: None,
            dynamic_data: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Replace the telemetry snapshot with `data`.
    pub fn apply_dynamic(&mut self, data: MachineDynamicData, at: DateTime<Utc>) {
        self.dynamic_data = Some(data);
        self.updated_at = Some(at);
    }

    /// Best human-readable label: name, then hostname, then uuid.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.hostname.as_deref())
            .unwrap_or(self.uuid.as_str())
    }
}

impl Entity for Machine {
    fn id(&self) -> &EntityId {
        &self.uuid
    }
}
