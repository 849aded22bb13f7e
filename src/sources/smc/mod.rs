//! System Management Controller access
//!
//! [`SmcClient`] speaks the AppleSMC key protocol over any [`SmcTransport`]:
//! a key-info request learns the value's size and type tag, a read-bytes
//! request fetches the payload, and [`decode`] turns it into a number.
//! Every failure is `None`.

mod decode;
mod ffi;
mod names;
mod scan;

use std::borrow::Cow;

use once_cell::sync::OnceCell;

pub use decode::{decode, FourCc};
pub use ffi::{SmcKeyData, SmcKeyInfo};
#[cfg(target_os = "macos")]
pub use ffi::IoKitSmcTransport;
pub use names::friendly_name;
pub use scan::scan;

use crate::provider::{SensorProvider, SensorReadings};

#[cfg(test)]
use mockall::automock;

/// User-client method index of the SMC handler
pub const KERNEL_INDEX_SMC: u32 = 2;
/// Tried when the primary index is rejected
pub const KERNEL_INDEX_SMC_FALLBACK: u32 = 5;
pub const SMC_CMD_READ_BYTES: u8 = 5;
pub const SMC_CMD_READ_KEYINFO: u8 = 9;

const SELECTORS: [u32; 2] = [KERNEL_INDEX_SMC, KERNEL_INDEX_SMC_FALLBACK];

pub const MISS_STREAK_LIMIT: usize = 4;
pub const CPU_CORE_CEILING: usize = 64;
pub const GPU_CLUSTER_CEILING: usize = 32;
pub const FAN_CEILING: usize = 8;

/// Indexed key families probed during discovery: prefix, suffix, ceiling
const INDEXED_KEYS: [(&str, &str, usize); 4] = [
    ("TC", "E", CPU_CORE_CEILING),
    ("TC", "P", CPU_CORE_CEILING),
    ("TG", "P", GPU_CLUSTER_CEILING),
    ("F", "Ac", FAN_CEILING),
];

/// Keys without an index family, probed once each
const WELL_KNOWN_KEYS: [&str; 8] = ["TA0P", "TB0T", "TB1T", "TC0D", "TG0D", "Th0H", "Tm0P", "Ts0P"];

/// One request/reply exchange with the SMC
#[cfg_attr(test, automock)]
pub trait SmcTransport: Send + Sync {
    fn call(&self, selector: u32, input: &SmcKeyData) -> Option<SmcKeyData>;
}

pub struct SmcClient {
    transport: Box<dyn SmcTransport>,
}

impl SmcClient {
    pub fn new(transport: Box<dyn SmcTransport>) -> Self {
        Self { transport }
    }

    /// Connect to the AppleSMC service
    #[cfg(target_os = "macos")]
    pub fn open() -> Option<Self> {
        match IoKitSmcTransport::open() {
            Ok(transport) => Some(Self::new(Box::new(transport))),
            Err(e) => {
                tracing::debug!(error = %e, "SMC unavailable");
                None
            },
        }
    }

    #[cfg(not(target_os = "macos"))]
    pub fn open() -> Option<Self> {
        None
    }

    /// Read and decode one key, trying each method index in turn
    pub fn read_key(&self, key: &str) -> Option<f64> {
        let code = FourCc::from_key(key)?;
        SELECTORS.iter().find_map(|&selector| self.read_with(selector, code))
    }

    fn read_with(&self, selector: u32, code: FourCc) -> Option<f64> {
        let info_request = SmcKeyData { key: code.as_u32(), data8: SMC_CMD_READ_KEYINFO, ..Default::default() };
        let info = self.transport.call(selector, &info_request)?;
        if info.result != 0 {
            return None;
        }

        let size = info.key_info.data_size as usize;
        let bytes_request = SmcKeyData {
            key: code.as_u32(),
            key_info: info.key_info,
            data8: SMC_CMD_READ_BYTES,
            ..Default::default()
        };
        let reply = self.transport.call(selector, &bytes_request)?;
        if reply.result != 0 {
            return None;
        }

        let tag = FourCc::from_u32(info.key_info.data_type).to_bytes();
        let value = decode(tag, reply.bytes.get(..size)?);
        if value.is_none() {
            tracing::trace!(key = %code, tag = %String::from_utf8_lossy(&tag), "unsupported SMC type");
        }
        value
    }

    /// Find the keys this machine answers.
    ///
    /// Core, cluster and fan counts differ per model, so indexed families are
    /// scanned until a run of misses instead of being hardcoded.
    pub fn discover(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for (prefix, suffix, ceiling) in INDEXED_KEYS {
            let hits = scan(0, ceiling, MISS_STREAK_LIMIT, |i| {
                self.read_key(&format!("{prefix}{i}{suffix}")).is_some()
            });
            keys.extend(hits.into_iter().map(|i| format!("{prefix}{i}{suffix}")));
        }
        for key in WELL_KNOWN_KEYS {
            if !keys.iter().any(|k| k == key) && self.read_key(key).is_some() {
                keys.push(key.to_string());
            }
        }
        tracing::debug!(count = keys.len(), "discovered SMC keys");
        keys
    }
}

/// Raw SMC readings keyed by SMC key
pub struct SmcSensorSource {
    client: SmcClient,
    keys: OnceCell<Vec<String>>,
}

impl SmcSensorSource {
    pub fn new(client: SmcClient) -> Self {
        Self { client, keys: OnceCell::new() }
    }

    /// Probe a fixed key list instead of discovering
    pub fn with_keys(client: SmcClient, keys: Vec<String>) -> Self {
        Self { client, keys: OnceCell::with_value(keys) }
    }

    pub fn open() -> Option<Self> {
        SmcClient::open().map(Self::new)
    }

    /// Discovered keys. An empty discovery is not kept, so the next read
    /// discovers again.
    pub fn keys(&self) -> Cow<'_, [String]> {
        if let Some(keys) = self.keys.get() {
            return Cow::Borrowed(keys);
        }
        let found = self.client.discover();
        if found.is_empty() {
            return Cow::Owned(found);
        }
        Cow::Borrowed(self.keys.get_or_init(|| found))
    }
}

impl SensorProvider for SmcSensorSource {
    fn name(&self) -> &'static str {
        "smc"
    }

    fn read(&self) -> Option<SensorReadings> {
        let readings: SensorReadings =
            self.keys().iter().filter_map(|key| self.client.read_key(key).map(|v| (key.clone(), v))).collect();
        (!readings.is_empty()).then_some(readings)
    }
}
