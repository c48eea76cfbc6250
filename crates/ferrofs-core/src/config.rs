//! Default node configuration.
//!
//! [`Config::init`] produces the configuration written when a node is first
//! provisioned. Apart from the [`Identity`], every field is a fixed default.
//! Field names follow the persisted JSON layout.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::bootstrap::{bootstrap_peer_strings, default_bootstrap_peers};
use crate::error::Result;
use crate::identity::Identity;

/// Default connection manager 'low water' mark.
pub const DEFAULT_CONN_MGR_LOW_WATER: u32 = 600;

/// Default connection manager 'high water' mark.
pub const DEFAULT_CONN_MGR_HIGH_WATER: u32 = 900;

/// Default connection manager grace period.
pub const DEFAULT_CONN_MGR_GRACE_PERIOD: Duration = Duration::from_secs(20);

/// Complete configuration of a storage node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Node identity: peer ID and stored private key
    pub identity: Identity,

    /// Block and metadata storage layout
    pub datastore: Datastore,

    /// Listen and announce addresses
    pub addresses: Addresses,

    /// FUSE mount points
    pub mounts: Mounts,

    /// Local peer discovery
    pub discovery: Discovery,

    /// Content routing
    pub routing: Routing,

    /// Name resolution settings
    pub ipns: Ipns,

    /// Bootstrap peer multiaddrs, each ending in `/p2p/<peer id>`
    pub bootstrap: Vec<String>,

    /// HTTP gateway
    pub gateway: Gateway,

    /// HTTP API
    #[serde(rename = "API")]
    pub api: Api,

    /// Swarm connection management
    pub swarm: SwarmConfig,

    /// Periodic re-announcement of stored content
    pub reprovider: Reprovider,
}

/// HTTP header table, `name -> values`.
pub type HttpHeaders = BTreeMap<String, Vec<String>>;

/// HTTP API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Api {
    /// Extra headers added to every API response
    #[serde(rename = "HTTPHeaders")]
    pub http_headers: HttpHeaders,
}

/// Listen and announce addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Addresses {
    /// Addresses the swarm listens on
    pub swarm: Vec<String>,

    /// Addresses announced to peers instead of the listen addresses
    pub announce: Vec<String>,

    /// Addresses never announced to peers
    pub no_announce: Vec<String>,

    /// Address the HTTP API binds to
    #[serde(rename = "API")]
    pub api: Vec<String>,

    /// Address the HTTP gateway binds to
    pub gateway: Vec<String>,
}

/// Datastore limits and the mount layout spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datastore {
    /// Storage size limit, e.g. `10GB`
    #[serde(rename = "StorageMax")]
    pub storage_max: String,

    /// Percentage of `StorageMax` that triggers garbage collection
    #[serde(rename = "StorageGCWatermark")]
    pub storage_gc_watermark: i64,

    /// Interval between garbage collection runs
    #[serde(rename = "GCPeriod")]
    pub gc_period: String,

    /// Datastore mount tree, passed through to the storage layer as-is
    #[serde(rename = "Spec")]
    pub spec: Value,

    /// Bloom filter size in bytes, 0 disables it
    #[serde(rename = "BloomFilterSize")]
    pub bloom_filter_size: u64,
}

/// FUSE mount points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mounts {
    /// Mount point for immutable content
    #[serde(rename = "IPFS")]
    pub ipfs: String,

    /// Mount point for named content
    #[serde(rename = "IPNS")]
    pub ipns: String,
}

/// Peer discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    /// Multicast DNS discovery on the local network
    #[serde(rename = "MDNS")]
    pub mdns: Mdns,
}

/// Multicast DNS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mdns {
    /// Whether mDNS discovery runs
    pub enabled: bool,

    /// Seconds between announcements
    pub interval: u64,
}

/// Content routing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Routing {
    /// Routing mode, e.g. `dht`
    #[serde(rename = "Type")]
    pub kind: String,
}

/// Name resolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ipns {
    /// Number of resolved names kept in memory
    pub resolve_cache_size: u32,
}

/// HTTP gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Gateway {
    /// Path `/` redirects to, empty for none
    pub root_redirect: String,

    /// Whether the gateway accepts writes
    pub writable: bool,

    /// Serve only locally stored content
    pub no_fetch: bool,

    /// Path prefixes the gateway is also served under
    pub path_prefixes: Vec<String>,

    /// Headers added to every gateway response
    #[serde(rename = "HTTPHeaders")]
    pub http_headers: HttpHeaders,

    /// API commands exposed through the gateway
    #[serde(rename = "APICommands")]
    pub api_commands: Vec<String>,
}

/// Content re-announcement configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reprovider {
    /// Interval between re-announcements, e.g. `12h`
    pub interval: String,

    /// Which content is re-announced, e.g. `all`
    pub strategy: String,
}

/// Swarm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmConfig {
    /// Connection manager watermarks
    pub conn_mgr: ConnMgr,
}

/// Connection manager watermarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnMgr {
    /// Connection manager implementation, e.g. `basic`
    #[serde(rename = "Type")]
    pub kind: String,

    /// Connection count trimming stops at
    pub low_water: u32,

    /// Connection count trimming starts at
    pub high_water: u32,

    /// Duration string such as `"20s"` during which new connections are kept
    pub grace_period: String,
}

impl Config {
    /// Provisions a node identity and builds the default configuration
    /// around it.
    pub fn init<W: Write + ?Sized>(
        out: &mut W,
        bits: usize,
        key_type: &str,
        import_key: &str,
    ) -> Result<Self> {
        let identity = Identity::provision(out, key_type, bits, import_key)?;
        Self::with_identity(identity)
    }

    /// Builds the default configuration carrying `identity` unmodified.
    pub fn with_identity(identity: Identity) -> Result<Self> {
        let bootstrap = bootstrap_peer_strings(&default_bootstrap_peers()?);

        Ok(Self {
            identity,
            datastore: default_datastore_config(),
            addresses: addresses_config(),
            mounts: Mounts {
                ipfs: "/btfs".to_string(),
                ipns: "/btns".to_string(),
            },
            discovery: Discovery {
                mdns: Mdns { enabled: true, interval: 10 },
            },
            routing: Routing { kind: "dht".to_string() },
            ipns: Ipns { resolve_cache_size: 128 },
            bootstrap,
            gateway: Gateway {
                root_redirect: String::new(),
                writable: false,
                no_fetch: false,
                path_prefixes: Vec::new(),
                http_headers: gateway_headers(),
                api_commands: Vec::new(),
            },
            api: Api { http_headers: HttpHeaders::new() },
            swarm: SwarmConfig {
                conn_mgr: ConnMgr {
                    kind: "basic".to_string(),
                    low_water: DEFAULT_CONN_MGR_LOW_WATER,
                    high_water: DEFAULT_CONN_MGR_HIGH_WATER,
                    grace_period: format_duration(DEFAULT_CONN_MGR_GRACE_PERIOD),
                },
            },
            reprovider: Reprovider {
                interval: "12h".to_string(),
                strategy: "all".to_string(),
            },
        })
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        debug!("Loaded node configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_json(file)?;
        debug!("Saved node configuration to {}", path.as_ref().display());
        Ok(())
    }

    /// Write configuration as pretty-printed JSON
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

fn addresses_config() -> Addresses {
    Addresses {
        swarm: vec![
            "/ip4/0.0.0.0/tcp/4001".to_string(),
            "/ip6/::/tcp/4001".to_string(),
        ],
        announce: Vec::new(),
        no_announce: Vec::new(),
        api: vec!["/ip4/127.0.0.1/tcp/5001".to_string()],
        gateway: vec!["/ip4/127.0.0.1/tcp/8080".to_string()],
    }
}

/// Default datastore: flatfs for blocks, leveldb for everything else.
pub fn default_datastore_config() -> Datastore {
    Datastore {
        storage_max: "10GB".to_string(),
        storage_gc_watermark: 90,
        gc_period: "1h".to_string(),
        bloom_filter_size: 0,
        spec: json!({
            "type": "mount",
            "mounts": [
                {
                    "mountpoint": "/blocks",
                    "type": "measure",
                    "prefix": "flatfs.datastore",
                    "child": {
                        "type": "flatfs",
                        "path": "blocks",
                        "sync": true,
                        "shardFunc": "/repo/flatfs/shard/v1/next-to-last/2"
                    }
                },
                {
                    "mountpoint": "/",
                    "type": "measure",
                    "prefix": "leveldb.datastore",
                    "child": {
                        "type": "levelds",
                        "path": "datastore",
                        "compression": "none"
                    }
                }
            ]
        }),
    }
}

fn header(name: &str, values: &[&str]) -> (String, Vec<String>) {
    (name.to_string(), values.iter().map(|v| v.to_string()).collect())
}

fn gateway_headers() -> HttpHeaders {
    HttpHeaders::from([
        header("Access-Control-Allow-Origin", &["*"]),
        header("Access-Control-Allow-Methods", &["GET"]),
        header("Access-Control-Allow-Headers", &["X-Requested-With", "Range", "User-Agent"]),
    ])
}

/// Formats a duration the way the persisted configuration expects it,
/// e.g. `20s`, `1m30s`, `1h0m0s`, `250ms`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        return match duration.subsec_millis() {
            0 => "0s".to_string(),
            millis => format!("{millis}ms"),
        };
    }

    let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
