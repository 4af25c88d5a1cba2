//! Versioned snapshot persistence.
//!
//! The live session serializes into a [`SavedSnapshot`] after every
//! state-mutating action; resume parses the raw text into JSON, runs a
//! version migration, then rebuilds the state through the sanitizers.
//! Storage failures are swallowed: losing a save must never take the
//! run down with it.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::camp::ShopItem;
use crate::constants::{REWARD_DRAFT_SIZE, SNAPSHOT_VERSION};
use crate::encounter::Encounter;
use crate::profile::Profile;
use crate::relics::find_relic;
use crate::sanitize::{sanitize_encounter, sanitize_mode, sanitize_run};
use crate::state::{Mode, Run};

/// Envelope written to storage after state-mutating actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSnapshot {
    pub version: u32,
    /// Host-supplied wall clock, seconds since the Unix epoch.
    pub saved_at: i64,
    pub mode: Mode,
    pub run: Run,
    #[serde(default)]
    pub encounter: Option<Encounter>,
    #[serde(default)]
    pub reward_option_ids: Vec<String>,
    #[serde(default)]
    pub shop_stock: Vec<ShopItem>,
    #[serde(default)]
    pub selection_index: usize,
    #[serde(default)]
    pub announcement: String,
    #[serde(default)]
    pub announcement_timer: f32,
}

/// Lift an older snapshot to the current schema in place. Returns the
/// version the value claims after migration.
fn migrate(value: &mut Value) -> u32 {
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(1);
    if version >= SNAPSHOT_VERSION {
        return version;
    }
    if let Some(obj) = value.as_object_mut() {
        // v1 named the draft "reward_options" and had no announcement
        // countdown of its own.
        if let Some(options) = obj.remove("reward_options") {
            obj.entry("reward_option_ids").or_insert(options);
        }
        obj.entry("announcement_timer").or_insert(Value::from(0.0));
        obj.insert("version".to_string(), Value::from(SNAPSHOT_VERSION));
    }
    SNAPSHOT_VERSION
}

fn sanitize_reward_ids(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut ids: Vec<String> = Vec::new();
    for id in items.iter().filter_map(Value::as_str) {
        if find_relic(id).is_some() && !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
        if ids.len() == REWARD_DRAFT_SIZE {
            break;
        }
    }
    ids
}

fn sanitize_shop_stock(value: Option<&Value>) -> Vec<ShopItem> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value::<ShopItem>(item.clone()).ok())
        .filter(|item| match &item.kind {
            crate::camp::ShopItemKind::Relic { id } => find_relic(id).is_some(),
            _ => true,
        })
        .map(|mut item| {
            item.cost = item.cost.clamp(0, 9_999);
            item
        })
        .take(12)
        .collect()
}

/// Serialize a snapshot for storage.
///
/// # Errors
///
/// Returns an error if serialization fails, which only happens when a
/// float field holds a non-finite value.
pub fn encode_snapshot(snapshot: &SavedSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}

/// Parse and sanitize raw snapshot text. Any input that does not carry
/// a run object, or that claims a schema newer than this build, reads
/// as "no saved run".
#[must_use]
pub fn decode_snapshot(raw: &str) -> Option<SavedSnapshot> {
    let mut value: Value = serde_json::from_str(raw).ok()?;
    let version = migrate(&mut value);
    if version > SNAPSHOT_VERSION {
        log::warn!("discarding snapshot from a newer schema (v{version})");
        return None;
    }
    let run = sanitize_run(value.get("run")?)?.rehydrate();
    let encounter = value.get("encounter").and_then(sanitize_encounter);
    let reward_option_ids = sanitize_reward_ids(value.get("reward_option_ids"));
    let shop_stock = sanitize_shop_stock(value.get("shop_stock"));
    let mut mode = sanitize_mode(value.get("mode"));
    // A reward screen with nothing left to draft resumes as the shop.
    if mode == Mode::Reward && reward_option_ids.is_empty() {
        mode = Mode::Shop;
    }
    let selection_cap = shop_stock.len().max(reward_option_ids.len());
    let selection_index = value
        .get("selection_index")
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(0)
        .min(selection_cap.saturating_sub(1));
    let announcement = value
        .get("announcement")
        .and_then(Value::as_str)
        .map(|s| s.chars().take(200).collect())
        .unwrap_or_default();
    let announcement_timer = value
        .get("announcement_timer")
        .and_then(Value::as_f64)
        .filter(|t| t.is_finite())
        .map_or(0.0, |t| crate::numbers::clamp_f64_to_f32(t).clamp(0.0, 10.0));

    Some(SavedSnapshot {
        version: SNAPSHOT_VERSION,
        saved_at: value.get("saved_at").and_then(Value::as_i64).unwrap_or(0),
        mode,
        run,
        encounter,
        reward_option_ids,
        shop_stock,
        selection_index,
        announcement,
        announcement_timer,
    })
}

/// Storage abstraction supplied by the host platform. Implementations
/// move raw strings; all schema knowledge stays in this module.
pub trait SnapshotStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the raw snapshot text under a key, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the medium itself fails.
    fn read(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write raw snapshot text under a key.
    ///
    /// # Errors
    ///
    /// Returns an error when the medium itself fails.
    fn write(&mut self, key: &str, raw: &str) -> Result<(), Self::Error>;

    /// Remove a stored key.
    ///
    /// # Errors
    ///
    /// Returns an error when the medium itself fails.
    fn remove(&mut self, key: &str) -> Result<(), Self::Error>;
}

pub const RUN_SAVE_KEY: &str = "shoedown.run";
pub const PROFILE_SAVE_KEY: &str = "shoedown.profile";

/// Fire-and-forget save. Failures are logged and ignored.
pub fn save_best_effort<S: SnapshotStore>(store: &mut S, snapshot: &SavedSnapshot) {
    match encode_snapshot(snapshot) {
        Ok(raw) => {
            if let Err(err) = store.write(RUN_SAVE_KEY, &raw) {
                log::warn!("snapshot write failed: {err}");
            }
        }
        Err(err) => log::warn!("snapshot encode failed: {err}"),
    }
}

/// Strict variants for hosts that surface storage problems instead of
/// shrugging them off (a desktop build with a visible error bar, say).
///
/// # Errors
///
/// Returns an error when the storage medium fails; corrupt but
/// readable snapshots still decode to `None`.
pub fn try_load_snapshot<S: SnapshotStore>(store: &S) -> anyhow::Result<Option<SavedSnapshot>> {
    let raw = store.read(RUN_SAVE_KEY).context("reading saved run")?;
    Ok(raw.as_deref().and_then(decode_snapshot))
}

/// Strict save counterpart to [`save_best_effort`].
///
/// # Errors
///
/// Returns an error when encoding or the storage medium fails.
pub fn try_save_snapshot<S: SnapshotStore>(
    store: &mut S,
    snapshot: &SavedSnapshot,
) -> anyhow::Result<()> {
    let raw = encode_snapshot(snapshot).context("encoding snapshot")?;
    store.write(RUN_SAVE_KEY, &raw).context("writing saved run")?;
    Ok(())
}

/// Load the saved run, treating any storage or parse failure as no save.
pub fn load_snapshot<S: SnapshotStore>(store: &S) -> Option<SavedSnapshot> {
    match store.read(RUN_SAVE_KEY) {
        Ok(Some(raw)) => decode_snapshot(&raw),
        Ok(None) => None,
        Err(err) => {
            log::warn!("snapshot read failed: {err}");
            None
        }
    }
}

/// Drop the saved run after victory or defeat.
pub fn clear_snapshot<S: SnapshotStore>(store: &mut S) {
    if let Err(err) = store.remove(RUN_SAVE_KEY) {
        log::warn!("snapshot remove failed: {err}");
    }
}

/// Persist the meta profile; same best-effort contract as run saves.
pub fn save_profile_best_effort<S: SnapshotStore>(store: &mut S, profile: &Profile) {
    match serde_json::to_string(profile) {
        Ok(raw) => {
            if let Err(err) = store.write(PROFILE_SAVE_KEY, &raw) {
                log::warn!("profile write failed: {err}");
            }
        }
        Err(err) => log::warn!("profile encode failed: {err}"),
    }
}

/// Load the meta profile, falling back to a fresh one on any failure.
pub fn load_profile<S: SnapshotStore>(store: &S) -> Profile {
    match store.read(PROFILE_SAVE_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
        Ok(None) => Profile::default(),
        Err(err) => {
            log::warn!("profile read failed: {err}");
            Profile::default()
        }
    }
}

/// In-memory store used by tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

impl SnapshotStore for MemoryStore {
    type Error = std::convert::Infallible;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, raw: &str) -> Result<(), Self::Error> {
        self.entries.insert(key.to_string(), raw.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        self.entries.remove(key);
        Ok(())
    }
}
