use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{FeaturePayload, ScoreResponse};
use crate::session::Environment;
use crate::store::{kv_get, kv_remove, kv_set, SharedStore, KEY_HISTORY, KEY_LAST_GLOBAL, KEY_REPORT};

pub const DEFAULT_CAPACITY: usize = 100;

/// One completed scoring or explanation request. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: String,
    pub env: Environment,
    pub input: FeaturePayload,
    #[serde(default)]
    pub risk_label: Option<String>,
    #[serde(default)]
    pub risk_probability: Option<f64>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub explain: Option<Value>,
    #[serde(default)]
    pub global_explain: Option<Value>,
}

impl HistoryEntry {
    /// Ledger record for a completed request, derived from the raw response
    /// body. `explained` marks `/explain` responses, which also carry the
    /// body in the explain slot for later replay.
    pub fn from_response(env: Environment, input: FeaturePayload, raw: &Value, explained: bool) -> Self {
        let view = ScoreResponse::from_value(raw);
        let risk_probability = view.probability();
        Self {
            ts: local_timestamp(),
            env,
            input,
            risk_label: view.risk_label,
            risk_probability,
            warnings: view.warnings,
            score: Some(raw.clone()),
            explain: if explained { Some(raw.clone()) } else { None },
            global_explain: None,
        }
    }

    /// Attach the last-fetched global importances so replay can restore the
    /// chart alongside the per-request results.
    pub fn with_global(mut self, global_explain: Option<Value>) -> Self {
        self.global_explain = global_explain;
        self
    }
}

pub fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Bounded, newest-first log of prior requests. Truncation happens on every
/// append, so each write is O(capacity) rather than O(total history).
#[derive(Clone)]
pub struct Ledger {
    store: SharedStore,
    capacity: usize,
}

impl Ledger {
    pub fn new(store: SharedStore) -> Self {
        Self::with_capacity(store, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(store: SharedStore, capacity: usize) -> Self {
        Self { store, capacity }
    }

    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut items = self.list();
        items.insert(0, entry);
        items.truncate(self.capacity);
        kv_set(&self.store, KEY_HISTORY, &serde_json::to_string(&items)?)
    }

    /// Newest-first. Missing or corrupt backing data reads as empty.
    pub fn list(&self) -> Vec<HistoryEntry> {
        kv_get(&self.store, KEY_HISTORY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn clear(&self) -> Result<()> {
        kv_remove(&self.store, KEY_HISTORY)
    }

    /// Entry at `index` for restoring input and prior results into the active
    /// view. Out of range is a no-op, not an error.
    pub fn replay(&self, index: usize) -> Option<HistoryEntry> {
        self.list().into_iter().nth(index)
    }

    pub fn filter(&self, query: &str, label: Option<&str>) -> Vec<HistoryEntry> {
        filter_entries(&self.list(), query, label)
    }
}

/// Audit-view filter: an exact-match label filter plus a case-insensitive
/// free-text query matched against the entry's full serialized form.
pub fn filter_entries(entries: &[HistoryEntry], query: &str, label: Option<&str>) -> Vec<HistoryEntry> {
    let q = query.trim().to_lowercase();
    entries
        .iter()
        .filter(|e| {
            if let Some(lab) = label {
                if e.risk_label.as_deref() != Some(lab) {
                    return false;
                }
            }
            if q.is_empty() {
                return true;
            }
            serde_json::to_string(e)
                .map(|blob| blob.to_lowercase().contains(&q))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Tabular form for CSV export: one row per entry plus the header row.
pub fn export_rows(entries: &[HistoryEntry]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "time".to_string(),
        "env".to_string(),
        "label".to_string(),
        "prob".to_string(),
        "warnings".to_string(),
        "input_json".to_string(),
    ]];
    for e in entries {
        rows.push(vec![
            e.ts.clone(),
            e.env.as_str().to_string(),
            e.risk_label.clone().unwrap_or_default(),
            e.risk_probability.map(|p| p.to_string()).unwrap_or_default(),
            e.warnings.join("; "),
            serde_json::to_string(&e.input).unwrap_or_else(|_| "{}".to_string()),
        ]);
    }
    rows
}

/// Every field double-quoted, internal quotes doubled.
pub fn to_csv(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single most-recent full result set, overwritten on every explain action.
/// Read by the printable report view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub env: Environment,
    pub generated_at: String,
    pub input: FeaturePayload,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub explain: Option<Value>,
}

pub fn save_report(store: &SharedStore, snapshot: &ReportSnapshot) -> Result<()> {
    kv_set(store, KEY_REPORT, &serde_json::to_string(snapshot)?)
}

/// `None` means the report view must render its empty state, never fail.
pub fn load_report(store: &SharedStore) -> Option<ReportSnapshot> {
    kv_get(store, KEY_REPORT).and_then(|raw| serde_json::from_str(&raw).ok())
}

/// Most recent global feature-importance result, overwritten on every fetch
/// and carried forward onto entries appended afterwards.
pub fn save_last_global(store: &SharedStore, raw: &Value) -> Result<()> {
    kv_set(store, KEY_LAST_GLOBAL, &serde_json::to_string(raw)?)
}

pub fn load_last_global(store: &SharedStore) -> Option<Value> {
    kv_get(store, KEY_LAST_GLOBAL).and_then(|raw| serde_json::from_str(&raw).ok())
}
