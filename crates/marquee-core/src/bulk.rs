//! Bulk ingestion payloads and reports.
//!
//! Items arrive as raw JSON so that one malformed item is reported against
//! its index instead of rejecting the whole request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::EntityKind;

/// Mixed payload for `POST /bulk/all`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bundle {
  pub genres:    Option<Vec<Value>>,
  pub directors: Option<Vec<Value>>,
  pub producers: Option<Vec<Value>>,
  pub types:     Option<Vec<Value>>,
  pub media:     Option<Vec<Value>>,
}

impl Bundle {
  pub fn items(&mut self, kind: EntityKind) -> Option<Vec<Value>> {
    match kind {
      EntityKind::Genre => self.genres.take(),
      EntityKind::Director => self.directors.take(),
      EntityKind::Producer => self.producers.take(),
      EntityKind::Type => self.types.take(),
      EntityKind::Media => self.media.take(),
    }
  }

  pub fn is_empty(&self) -> bool {
    [&self.genres, &self.directors, &self.producers, &self.types, &self.media]
      .iter()
      .all(|list| list.as_ref().is_none_or(Vec::is_empty))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
  pub index:   usize,
  pub message: String,
}

/// Outcome of ingesting one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindReport {
  pub created_count:   u64,
  pub total_requested: u64,
  pub inserted_ids:    Vec<Uuid>,
  pub errors:          Vec<ItemError>,
  /// Set when the whole kind failed (store unavailable).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:           Option<String>,
}

impl KindReport {
  pub fn failed(total_requested: u64, error: impl Into<String>) -> Self {
    Self { total_requested, error: Some(error.into()), ..Default::default() }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub genres:          Option<KindReport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub directors:       Option<KindReport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub producers:       Option<KindReport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub types:           Option<KindReport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub media:           Option<KindReport>,
  pub total_created:   u64,
  pub total_requested: u64,
}

impl BulkReport {
  pub fn record(&mut self, kind: EntityKind, report: KindReport) {
    self.total_created += report.created_count;
    self.total_requested += report.total_requested;
    let slot = match kind {
      EntityKind::Genre => &mut self.genres,
      EntityKind::Director => &mut self.directors,
      EntityKind::Producer => &mut self.producers,
      EntityKind::Type => &mut self.types,
      EntityKind::Media => &mut self.media,
    };
    *slot = Some(report);
  }
}

// ─── Correlation keys ────────────────────────────────────────────────────────

/// Client-supplied `key`s mapped to the ids minted for them earlier in the
/// same bundle.
#[derive(Debug, Default)]
pub struct Correlations {
  resolved: HashMap<(EntityKind, String), Uuid>,
  failed:   HashMap<(EntityKind, String), String>,
}

const MEDIA_REFERENCES: [(&str, EntityKind); 3] = [
  ("type", EntityKind::Type),
  ("director", EntityKind::Director),
  ("producer", EntityKind::Producer),
];

impl Correlations {
  /// The correlation key carried by a raw item, if any.
  pub fn key_of(item: &Value) -> Option<String> {
    item.get("key").and_then(Value::as_str).map(str::to_owned)
  }

  pub fn record(&mut self, kind: EntityKind, key: String, id: Uuid) {
    self.resolved.insert((kind, key), id);
  }

  pub fn record_failure(&mut self, kind: EntityKind, key: String, reason: String) {
    self.failed.insert((kind, key), reason);
  }

  /// Rewrite the reference fields of a raw media item, replacing
  /// correlation keys with real ids. Strings that already parse as UUIDs are
  /// left alone.
  pub fn resolve_media(&self, item: &mut Value) -> Result<(), String> {
    for (field, kind) in MEDIA_REFERENCES {
      if let Some(slot) = item.get_mut(field) {
        self.resolve_slot(kind, slot)?;
      }
    }
    if let Some(Value::Array(genres)) = item.get_mut("genres") {
      for slot in genres {
        self.resolve_slot(EntityKind::Genre, slot)?;
      }
    }
    Ok(())
  }

  fn resolve_slot(&self, kind: EntityKind, slot: &mut Value) -> Result<(), String> {
    let Some(raw) = slot.as_str() else {
      return Ok(());
    };
    if Uuid::parse_str(raw).is_ok() {
      return Ok(());
    }
    let lookup = (kind, raw.to_owned());
    if let Some(id) = self.resolved.get(&lookup) {
      *slot = Value::String(id.to_string());
      Ok(())
    } else if let Some(reason) = self.failed.get(&lookup) {
      Err(format!("{kind} {raw:?} was not created: {reason}"))
    } else {
      Err(format!("unknown {kind} reference {raw:?}"))
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn resolves_keys_and_keeps_uuids() {
    let director = Uuid::new_v4();
    let genre = Uuid::new_v4();
    let existing = Uuid::new_v4();

    let mut c = Correlations::default();
    c.record(EntityKind::Director, "nolan".into(), director);
    c.record(EntityKind::Genre, "scifi".into(), genre);

    let mut item = json!({
      "title": "Interstellar",
      "director": "nolan",
      "producer": existing.to_string(),
      "genres": ["scifi", existing.to_string()],
    });
    c.resolve_media(&mut item).unwrap();

    assert_eq!(item["director"], director.to_string());
    assert_eq!(item["producer"], existing.to_string());
    assert_eq!(item["genres"][0], genre.to_string());
    assert_eq!(item["genres"][1], existing.to_string());
  }

  #[test]
  fn keys_are_scoped_by_kind() {
    let mut c = Correlations::default();
    c.record(EntityKind::Genre, "drama".into(), Uuid::new_v4());

    let mut item = json!({ "director": "drama" });
    let err = c.resolve_media(&mut item).unwrap_err();
    assert!(err.contains("unknown director"));
  }

  #[test]
  fn failed_dependency_is_explained() {
    let mut c = Correlations::default();
    c.record_failure(EntityKind::Type, "film".into(), "duplicate".into());

    let mut item = json!({ "type": "film" });
    let err = c.resolve_media(&mut item).unwrap_err();
    assert!(err.contains("was not created: duplicate"));
  }

  #[test]
  fn empty_bundle() {
    assert!(Bundle::default().is_empty());
    let b = Bundle { genres: Some(vec![]), ..Default::default() };
    assert!(b.is_empty());
    let b = Bundle { media: Some(vec![json!({})]), ..Default::default() };
    assert!(!b.is_empty());
  }
}
