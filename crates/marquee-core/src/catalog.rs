//! The catalog service: generic CRUD with referential guards, statistics and
//! bulk ingestion over any [`CatalogStore`].

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  actor::Actor,
  bulk::{BulkReport, Bundle, Correlations, ItemError, KindReport},
  director::Director,
  entity::{EntityKind, Meta, Summary},
  error::{Error, Result},
  genre::Genre,
  media::{Media, MediaView, Populated},
  media_type::MediaType,
  producer::Producer,
  query::{Field, Page, Pagination, QueryParams, build_query},
  resource::Resource,
  stats::{
    DURATION_BUCKETS, DirectorStats, Dimension, FOUNDING_ERAS, GenreStats, MediaStats,
    MediaTypeStats, Metric, ProducerStats, bucketize, duration_bucket, founding_era,
  },
  store::CatalogStore,
  validate::ValidationErrors,
};

const TOP_VALUES: u64 = 10;
const TOP_TYPE_VALUES: u64 = 5;
const TOP_REFERENCES: u64 = 5;

fn store_err<E: Into<Error>>(e: E) -> Error { e.into() }

fn round_to(value: Option<f64>, places: i32) -> Option<f64> {
  let factor = 10f64.powi(places);
  value.map(|v| (v * factor).round() / factor)
}

/// Cloneable handle over a shared store.
pub struct Catalog<S> {
  store: Arc<S>,
}

impl<S> Clone for Catalog<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: CatalogStore> Catalog<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Run the query engine for `R` and fetch one page plus the total.
  pub async fn list<R: Resource>(&self, params: &QueryParams) -> Result<Page<R>> {
    let query = build_query::<R>(params)?;
    let items = self.store.find::<R>(&query).await.map_err(store_err)?;
    let total = self
      .store
      .count(R::KIND, &query.terms)
      .await
      .map_err(store_err)?;
    Ok(Page { items, pagination: Pagination::new(query.page, query.limit, total) })
  }

  pub async fn get<R: Resource>(&self, id: Uuid) -> Result<R> {
    self
      .store
      .get::<R>(id)
      .await
      .map_err(store_err)?
      .ok_or(Error::NotFound { kind: R::KIND, id })
  }

  pub async fn list_active<R: Resource>(&self) -> Result<Vec<R>> {
    self.store.list_active::<R>().await.map_err(store_err)
  }

  pub async fn list_media(&self, params: &QueryParams) -> Result<Page<MediaView>> {
    let Page { items, pagination } = self.list::<Media>(params).await?;
    Ok(Page { items: self.expand(items).await?, pagination })
  }

  pub async fn media_view(&self, id: Uuid) -> Result<MediaView> {
    let media = self.get::<Media>(id).await?;
    let mut views = self.expand(vec![media]).await?;
    views.pop().ok_or(Error::NotFound { kind: EntityKind::Media, id })
  }

  /// Replace each reference with the target's `{id, name}`. Summaries are
  /// fetched once per kind for the whole batch.
  pub async fn expand(&self, media: Vec<Media>) -> Result<Vec<MediaView>> {
    let mut wanted: HashMap<EntityKind, Vec<Uuid>> = HashMap::new();
    for m in &media {
      for (kind, id) in m.references() {
        let ids = wanted.entry(kind).or_default();
        if !ids.contains(&id) {
          ids.push(id);
        }
      }
    }

    let mut known: HashMap<(EntityKind, Uuid), Summary> = HashMap::new();
    for (kind, ids) in wanted {
      for summary in self.store.summaries(kind, ids).await.map_err(store_err)? {
        known.insert((kind, summary.id), summary);
      }
    }

    let lookup = |kind: EntityKind, id: Uuid| known.get(&(kind, id)).cloned();
    Ok(
      media
        .into_iter()
        .map(|m| {
          let populated = Populated {
            media_type: lookup(EntityKind::Type, m.media_type),
            director:   lookup(EntityKind::Director, m.director),
            producer:   lookup(EntityKind::Producer, m.producer),
            genres:     m
              .genres
              .iter()
              .filter_map(|g| lookup(EntityKind::Genre, *g))
              .collect(),
          };
          MediaView { media: m, populated }
        })
        .collect(),
    )
  }

  // ── Writes ────────────────────────────────────────────────────────────

  pub async fn create<R: Resource>(&self, draft: R::Draft, actor: &Actor) -> Result<R> {
    let doc = self.prepare::<R>(draft, actor).await?;
    self.store.insert(&doc).await.map_err(store_err)?;
    info!(kind = %R::KIND, id = %doc.meta().id, name = doc.display_name(), "created");
    Ok(doc)
  }

  /// Partial update. Deactivating through a patch runs the same dependent
  /// guard as [`Catalog::deactivate`].
  pub async fn update<R: Resource>(&self, id: Uuid, patch: R::Patch) -> Result<R> {
    let mut doc = self.get::<R>(id).await?;
    let was_active = doc.meta().is_active;

    doc.merge(patch);
    doc.normalize();
    doc.validate()?;
    if was_active && !doc.meta().is_active {
      self.guard_dependents(R::KIND, id).await?;
    }
    self.ensure_unique(&doc).await?;
    self.ensure_references(&doc).await?;

    doc.meta_mut().touch();
    if !self.store.replace(&doc).await.map_err(store_err)? {
      return Err(Error::NotFound { kind: R::KIND, id });
    }
    info!(kind = %R::KIND, %id, "updated");
    Ok(doc)
  }

  /// Guarded soft delete. An already inactive entity is returned unchanged.
  pub async fn deactivate<R: Resource>(&self, id: Uuid) -> Result<R> {
    let mut doc = self.get::<R>(id).await?;
    if !doc.meta().is_active {
      return Ok(doc);
    }
    self.guard_dependents(R::KIND, id).await?;

    doc.meta_mut().is_active = false;
    doc.meta_mut().touch();
    if !self.store.replace(&doc).await.map_err(store_err)? {
      return Err(Error::NotFound { kind: R::KIND, id });
    }
    info!(kind = %R::KIND, %id, "deactivated");
    Ok(doc)
  }

  /// Physically remove a genre that no media references, active or not.
  pub async fn purge_genre(&self, id: Uuid, actor: &Actor) -> Result<Genre> {
    if !actor.is_admin() {
      return Err(Error::Forbidden("permanent deletion requires the admin role".into()));
    }
    let genre = self.get::<Genre>(id).await?;
    let dependents = self
      .store
      .count_dependents(EntityKind::Genre, id, false)
      .await
      .map_err(store_err)?;
    if dependents > 0 {
      return Err(Error::Conflict {
        message:    format!("cannot delete genre: {dependents} media reference it"),
        dependents: Some(dependents),
      });
    }
    if !self.store.remove(EntityKind::Genre, id).await.map_err(store_err)? {
      return Err(Error::NotFound { kind: EntityKind::Genre, id });
    }
    info!(%id, name = %genre.name, "genre permanently deleted");
    Ok(genre)
  }

  async fn prepare<R: Resource>(&self, draft: R::Draft, actor: &Actor) -> Result<R> {
    let mut doc = R::from_draft(draft, Meta::new(actor.owner()));
    doc.normalize();
    doc.validate()?;
    self.ensure_unique(&doc).await?;
    self.ensure_references(&doc).await?;
    Ok(doc)
  }

  async fn ensure_unique<R: Resource>(&self, doc: &R) -> Result<()> {
    // Inactive media titles are free for reuse.
    if R::KIND == EntityKind::Media && !doc.meta().is_active {
      return Ok(());
    }
    let taken = self
      .store
      .key_taken(R::KIND, &doc.unique_key(), Some(doc.meta().id))
      .await
      .map_err(store_err)?;
    if taken {
      return Err(Error::conflict(format!(
        "{} {:?} already exists",
        R::KIND,
        doc.display_name()
      )));
    }
    Ok(())
  }

  async fn ensure_references<R: Resource>(&self, doc: &R) -> Result<()> {
    let mut by_kind: Vec<(EntityKind, Vec<Uuid>)> = Vec::new();
    for (kind, id) in doc.references() {
      match by_kind.iter_mut().find(|(k, _)| *k == kind) {
        Some((_, ids)) => ids.push(id),
        None => by_kind.push((kind, vec![id])),
      }
    }
    for (kind, ids) in by_kind {
      let missing = self.store.missing_ids(kind, ids).await.map_err(store_err)?;
      if let Some(id) = missing.first() {
        return Err(Error::Referential { kind, id: *id });
      }
    }
    Ok(())
  }

  async fn guard_dependents(&self, kind: EntityKind, id: Uuid) -> Result<()> {
    if !kind.is_referencable() {
      return Ok(());
    }
    let dependents = self
      .store
      .count_dependents(kind, id, true)
      .await
      .map_err(store_err)?;
    if dependents > 0 {
      warn!(%kind, %id, dependents, "deactivation blocked by active media");
      return Err(Error::Conflict {
        message:    format!("cannot deactivate {kind}: {dependents} active media reference it"),
        dependents: Some(dependents),
      });
    }
    Ok(())
  }

  // ── Bulk ingestion ────────────────────────────────────────────────────

  /// Ingest a homogeneous batch. Each item is validated on its own; the
  /// survivors go to the store in one unordered insert.
  pub async fn bulk<R: Resource>(&self, items: Vec<Value>, actor: &Actor) -> Result<KindReport> {
    if items.is_empty() {
      return Err(ValidationErrors::single("items", "must be a non-empty array").into());
    }
    let report = self
      .ingest::<R>(items, actor, &mut Correlations::default())
      .await?;
    info!(
      kind = %R::KIND,
      created = report.created_count,
      requested = report.total_requested,
      "bulk insert finished"
    );
    Ok(report)
  }

  /// Ingest a mixed bundle in dependency order, resolving correlation keys
  /// in media references to ids created earlier in the same call.
  pub async fn bulk_all(&self, mut bundle: Bundle, actor: &Actor) -> Result<BulkReport> {
    if bundle.is_empty() {
      return Err(
        ValidationErrors::single("bundle", "at least one non-empty list is required").into(),
      );
    }

    let mut correlations = Correlations::default();
    let mut report = BulkReport::default();
    for kind in EntityKind::ALL {
      let Some(items) = bundle.items(kind).filter(|items| !items.is_empty()) else {
        continue;
      };
      let total = items.len() as u64;
      let keys: Vec<String> = items.iter().filter_map(Correlations::key_of).collect();

      let outcome = match kind {
        EntityKind::Genre => self.ingest::<Genre>(items, actor, &mut correlations).await,
        EntityKind::Director => self.ingest::<Director>(items, actor, &mut correlations).await,
        EntityKind::Producer => self.ingest::<Producer>(items, actor, &mut correlations).await,
        EntityKind::Type => self.ingest::<MediaType>(items, actor, &mut correlations).await,
        EntityKind::Media => self.ingest::<Media>(items, actor, &mut correlations).await,
      };
      let kind_report = match outcome {
        Ok(r) => r,
        Err(e) => {
          tracing::error!(%kind, error = %e, "bulk insert failed for whole kind");
          for key in keys {
            correlations.record_failure(kind, key, e.to_string());
          }
          KindReport::failed(total, e.to_string())
        }
      };
      report.record(kind, kind_report);
    }

    info!(
      created = report.total_created,
      requested = report.total_requested,
      "bundle ingested"
    );
    Ok(report)
  }

  async fn ingest<R: Resource>(
    &self,
    items: Vec<Value>,
    actor: &Actor,
    correlations: &mut Correlations,
  ) -> Result<KindReport> {
    let mut report = KindReport { total_requested: items.len() as u64, ..Default::default() };
    let mut survivors: Vec<(usize, Option<String>, R)> = Vec::new();

    for (index, mut item) in items.into_iter().enumerate() {
      let key = Correlations::key_of(&item);
      match self.prepare_item::<R>(&mut item, actor, correlations).await {
        Ok(doc) => survivors.push((index, key, doc)),
        Err(Error::Store(e)) => return Err(Error::Store(e)),
        Err(e) => {
          if let Some(key) = key {
            correlations.record_failure(R::KIND, key, e.to_string());
          }
          report.errors.push(ItemError { index, message: e.to_string() });
        }
      }
    }

    let mut docs = Vec::with_capacity(survivors.len());
    let mut slots = Vec::with_capacity(survivors.len());
    for (index, key, doc) in survivors {
      slots.push((index, key, doc.meta().id));
      docs.push(doc);
    }

    let results = self.store.insert_many(docs).await.map_err(store_err)?;
    for ((index, key, id), result) in slots.into_iter().zip(results) {
      match result {
        Ok(()) => {
          report.created_count += 1;
          report.inserted_ids.push(id);
          if let Some(key) = key {
            correlations.record(R::KIND, key, id);
          }
        }
        Err(e) => {
          let message = store_err(e).to_string();
          if let Some(key) = key {
            correlations.record_failure(R::KIND, key, message.clone());
          }
          report.errors.push(ItemError { index, message });
        }
      }
    }

    report.errors.sort_by_key(|e| e.index);
    Ok(report)
  }

  async fn prepare_item<R: Resource>(
    &self,
    item: &mut Value,
    actor: &Actor,
    correlations: &Correlations,
  ) -> Result<R> {
    if R::KIND == EntityKind::Media {
      correlations
        .resolve_media(item)
        .map_err(|message| ValidationErrors::single("reference", message))?;
    }
    let draft: R::Draft = serde_json::from_value(item.take())?;
    self.prepare::<R>(draft, actor).await
  }

  // ── Statistics ────────────────────────────────────────────────────────

  pub async fn genre_stats(&self) -> Result<GenreStats> {
    let kind = EntityKind::Genre;
    Ok(GenreStats {
      counts:    self.store.status_counts(kind).await.map_err(store_err)?,
      top_tags:  self
        .store
        .tally(kind, Dimension::Value(Field::Each("$.tags")), TOP_VALUES)
        .await
        .map_err(store_err)?,
      most_used: self
        .store
        .rank_references(kind, TOP_REFERENCES)
        .await
        .map_err(store_err)?,
    })
  }

  pub async fn director_stats(&self) -> Result<DirectorStats> {
    let kind = EntityKind::Director;
    let age = self
      .store
      .rollup(kind, Metric::YearsSince(Field::At("$.birthDate")))
      .await
      .map_err(store_err)?;
    Ok(DirectorStats {
      counts:         self.store.status_counts(kind).await.map_err(store_err)?,
      by_nationality: self
        .store
        .tally(kind, Dimension::Value(Field::At("$.nationality")), TOP_VALUES)
        .await
        .map_err(store_err)?,
      most_prolific:  self
        .store
        .rank_references(kind, TOP_REFERENCES)
        .await
        .map_err(store_err)?,
      average_age:    round_to(age.average, 1),
    })
  }

  pub async fn producer_stats(&self) -> Result<ProducerStats> {
    let kind = EntityKind::Producer;
    let founded = self
      .store
      .values(kind, Field::At("$.foundedYear"))
      .await
      .map_err(store_err)?;
    Ok(ProducerStats {
      counts:          self.store.status_counts(kind).await.map_err(store_err)?,
      by_country:      self
        .store
        .tally(kind, Dimension::Value(Field::At("$.country")), TOP_VALUES)
        .await
        .map_err(store_err)?,
      most_prolific:   self
        .store
        .rank_references(kind, TOP_REFERENCES)
        .await
        .map_err(store_err)?,
      by_founding_era: bucketize(&founded, &FOUNDING_ERAS, founding_era),
    })
  }

  pub async fn type_stats(&self) -> Result<MediaTypeStats> {
    let kind = EntityKind::Type;
    Ok(MediaTypeStats {
      counts:      self.store.status_counts(kind).await.map_err(store_err)?,
      by_category: self
        .store
        .tally(kind, Dimension::Value(Field::At("$.category")), TOP_TYPE_VALUES)
        .await
        .map_err(store_err)?,
      by_format:   self
        .store
        .tally(kind, Dimension::Value(Field::At("$.format")), TOP_TYPE_VALUES)
        .await
        .map_err(store_err)?,
      most_used:   self
        .store
        .rank_references(kind, TOP_REFERENCES)
        .await
        .map_err(store_err)?,
    })
  }

  pub async fn media_stats(&self) -> Result<MediaStats> {
    let kind = EntityKind::Media;
    let counts = self.store.status_counts(kind).await.map_err(store_err)?;
    let mut rating = self
      .store
      .rollup(kind, Metric::Value(Field::At("$.rating.average")))
      .await
      .map_err(store_err)?;
    rating.average = round_to(rating.average, 2);
    let durations = self
      .store
      .values(kind, Field::At("$.duration"))
      .await
      .map_err(store_err)?;

    Ok(MediaStats {
      total_media: counts.total,
      active_media: counts.active,
      inactive_media: counts.inactive,
      top_directors: self
        .store
        .rank_references(EntityKind::Director, TOP_REFERENCES)
        .await
        .map_err(store_err)?,
      top_genres: self
        .store
        .rank_references(EntityKind::Genre, TOP_REFERENCES)
        .await
        .map_err(store_err)?,
      top_producers: self
        .store
        .rank_references(EntityKind::Producer, TOP_REFERENCES)
        .await
        .map_err(store_err)?,
      rating,
      by_duration: bucketize(&durations, &DURATION_BUCKETS, duration_bucket),
      by_year: self
        .store
        .tally(kind, Dimension::Year(Field::At("$.releaseDate")), TOP_VALUES)
        .await
        .map_err(store_err)?,
    })
  }
}
