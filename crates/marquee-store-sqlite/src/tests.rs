//! Integration tests for `SqliteStore` and the catalog service against an
//! in-memory database.

use std::sync::Arc;

use marquee_core::{
  Error,
  actor::{Actor, Role},
  bulk::Bundle,
  catalog::Catalog,
  director::{Director, DirectorPatch},
  entity::{EntityKind, Owner},
  genre::{Genre, GenrePatch, GenreSort},
  media::{Media, MediaPatch},
  media_type::MediaType,
  producer::Producer,
  query::{ListQuery, Order, QueryParams},
  resource::Resource,
  stats::Ranked,
  store::{CatalogStore, UserStore},
  user::{Profile, Registration, User},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::SqliteStore;

async fn catalog() -> Catalog<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  Catalog::new(Arc::new(store))
}

fn params(pairs: &[(&str, &str)]) -> QueryParams { pairs.iter().copied().collect() }

async fn create<R: Resource>(c: &Catalog<SqliteStore>, body: Value) -> R {
  let draft: R::Draft = serde_json::from_value(body).expect("draft");
  c.create::<R>(draft, &Actor::System).await.expect("create")
}

fn admin() -> Actor { Actor::User { id: Uuid::new_v4(), role: Role::Admin } }

struct Refs {
  director: Uuid,
  producer: Uuid,
  kind:     Uuid,
  genre:    Uuid,
}

async fn refs(c: &Catalog<SqliteStore>) -> Refs {
  let d: Director = create(
    c,
    json!({ "name": "Quentin Tarantino", "birthDate": "1963-03-27", "nationality": "American" }),
  )
  .await;
  let p: Producer =
    create(c, json!({ "name": "Miramax", "foundedYear": 1979, "country": "USA" })).await;
  let t: MediaType = create(
    c,
    json!({ "name": "Película", "category": "fiction", "format": "feature" }),
  )
  .await;
  let g: Genre = create(c, json!({ "name": "Crime", "tags": ["Heist", "noir"] })).await;
  Refs { director: d.meta.id, producer: p.meta.id, kind: t.meta.id, genre: g.meta.id }
}

async fn media(
  c: &Catalog<SqliteStore>,
  r: &Refs,
  title: &str,
  released: &str,
  imdb: f64,
) -> Media {
  create(
    c,
    json!({
      "title": title,
      "releaseDate": released,
      "duration": 154,
      "type": r.kind,
      "director": r.director,
      "producer": r.producer,
      "genres": [r.genre],
      "rating": { "imdb": { "score": imdb } },
    }),
  )
  .await
}

// ─── Create and uniqueness ───────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_roundtrip() {
  let c = catalog().await;
  let g: Genre = create(&c, json!({ "name": "  Western ", "tags": ["Dusty", "dusty"] })).await;

  let fetched = c.get::<Genre>(g.meta.id).await.unwrap();
  assert_eq!(fetched.name, "Western");
  assert_eq!(fetched.tags, ["dusty"]);
  assert!(fetched.meta.is_active);
  assert_eq!(fetched.meta.created_by, Owner::System);
}

#[tokio::test]
async fn get_missing_is_not_found() {
  let c = catalog().await;
  let id = Uuid::new_v4();
  let err = c.get::<Genre>(id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { kind: EntityKind::Genre, id: missing } if missing == id));
}

#[tokio::test]
async fn names_are_unique_case_insensitively() {
  let c = catalog().await;
  let _: Genre = create(&c, json!({ "name": "Drama" })).await;

  let draft = serde_json::from_value(json!({ "name": "DRAMA" })).unwrap();
  let err = c.create::<Genre>(draft, &Actor::System).await.unwrap_err();
  assert!(matches!(err, Error::Conflict { dependents: None, .. }));
}

#[tokio::test]
async fn unique_index_is_the_backstop() {
  let c = catalog().await;
  let first: Genre = create(&c, json!({ "name": "Horror" })).await;

  // Bypass the service pre-check and go straight to the store.
  let mut clone = first.clone();
  clone.meta.id = Uuid::new_v4();
  clone.name = "HORROR".into();
  let err: Error = c.store().insert(&clone).await.unwrap_err().into();
  assert!(matches!(err, Error::Conflict { .. }));
}

#[tokio::test]
async fn created_by_records_the_actor() {
  let c = catalog().await;
  let user = Uuid::new_v4();
  let draft = serde_json::from_value(json!({ "name": "Musical" })).unwrap();
  let g = c
    .create::<Genre>(draft, &Actor::User { id: user, role: Role::User })
    .await
    .unwrap();
  assert_eq!(g.meta.created_by, Owner::User(user));
}

// ─── Query engine ────────────────────────────────────────────────────────────

#[tokio::test]
async fn pages_concatenate_to_the_full_listing() {
  let c = catalog().await;
  for i in 0..25 {
    let _: Genre = create(&c, json!({ "name": format!("Genre {i:02}") })).await;
  }

  let all = c.list::<Genre>(&params(&[("limit", "100")])).await.unwrap();
  assert_eq!(all.items.len(), 25);
  assert_eq!(all.pagination.total_items, 25);

  let mut paged = Vec::new();
  for page in 1..=4 {
    let p = c
      .list::<Genre>(&params(&[("limit", "7"), ("page", &page.to_string())]))
      .await
      .unwrap();
    assert_eq!(p.pagination.total_pages, 4);
    assert_eq!(p.pagination.has_next_page, page < 4);
    paged.extend(p.items.into_iter().map(|g| g.meta.id));
  }
  let ids: Vec<Uuid> = all.items.iter().map(|g| g.meta.id).collect();
  assert_eq!(paged, ids);
  assert_eq!(all.items[0].name, "Genre 00");
}

#[tokio::test]
async fn sort_order_descending() {
  let c = catalog().await;
  for name in ["Beta", "Alpha", "Gamma"] {
    let _: Genre = create(&c, json!({ "name": name })).await;
  }
  let page = c
    .list::<Genre>(&params(&[("sort", "name"), ("order", "desc")]))
    .await
    .unwrap();
  let names: Vec<&str> = page.items.iter().map(|g| g.name.as_str()).collect();
  assert_eq!(names, ["Gamma", "Beta", "Alpha"]);
}

#[tokio::test]
async fn pages_beyond_the_offset_range_are_rejected() {
  let c = catalog().await;
  let _: Genre = create(&c, json!({ "name": "Solo" })).await;

  for (page, limit) in [("18446744073709551615", "10"), ("9223372036854775810", "1")] {
    let err = c
      .list::<Genre>(&params(&[("page", page), ("limit", limit)]))
      .await
      .unwrap_err();
    assert!(matches!(&err, Error::Validation(e) if e.has("page")), "{err}");
  }

  let last = c
    .list::<Genre>(&params(&[("page", "9223372036854775807"), ("limit", "1")]))
    .await
    .unwrap();
  assert!(last.items.is_empty());
  assert_eq!(last.pagination.total_items, 1);

  let query = ListQuery {
    page:  u64::MAX,
    limit: 10,
    sort:  GenreSort::Name,
    order: Order::Asc,
    terms: vec![],
  };
  let err: Error = c.store().find::<Genre>(&query).await.unwrap_err().into();
  assert!(matches!(&err, Error::Validation(e) if e.has("page")), "{err}");
}

#[tokio::test]
async fn search_ors_fields_and_filters_and() {
  let c = catalog().await;
  let _: Genre = create(&c, json!({ "name": "Film Noir", "tags": ["dark"] })).await;
  let thriller: Genre =
    create(&c, json!({ "name": "Thriller", "tags": ["noir", "suspense"] })).await;
  let _: Genre = create(&c, json!({ "name": "Comedy", "tags": ["light"] })).await;

  let hits = c.list::<Genre>(&params(&[("search", "NOIR")])).await.unwrap();
  assert_eq!(hits.pagination.total_items, 2);

  let hits = c
    .list::<Genre>(&params(&[("search", "noir"), ("tag", "suspense")]))
    .await
    .unwrap();
  assert_eq!(hits.items.len(), 1);
  assert_eq!(hits.items[0].meta.id, thriller.meta.id);
}

#[tokio::test]
async fn search_escapes_like_wildcards() {
  let c = catalog().await;
  let _: Genre = create(&c, json!({ "name": "Documentary" })).await;
  let hits = c.list::<Genre>(&params(&[("search", "%")])).await.unwrap();
  assert_eq!(hits.pagination.total_items, 0);
}

#[tokio::test]
async fn active_filter_selects_lifecycle() {
  let c = catalog().await;
  let keep: Genre = create(&c, json!({ "name": "Keep" })).await;
  let gone: Genre = create(&c, json!({ "name": "Gone" })).await;
  c.deactivate::<Genre>(gone.meta.id).await.unwrap();

  let active = c.list::<Genre>(&QueryParams::new()).await.unwrap();
  assert_eq!(active.items.len(), 1);
  assert_eq!(active.items[0].meta.id, keep.meta.id);

  let inactive = c.list::<Genre>(&params(&[("active", "false")])).await.unwrap();
  assert_eq!(inactive.items[0].meta.id, gone.meta.id);

  let all = c.list::<Genre>(&params(&[("active", "all")])).await.unwrap();
  assert_eq!(all.pagination.total_items, 2);
}

#[tokio::test]
async fn media_year_and_rating_filters() {
  let c = catalog().await;
  let r = refs(&c).await;
  let hit = media(&c, &r, "Pulp Fiction", "1994-10-14", 8.9).await;
  media(&c, &r, "Low Rated", "1994-06-01", 7.0).await;
  media(&c, &r, "Next Year", "1995-01-01", 9.0).await;
  media(&c, &r, "Year Before", "1993-12-31", 9.5).await;

  let page = c
    .list_media(&params(&[("year", "1994"), ("rating", "8")]))
    .await
    .unwrap();
  assert_eq!(page.items.len(), 1);
  assert_eq!(page.items[0].media.meta.id, hit.meta.id);
}

#[tokio::test]
async fn media_reference_filters() {
  let c = catalog().await;
  let r = refs(&c).await;
  media(&c, &r, "Reservoir Dogs", "1992-09-02", 8.3).await;

  let by_genre = c
    .list::<Media>(&params(&[("genre", &r.genre.to_string())]))
    .await
    .unwrap();
  assert_eq!(by_genre.items.len(), 1);

  let by_other = c
    .list::<Media>(&params(&[("director", &Uuid::new_v4().to_string())]))
    .await
    .unwrap();
  assert!(by_other.items.is_empty());
}

#[tokio::test]
async fn media_search_covers_cast() {
  let c = catalog().await;
  let r = refs(&c).await;
  let _: Media = create(
    &c,
    json!({
      "title": "Jackie Brown",
      "type": r.kind,
      "director": r.director,
      "producer": r.producer,
      "genres": [r.genre],
      "cast": [{ "actor": "Pam Grier", "role": "lead" }],
    }),
  )
  .await;

  let hits = c.list::<Media>(&params(&[("search", "grier")])).await.unwrap();
  assert_eq!(hits.items.len(), 1);
}

#[tokio::test]
async fn media_listing_is_expanded() {
  let c = catalog().await;
  let r = refs(&c).await;
  let second: Genre = create(&c, json!({ "name": "Drama" })).await;
  let _: Media = create(
    &c,
    json!({
      "title": "Kill Bill",
      "type": r.kind,
      "director": r.director,
      "producer": r.producer,
      "genres": [second.meta.id, r.genre],
    }),
  )
  .await;

  let page = c.list_media(&QueryParams::new()).await.unwrap();
  let view = &page.items[0];
  assert_eq!(view.populated.director.as_ref().unwrap().name, "Quentin Tarantino");
  assert_eq!(view.populated.media_type.as_ref().unwrap().name, "Película");
  let genres: Vec<&str> = view.populated.genres.iter().map(|g| g.name.as_str()).collect();
  assert_eq!(genres, ["Drama", "Crime"]);
}

#[tokio::test]
async fn list_active_is_sorted_by_name() {
  let c = catalog().await;
  for name in ["zeta", "Alpha", "mid"] {
    let _: Genre = create(&c, json!({ "name": name })).await;
  }
  let names: Vec<String> = c
    .list_active::<Genre>()
    .await
    .unwrap()
    .into_iter()
    .map(|g| g.name)
    .collect();
  assert_eq!(names, ["Alpha", "mid", "zeta"]);
}

// ─── Referential integrity ───────────────────────────────────────────────────

#[tokio::test]
async fn unknown_reference_persists_nothing() {
  let c = catalog().await;
  let r = refs(&c).await;
  let ghost = Uuid::new_v4();

  let draft = serde_json::from_value(json!({
    "title": "Phantom",
    "type": r.kind,
    "director": ghost,
    "producer": r.producer,
    "genres": [r.genre],
  }))
  .unwrap();
  let err = c.create::<Media>(draft, &Actor::System).await.unwrap_err();
  assert!(
    matches!(err, Error::Referential { kind: EntityKind::Director, id } if id == ghost)
  );

  let counts = c.store().status_counts(EntityKind::Media).await.unwrap();
  assert_eq!(counts.total, 0);
}

#[tokio::test]
async fn inactive_references_are_still_valid() {
  let c = catalog().await;
  let r = refs(&c).await;
  let old: Genre = create(&c, json!({ "name": "Silent" })).await;
  c.deactivate::<Genre>(old.meta.id).await.unwrap();

  let _: Media = create(
    &c,
    json!({
      "title": "Metropolis",
      "type": r.kind,
      "director": r.director,
      "producer": r.producer,
      "genres": [old.meta.id],
    }),
  )
  .await;
}

// ─── Guarded soft delete ─────────────────────────────────────────────────────

#[tokio::test]
async fn deactivation_is_blocked_by_active_media() {
  let c = catalog().await;
  let r = refs(&c).await;
  let m = media(&c, &r, "Pulp Fiction", "1994-10-14", 8.9).await;

  let err = c.deactivate::<Director>(r.director).await.unwrap_err();
  assert!(matches!(err, Error::Conflict { dependents: Some(1), .. }));
  assert!(c.get::<Director>(r.director).await.unwrap().meta.is_active);

  let err = c.deactivate::<Genre>(r.genre).await.unwrap_err();
  assert!(matches!(err, Error::Conflict { dependents: Some(1), .. }));

  c.deactivate::<Media>(m.meta.id).await.unwrap();
  let d = c.deactivate::<Director>(r.director).await.unwrap();
  assert!(!d.meta.is_active);
}

#[tokio::test]
async fn patching_is_active_false_is_guarded() {
  let c = catalog().await;
  let r = refs(&c).await;
  media(&c, &r, "Death Proof", "2007-04-06", 7.0).await;

  let patch = DirectorPatch { is_active: Some(false), ..Default::default() };
  let err = c.update::<Director>(r.director, patch).await.unwrap_err();
  assert!(matches!(err, Error::Conflict { .. }));
  assert!(c.get::<Director>(r.director).await.unwrap().meta.is_active);
}

#[tokio::test]
async fn soft_delete_is_idempotent() {
  let c = catalog().await;
  let g: Genre = create(&c, json!({ "name": "Mystery" })).await;

  let first = c.deactivate::<Genre>(g.meta.id).await.unwrap();
  let second = c.deactivate::<Genre>(g.meta.id).await.unwrap();
  assert!(!first.meta.is_active);
  assert!(!second.meta.is_active);
  assert_eq!(first.meta.updated_at, second.meta.updated_at);
}

#[tokio::test]
async fn reactivation_through_update() {
  let c = catalog().await;
  let g: Genre = create(&c, json!({ "name": "Sports" })).await;
  c.deactivate::<Genre>(g.meta.id).await.unwrap();

  let patch = GenrePatch { is_active: Some(true), ..Default::default() };
  let g = c.update::<Genre>(g.meta.id, patch).await.unwrap();
  assert!(g.meta.is_active);
}

#[tokio::test]
async fn media_titles_are_unique_among_active_only() {
  let c = catalog().await;
  let r = refs(&c).await;
  let first = media(&c, &r, "Heat", "1995-12-15", 8.3).await;

  let draft = serde_json::from_value(json!({
    "title": "heat ",
    "type": r.kind,
    "director": r.director,
    "producer": r.producer,
    "genres": [r.genre],
  }))
  .unwrap();
  let err = c.create::<Media>(draft, &Actor::System).await.unwrap_err();
  assert!(matches!(err, Error::Conflict { .. }));

  c.deactivate::<Media>(first.meta.id).await.unwrap();
  let remake = media(&c, &r, "Heat", "2026-01-01", 7.5).await;
  assert!(remake.meta.is_active);

  let patch = MediaPatch { is_active: Some(true), ..Default::default() };
  let err = c.update::<Media>(first.meta.id, patch).await.unwrap_err();
  assert!(matches!(err, Error::Conflict { .. }));
}

#[tokio::test]
async fn permanent_genre_delete_counts_inactive_media() {
  let c = catalog().await;
  let r = refs(&c).await;
  let m = media(&c, &r, "Jackie Brown", "1997-12-25", 7.5).await;
  c.deactivate::<Media>(m.meta.id).await.unwrap();

  let err = c.purge_genre(r.genre, &admin()).await.unwrap_err();
  assert!(matches!(err, Error::Conflict { dependents: Some(1), .. }));

  let spare: Genre = create(&c, json!({ "name": "Spare" })).await;
  let err = c.purge_genre(spare.meta.id, &Actor::System).await.unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  c.purge_genre(spare.meta.id, &admin()).await.unwrap();
  assert!(matches!(
    c.get::<Genre>(spare.meta.id).await.unwrap_err(),
    Error::NotFound { .. }
  ));
}

// ─── Bulk ingestion ──────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_collisions_within_a_batch() {
  let c = catalog().await;
  let report = c
    .bulk::<Genre>(
      vec![
        json!({ "name": "Action" }),
        json!({ "name": "action" }),
        json!({ "name": "Drama" }),
      ],
      &Actor::System,
    )
    .await
    .unwrap();

  assert_eq!(report.created_count, 2);
  assert_eq!(report.total_requested, 3);
  assert_eq!(report.inserted_ids.len(), 2);
  assert_eq!(report.errors.len(), 1);
  assert_eq!(report.errors[0].index, 1);
}

#[tokio::test]
async fn bulk_reports_each_bad_item() {
  let c = catalog().await;
  let _: Genre = create(&c, json!({ "name": "Existing" })).await;

  let report = c
    .bulk::<Genre>(
      vec![
        json!({ "name": "x" }),
        json!({ "nope": true }),
        json!({ "name": "existing" }),
        json!({ "name": "Fresh" }),
      ],
      &Actor::System,
    )
    .await
    .unwrap();

  assert_eq!(report.created_count, 1);
  let indexes: Vec<usize> = report.errors.iter().map(|e| e.index).collect();
  assert_eq!(indexes, [0, 1, 2]);
}

#[tokio::test]
async fn bulk_rejects_empty_batches() {
  let c = catalog().await;
  let err = c.bulk::<Genre>(vec![], &Actor::System).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn bundle_resolves_correlation_keys() {
  let c = catalog().await;
  let bundle: Bundle = serde_json::from_value(json!({
    "genres": [{ "key": "crime", "name": "Crime" }],
    "directors": [{ "key": "qt", "name": "Quentin Tarantino" }],
    "producers": [{ "key": "mx", "name": "Miramax" }],
    "types": [{ "key": "film", "name": "Película", "category": "fiction", "format": "feature" }],
    "media": [
      { "title": "Pulp Fiction", "type": "film", "director": "qt", "producer": "mx", "genres": ["crime"] },
      { "title": "Orphan", "type": "film", "director": "nobody", "producer": "mx", "genres": ["crime"] },
    ],
  }))
  .unwrap();

  let report = c.bulk_all(bundle, &Actor::System).await.unwrap();
  assert_eq!(report.total_created, 5);
  assert_eq!(report.total_requested, 6);

  let media_report = report.media.unwrap();
  assert_eq!(media_report.created_count, 1);
  assert_eq!(media_report.errors[0].index, 1);
  assert!(media_report.errors[0].message.contains("unknown director"));

  let created = c.get::<Media>(media_report.inserted_ids[0]).await.unwrap();
  let director = report.directors.unwrap().inserted_ids[0];
  assert_eq!(created.director, director);
}

#[tokio::test]
async fn bundle_explains_failed_dependencies() {
  let c = catalog().await;
  let bundle: Bundle = serde_json::from_value(json!({
    "directors": [{ "key": "bad", "name": "X" }],
    "media": [{
      "title": "Nope",
      "type": Uuid::new_v4(),
      "director": "bad",
      "producer": Uuid::new_v4(),
      "genres": [Uuid::new_v4()],
    }],
  }))
  .unwrap();

  let report = c.bulk_all(bundle, &Actor::System).await.unwrap();
  assert_eq!(report.total_created, 0);
  assert!(report.genres.is_none());
  let media_report = report.media.unwrap();
  assert!(media_report.errors[0].message.contains("was not created"));
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn media_stats_rank_the_director() {
  let c = catalog().await;
  let r = refs(&c).await;
  media(&c, &r, "Pulp Fiction", "1994-10-14", 8.9).await;

  let stats = c.media_stats().await.unwrap();
  assert_eq!(stats.total_media, 1);
  assert_eq!(stats.active_media, 1);
  assert_eq!(stats.top_directors, [Ranked {
    id:    r.director,
    name:  "Quentin Tarantino".into(),
    count: 1,
  }]);
  assert_eq!(stats.top_genres[0].id, r.genre);
  assert_eq!(stats.rating.average, Some(8.9));
  assert_eq!(stats.by_year[0].value, "1994");

  let long = stats.by_duration.iter().find(|t| t.value == "long").unwrap();
  assert_eq!(long.count, 1);
  assert_eq!(stats.by_duration.len(), 5);
}

#[tokio::test]
async fn empty_stats_have_no_averages() {
  let c = catalog().await;
  let stats = c.media_stats().await.unwrap();
  assert_eq!(stats.total_media, 0);
  assert_eq!(stats.rating.average, None);
  assert!(stats.by_duration.iter().all(|t| t.count == 0));

  let directors = c.director_stats().await.unwrap();
  assert_eq!(directors.average_age, None);
}

#[tokio::test]
async fn resource_stats() {
  let c = catalog().await;
  let r = refs(&c).await;
  media(&c, &r, "Pulp Fiction", "1994-10-14", 8.9).await;

  let genres = c.genre_stats().await.unwrap();
  assert_eq!(genres.counts.total, 1);
  let tags: Vec<&str> = genres.top_tags.iter().map(|t| t.value.as_str()).collect();
  assert_eq!(tags, ["heist", "noir"]);
  assert_eq!(genres.most_used[0].count, 1);

  let directors = c.director_stats().await.unwrap();
  assert_eq!(directors.by_nationality[0].value, "American");
  assert!(directors.average_age.unwrap() > 60.0);

  let producers = c.producer_stats().await.unwrap();
  let golden = producers.by_founding_era.iter().find(|t| t.value == "golden").unwrap();
  assert_eq!(golden.count, 1);

  let types = c.type_stats().await.unwrap();
  assert_eq!(types.by_category[0].value, "fiction");
  assert_eq!(types.most_used[0].name, "Película");
}

#[tokio::test]
async fn rankings_are_ordered_and_truncated() {
  let c = catalog().await;
  let r = refs(&c).await;

  // Two Mexican directors, ten single nationalities, plus Tarantino's.
  let mut directors = Vec::new();
  for i in 0..12 {
    let nationality = if i < 2 { "Mexican".to_owned() } else { format!("Nation {i:02}") };
    let d: Director =
      create(&c, json!({ "name": format!("Director {i:02}"), "nationality": nationality })).await;
    directors.push(d.meta.id);
  }

  // Director k directs 6 - k films.
  for (k, director) in directors.iter().take(6).enumerate() {
    for n in 0..(6 - k) {
      create::<Media>(
        &c,
        json!({
          "title": format!("Film {k}-{n}"),
          "type": r.kind,
          "director": director,
          "producer": r.producer,
          "genres": [r.genre],
        }),
      )
      .await;
    }
  }

  let expected: Vec<(Uuid, u64)> = directors[..5].iter().copied().zip([6, 5, 4, 3, 2]).collect();

  let stats = c.director_stats().await.unwrap();
  let prolific: Vec<(Uuid, u64)> = stats.most_prolific.iter().map(|d| (d.id, d.count)).collect();
  assert_eq!(prolific, expected);

  assert_eq!(stats.by_nationality.len(), 10);
  assert_eq!(stats.by_nationality[0].value, "Mexican");
  assert_eq!(stats.by_nationality[0].count, 2);
  let rest: Vec<&str> = stats.by_nationality[1..].iter().map(|t| t.value.as_str()).collect();
  assert_eq!(rest, [
    "American",
    "Nation 02",
    "Nation 03",
    "Nation 04",
    "Nation 05",
    "Nation 06",
    "Nation 07",
    "Nation 08",
    "Nation 09",
  ]);

  let report = c.media_stats().await.unwrap();
  let top: Vec<(Uuid, u64)> = report.top_directors.iter().map(|d| (d.id, d.count)).collect();
  assert_eq!(top, expected);
  assert_eq!(report.top_genres, [Ranked { id: r.genre, name: "Crime".into(), count: 21 }]);
}

// ─── Users ───────────────────────────────────────────────────────────────────

fn account(username: &str, email: &str, role: Role) -> User {
  User::new(
    Registration {
      username: username.into(),
      email:    email.into(),
      password: "secret1".into(),
      profile:  Profile::default(),
    },
    "argon2-hash".into(),
    role,
  )
}

#[tokio::test]
async fn users_roundtrip_and_login_lookup() {
  let s = SqliteStore::open_in_memory().await.unwrap();
  let mut user = account("Alice", "alice@example.com", Role::Admin);
  s.create_user(&user).await.unwrap();

  let found = s.user_by_login("ALICE").await.unwrap().unwrap();
  assert_eq!(found.id, user.id);
  assert_eq!(found.password_hash, "argon2-hash");
  let found = s.user_by_login("alice@example.com").await.unwrap().unwrap();
  assert_eq!(found.role, Role::Admin);

  user.refresh_token = Some("token".into());
  assert!(s.update_user(&user).await.unwrap());
  let found = s.user(user.id).await.unwrap().unwrap();
  assert_eq!(found.refresh_token.as_deref(), Some("token"));
}

#[tokio::test]
async fn duplicate_users_conflict() {
  let s = SqliteStore::open_in_memory().await.unwrap();
  s.create_user(&account("bob", "bob@example.com", Role::User)).await.unwrap();

  let err: Error = s
    .create_user(&account("BOB", "other@example.com", Role::User))
    .await
    .unwrap_err()
    .into();
  assert!(matches!(err, Error::Conflict { .. }));
}

#[tokio::test]
async fn user_listing_and_stats() {
  let s = SqliteStore::open_in_memory().await.unwrap();
  s.create_user(&account("admin", "admin@example.com", Role::Admin)).await.unwrap();
  let mut carol = account("carol", "carol@example.com", Role::User);
  carol.is_active = false;
  s.create_user(&carol).await.unwrap();
  s.create_user(&account("dave", "dave@example.com", Role::User)).await.unwrap();

  let (page, total) = s.list_users(0, 2).await.unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(total, 3);

  let stats = s.user_stats().await.unwrap();
  assert_eq!((stats.total, stats.active, stats.inactive, stats.admins), (3, 2, 1, 1));

  assert!(s.delete_user(carol.id).await.unwrap());
  assert!(s.user(carol.id).await.unwrap().is_none());
}
