//! [`SqliteStore`]: the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use marquee_core::{
  entity::{EntityKind, Summary},
  query::{Field, ListQuery, Predicate},
  resource::{Resource, SortKey as _},
  stats::{Dimension, Metric, Ranked, Rollup, StatusCounts, Tally},
  store::CatalogStore,
};

use crate::{
  Error, Result,
  encode::{
    DocRow, decode_doc, decode_uuid, encode_count, encode_id_list, encode_uuid, name_path,
    reference_column, table,
  },
  filter::{compile, dimension_source, order_by, path_of, scalar},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Marquee catalog backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a query returning one `doc` column per row.
  async fn docs<R: Resource>(&self, sql: String, params: Vec<Value>) -> Result<Vec<R>> {
    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|raw| decode_doc(raw)).collect()
  }

  /// `(id, name)` pairs for whichever of `ids` exist in `kind`'s table.
  async fn names(&self, kind: EntityKind, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>> {
    let list = encode_id_list(ids);
    let sql = format!(
      "SELECT id, json_extract(doc, '{}') FROM {} WHERE id IN (SELECT value FROM json_each(?1))",
      name_path(kind),
      table(kind),
    );

    let raws: Vec<(String, Option<String>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![list], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(id, name)| Ok((decode_uuid(&id)?, name.unwrap_or_default())))
      .collect()
  }
}

// ─── Row writes ──────────────────────────────────────────────────────────────

fn insert_row(conn: &rusqlite::Connection, row: &DocRow) -> rusqlite::Result<()> {
  if row.kind == EntityKind::Media {
    conn.execute(
      "INSERT INTO media (
         id, name_key, is_active, created_by, created_at, updated_at,
         type_id, director_id, producer_id, doc
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      rusqlite::params![
        row.id,
        row.name_key,
        row.is_active,
        row.created_by,
        row.created_at,
        row.updated_at,
        row.reference(EntityKind::Type).unwrap_or_default(),
        row.reference(EntityKind::Director).unwrap_or_default(),
        row.reference(EntityKind::Producer).unwrap_or_default(),
        row.doc,
      ],
    )?;
    insert_genre_links(conn, row)?;
  } else {
    conn.execute(
      &format!(
        "INSERT INTO {} (id, name_key, is_active, created_by, created_at, updated_at, doc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        table(row.kind)
      ),
      rusqlite::params![
        row.id,
        row.name_key,
        row.is_active,
        row.created_by,
        row.created_at,
        row.updated_at,
        row.doc,
      ],
    )?;
  }
  Ok(())
}

fn update_row(conn: &rusqlite::Connection, row: &DocRow) -> rusqlite::Result<usize> {
  if row.kind == EntityKind::Media {
    let changed = conn.execute(
      "UPDATE media SET
         name_key = ?2, is_active = ?3, updated_at = ?4,
         type_id = ?5, director_id = ?6, producer_id = ?7, doc = ?8
       WHERE id = ?1",
      rusqlite::params![
        row.id,
        row.name_key,
        row.is_active,
        row.updated_at,
        row.reference(EntityKind::Type).unwrap_or_default(),
        row.reference(EntityKind::Director).unwrap_or_default(),
        row.reference(EntityKind::Producer).unwrap_or_default(),
        row.doc,
      ],
    )?;
    if changed > 0 {
      conn.execute(
        "DELETE FROM media_genres WHERE media_id = ?1",
        rusqlite::params![row.id],
      )?;
      insert_genre_links(conn, row)?;
    }
    Ok(changed)
  } else {
    conn.execute(
      &format!(
        "UPDATE {} SET name_key = ?2, is_active = ?3, updated_at = ?4, doc = ?5 WHERE id = ?1",
        table(row.kind)
      ),
      rusqlite::params![row.id, row.name_key, row.is_active, row.updated_at, row.doc],
    )
  }
}

fn insert_genre_links(conn: &rusqlite::Connection, row: &DocRow) -> rusqlite::Result<()> {
  let mut stmt = conn
    .prepare_cached("INSERT INTO media_genres (media_id, genre_id, position) VALUES (?1, ?2, ?3)")?;
  for (position, genre) in row.genres().enumerate() {
    stmt.execute(rusqlite::params![row.id, genre, position as i64])?;
  }
  Ok(())
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert<R: Resource>(&self, doc: &R) -> Result<()> {
    let row = DocRow::encode(doc)?;
    let duplicate = row.duplicate_message();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        insert_row(&tx, &row)?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(|e| Error::on_write(e, || duplicate))
  }

  async fn insert_many<R: Resource>(&self, docs: Vec<R>) -> Result<Vec<Result<()>>> {
    let rows = docs.iter().map(DocRow::encode).collect::<Result<Vec<_>>>()?;
    let duplicates: Vec<String> = rows.iter().map(DocRow::duplicate_message).collect();

    // Each row gets its own savepoint so one failure leaves the rest intact.
    let outcomes: Vec<rusqlite::Result<()>> = self
      .conn
      .call(move |conn| {
        let mut tx = conn.transaction()?;
        let mut outcomes = Vec::with_capacity(rows.len());
        for row in &rows {
          let sp = tx.savepoint()?;
          match insert_row(&sp, row) {
            Ok(()) => outcomes.push(sp.commit()),
            Err(e) => outcomes.push(Err(e)),
          }
        }
        tx.commit()?;
        Ok(outcomes)
      })
      .await?;

    let results: Vec<Result<()>> = outcomes
      .into_iter()
      .zip(duplicates)
      .map(|(outcome, duplicate)| {
        outcome.map_err(|e| Error::on_write(tokio_rusqlite::Error::Rusqlite(e), || duplicate))
      })
      .collect();
    tracing::debug!(
      kind = %R::KIND,
      rows = results.len(),
      failed = results.iter().filter(|r| r.is_err()).count(),
      "insert_many"
    );
    Ok(results)
  }

  async fn replace<R: Resource>(&self, doc: &R) -> Result<bool> {
    let row = DocRow::encode(doc)?;
    let duplicate = row.duplicate_message();

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = update_row(&tx, &row)?;
        tx.commit()?;
        Ok(changed)
      })
      .await
      .map_err(|e| Error::on_write(e, || duplicate))?;
    Ok(changed > 0)
  }

  async fn remove(&self, kind: EntityKind, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let sql = format!("DELETE FROM {} WHERE id = ?1", table(kind));

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(&sql, rusqlite::params![id_str])?;
        if kind == EntityKind::Media {
          tx.execute("DELETE FROM media_genres WHERE media_id = ?1", rusqlite::params![id_str])?;
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get<R: Resource>(&self, id: Uuid) -> Result<Option<R>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT doc FROM {} WHERE id = ?1", table(R::KIND));

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(&sql, rusqlite::params![id_str], |row| row.get(0))
          .optional()?)
      })
      .await?;

    raw.as_deref().map(decode_doc).transpose()
  }

  async fn find<R: Resource>(&self, query: &ListQuery<R::Sort>) -> Result<Vec<R>> {
    let clause = compile(&query.terms);
    let sql = format!(
      "SELECT doc FROM {} WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
      table(R::KIND),
      clause.sql,
      order_by(query.sort.field(), query.order),
    );
    let mut params = clause.params;
    params.push(Value::Integer(encode_count(query.limit, "limit")?));
    params.push(Value::Integer(encode_count(query.skip(), "page")?));

    self.docs(sql, params).await
  }

  async fn count(&self, kind: EntityKind, terms: &[Predicate]) -> Result<u64> {
    let clause = compile(terms);
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", table(kind), clause.sql);
    let params = clause.params;

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?)
      })
      .await?;
    Ok(n as u64)
  }

  async fn list_active<R: Resource>(&self) -> Result<Vec<R>> {
    let sql = format!(
      "SELECT doc FROM {} WHERE is_active = 1 ORDER BY name_key ASC, id ASC",
      table(R::KIND)
    );
    self.docs(sql, Vec::new()).await
  }

  async fn key_taken(&self, kind: EntityKind, key: &str, except: Option<Uuid>) -> Result<bool> {
    let key = key.to_owned();
    let except = except.map(encode_uuid).unwrap_or_default();
    let active_only = if kind == EntityKind::Media { "AND is_active = 1" } else { "" };
    let sql = format!(
      "SELECT EXISTS (SELECT 1 FROM {} WHERE name_key = ?1 AND id != ?2 {active_only})",
      table(kind)
    );

    let taken: bool = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params![key, except], |row| row.get(0))?)
      })
      .await?;
    Ok(taken)
  }

  async fn missing_ids(&self, kind: EntityKind, ids: Vec<Uuid>) -> Result<Vec<Uuid>> {
    let found = self.names(kind, &ids).await?;
    Ok(
      ids
        .into_iter()
        .filter(|id| !found.iter().any(|(f, _)| f == id))
        .collect(),
    )
  }

  async fn count_dependents(&self, kind: EntityKind, id: Uuid, active_only: bool) -> Result<u64> {
    let sql = match (kind, reference_column(kind)) {
      (_, Some(column)) => format!(
        "SELECT COUNT(*) FROM media WHERE {column} = ?1 AND (?2 = 0 OR is_active = 1)"
      ),
      (EntityKind::Genre, None) => "SELECT COUNT(*) FROM media_genres g
         JOIN media m ON m.id = g.media_id
         WHERE g.genre_id = ?1 AND (?2 = 0 OR m.is_active = 1)"
        .to_owned(),
      _ => return Ok(0),
    };
    let id_str = encode_uuid(id);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params![id_str, active_only], |row| row.get(0))?)
      })
      .await?;
    Ok(n as u64)
  }

  async fn summaries(&self, kind: EntityKind, ids: Vec<Uuid>) -> Result<Vec<Summary>> {
    let found = self.names(kind, &ids).await?;
    Ok(
      ids
        .into_iter()
        .filter_map(|id| {
          found
            .iter()
            .find(|(f, _)| *f == id)
            .map(|(_, name)| Summary { id, name: name.clone() })
        })
        .collect(),
    )
  }

  // ── Aggregation ───────────────────────────────────────────────────────────

  async fn status_counts(&self, kind: EntityKind) -> Result<StatusCounts> {
    let sql = format!("SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM {}", table(kind));

    let (total, active): (i64, i64) = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))?))
      .await?;
    Ok(StatusCounts {
      total:    total as u64,
      active:   active as u64,
      inactive: (total - active) as u64,
    })
  }

  async fn tally(&self, kind: EntityKind, dimension: Dimension, limit: u64) -> Result<Vec<Tally>> {
    let sql = format!(
      "SELECT CAST(v AS TEXT) AS value, COUNT(*) AS c FROM ({})
       WHERE v IS NOT NULL AND CAST(v AS TEXT) != ''
       GROUP BY value ORDER BY c DESC, value ASC LIMIT ?1",
      dimension_source(table(kind), dimension)
    );
    let limit = encode_count(limit, "limit")?;

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(value, count)| Tally { value, count: count as u64 })
        .collect(),
    )
  }

  async fn rank_references(&self, target: EntityKind, limit: u64) -> Result<Vec<Ranked>> {
    let source = match (target, reference_column(target)) {
      (_, Some(column)) => {
        format!("SELECT {column} AS ref FROM media WHERE is_active = 1")
      }
      (EntityKind::Genre, None) => "SELECT g.genre_id AS ref FROM media_genres g
         JOIN media m ON m.id = g.media_id WHERE m.is_active = 1"
        .to_owned(),
      _ => return Ok(Vec::new()),
    };
    let sql = format!(
      "SELECT t.id, json_extract(t.doc, '{}') AS name, COUNT(*) AS c
       FROM ({source}) r JOIN {} t ON t.id = r.ref
       GROUP BY t.id ORDER BY c DESC, name ASC LIMIT ?1",
      name_path(target),
      table(target),
    );
    let limit = encode_count(limit, "limit")?;

    let rows: Vec<(String, Option<String>, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, name, count)| {
        Ok(Ranked { id: decode_uuid(&id)?, name: name.unwrap_or_default(), count: count as u64 })
      })
      .collect()
  }

  async fn rollup(&self, kind: EntityKind, metric: Metric) -> Result<Rollup> {
    let expr = match metric {
      Metric::Value(field) => numeric(field),
      Metric::YearsSince(field) => {
        let d = scalar(path_of(field));
        format!(
          "CASE WHEN {d} IS NOT NULL THEN
             (CAST(strftime('%Y', 'now') AS INTEGER) - CAST(strftime('%Y', {d}) AS INTEGER))
             - (strftime('%m-%d', 'now') < strftime('%m-%d', {d}))
           END"
        )
      }
    };
    let sql = format!(
      "SELECT AVG(x), MIN(x), MAX(x) FROM (SELECT {expr} AS x FROM {} WHERE is_active = 1)",
      table(kind)
    );

    let (average, min, max): (Option<f64>, Option<f64>, Option<f64>) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?)
      })
      .await?;
    Ok(Rollup { average, min, max })
  }

  async fn values(&self, kind: EntityKind, field: Field) -> Result<Vec<Option<f64>>> {
    let sql = format!("SELECT {} FROM {} WHERE is_active = 1", numeric(field), table(kind));

    let values = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<Option<f64>>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(values)
  }
}

/// The value at `field` when it is a JSON number, NULL otherwise.
fn numeric(field: Field) -> String {
  let path = path_of(field);
  format!(
    "CASE WHEN json_type(doc, '{path}') IN ('integer', 'real') THEN json_extract(doc, '{path}') END"
  )
}
