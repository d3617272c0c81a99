//! `POST /bulk/<resource>` and `POST /bulk/all`.
//!
//! Both answer 201 with a per-item report even when some items failed; only
//! an empty payload or an unusable store fails the request as a whole.

use axum::{Json, extract::State, http::StatusCode};
use marquee_core::{
  actor::Actor,
  bulk::{BulkReport, Bundle, KindReport},
};
use serde_json::Value;

use crate::{
  ApiState, Backend,
  envelope::{Created, Envelope},
  extract::Body,
  resources::Endpoint,
};

/// `POST /bulk/<resource>`, body: a JSON array of drafts.
pub async fn ingest<R: Endpoint, S: Backend>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Body(items): Body<Vec<Value>>,
) -> Created<KindReport> {
  let report = state.catalog.bulk::<R>(items, &actor).await?;
  let message = format!(
    "{} of {} {} records created",
    report.created_count,
    report.total_requested,
    R::KIND
  );
  Ok((StatusCode::CREATED, Json(Envelope::success(report).with_message(message))))
}

/// `POST /bulk/all`, body: `{genres?, directors?, producers?, types?, media?}`.
pub async fn ingest_all<S: Backend>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Body(bundle): Body<Bundle>,
) -> Created<BulkReport> {
  let report = state.catalog.bulk_all(bundle, &actor).await?;
  let message = format!(
    "{} of {} records created",
    report.total_created, report.total_requested
  );
  Ok((StatusCode::CREATED, Json(Envelope::success(report).with_message(message))))
}
