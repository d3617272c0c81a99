//! [`UserStore`] for [`SqliteStore`].

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use marquee_core::{
  store::UserStore,
  user::{User, UserStats},
};

use crate::{
  Error, Result, SqliteStore,
  encode::{RawUser, USER_COLUMNS, UserRow, encode_count, encode_uuid},
};

const DUPLICATE_USER: &str = "username or email already registered";

impl UserStore for SqliteStore {
  type Error = Error;

  async fn create_user(&self, user: &User) -> Result<()> {
    let row = UserRow::encode(user)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             id, username, username_key, email, password_hash, role, is_active,
             profile, last_login, refresh_token, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            row.id,
            row.username,
            row.username_key,
            row.email,
            row.password_hash,
            row.role,
            row.is_active,
            row.profile,
            row.last_login,
            row.refresh_token,
            row.created_at,
            row.updated_at,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| Error::on_write(e, || DUPLICATE_USER.to_owned()))
  }

  async fn user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn user_by_login(&self, login: &str) -> Result<Option<User>> {
    let key = login.trim().to_lowercase();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {USER_COLUMNS} FROM users WHERE username_key = ?1 OR email = ?1 LIMIT 1"
            ),
            rusqlite::params![key],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn update_user(&self, user: &User) -> Result<bool> {
    let row = UserRow::encode(user)?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET
             username = ?2, username_key = ?3, email = ?4, password_hash = ?5,
             role = ?6, is_active = ?7, profile = ?8, last_login = ?9,
             refresh_token = ?10, updated_at = ?11
           WHERE id = ?1",
          rusqlite::params![
            row.id,
            row.username,
            row.username_key,
            row.email,
            row.password_hash,
            row.role,
            row.is_active,
            row.profile,
            row.last_login,
            row.refresh_token,
            row.updated_at,
          ],
        )?)
      })
      .await
      .map_err(|e| Error::on_write(e, || DUPLICATE_USER.to_owned()))?;
    Ok(changed > 0)
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id_str])?))
      .await?;
    Ok(changed > 0)
  }

  async fn list_users(&self, offset: u64, limit: u64) -> Result<(Vec<User>, u64)> {
    let (limit, offset) = (encode_count(limit, "limit")?, encode_count(offset, "page")?);
    let (raws, total): (Vec<RawUser>, i64) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id ASC LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let total = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok((rows, total))
      })
      .await?;

    let users = raws
      .into_iter()
      .map(RawUser::into_user)
      .collect::<Result<Vec<_>>>()?;
    Ok((users, total as u64))
  }

  async fn user_stats(&self) -> Result<UserStats> {
    let (total, active, admins): (i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(SUM(is_active), 0),
                  COALESCE(SUM(role = 'admin'), 0)
           FROM users",
          [],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?)
      })
      .await?;

    Ok(UserStats {
      total:    total as u64,
      active:   active as u64,
      inactive: (total - active) as u64,
      admins:   admins as u64,
    })
  }
}
