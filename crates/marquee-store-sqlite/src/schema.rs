//! SQL schema for the Marquee SQLite store.
//!
//! Executed once at connection startup. Every entity table keeps the full
//! JSON document in `doc`; the other columns mirror fields that need an
//! index or a constraint.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS genres (
    id          TEXT PRIMARY KEY,
    name_key    TEXT NOT NULL UNIQUE,   -- trimmed, lowercased name
    is_active   INTEGER NOT NULL,
    created_by  TEXT NOT NULL,          -- 'system' or a user id
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    doc         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS directors (
    id          TEXT PRIMARY KEY,
    name_key    TEXT NOT NULL UNIQUE,
    is_active   INTEGER NOT NULL,
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    doc         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS producers (
    id          TEXT PRIMARY KEY,
    name_key    TEXT NOT NULL UNIQUE,
    is_active   INTEGER NOT NULL,
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    doc         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS types (
    id          TEXT PRIMARY KEY,
    name_key    TEXT NOT NULL UNIQUE,
    is_active   INTEGER NOT NULL,
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    doc         TEXT NOT NULL
);

-- Titles only need to be unique among active media.
CREATE TABLE IF NOT EXISTS media (
    id           TEXT PRIMARY KEY,
    name_key     TEXT NOT NULL,
    is_active    INTEGER NOT NULL,
    created_by   TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    type_id      TEXT NOT NULL,
    director_id  TEXT NOT NULL,
    producer_id  TEXT NOT NULL,
    doc          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS media_genres (
    media_id  TEXT NOT NULL,
    genre_id  TEXT NOT NULL,
    position  INTEGER NOT NULL,
    PRIMARY KEY (media_id, genre_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS media_active_title_idx
    ON media(name_key) WHERE is_active = 1;
CREATE INDEX IF NOT EXISTS media_type_idx       ON media(type_id);
CREATE INDEX IF NOT EXISTS media_director_idx   ON media(director_id);
CREATE INDEX IF NOT EXISTS media_producer_idx   ON media(producer_id);
CREATE INDEX IF NOT EXISTS media_genres_genre_idx ON media_genres(genre_id);

CREATE TABLE IF NOT EXISTS users (
    id             TEXT PRIMARY KEY,
    username       TEXT NOT NULL,
    username_key   TEXT NOT NULL UNIQUE,
    email          TEXT NOT NULL UNIQUE,   -- stored lowercased
    password_hash  TEXT NOT NULL,
    role           TEXT NOT NULL,          -- 'user' | 'admin'
    is_active      INTEGER NOT NULL,
    profile        TEXT NOT NULL DEFAULT '{}',
    last_login     TEXT,
    refresh_token  TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

PRAGMA user_version = 1;
";
