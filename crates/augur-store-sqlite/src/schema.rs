//! SQL schema for the Augur SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    display_name  TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS personas (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id              INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    display_name         TEXT NOT NULL,
    description          TEXT,
    birth_date           TEXT,
    birth_time           TEXT,            -- HH:MM
    birth_location       TEXT,
    gender               TEXT,
    character_archetypes TEXT NOT NULL DEFAULT '[]',
    created_at           TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at           TEXT NOT NULL,
    UNIQUE (user_id, display_name)
);

-- A persona cannot be removed while readings point at it.
CREATE TABLE IF NOT EXISTS readings (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    persona_id       INTEGER REFERENCES personas(id) ON DELETE RESTRICT,
    method           TEXT NOT NULL CHECK (method IN (
                       'LifePathNumber', 'Palmistry', 'Astrology',
                       'MBTI', 'Tarot', 'Integrated')),
    main_question    TEXT NOT NULL,
    output_text      TEXT NOT NULL,
    input_data       TEXT,            -- JSON object or NULL
    status           TEXT NOT NULL DEFAULT 'pending' CHECK (status IN (
                       'pending', 'processing', 'completed', 'failed')),
    ai_model_used    TEXT,
    processing_time  INTEGER,
    confidence_score INTEGER CHECK (confidence_score BETWEEN 1 AND 100),
    is_favorite      INTEGER NOT NULL DEFAULT 0,
    user_rating      INTEGER CHECK (user_rating BETWEEN 1 AND 5),
    user_feedback    TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reading_sources (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    integrated_reading_id INTEGER NOT NULL REFERENCES readings(id) ON DELETE CASCADE,
    source_reading_id     INTEGER NOT NULL REFERENCES readings(id) ON DELETE CASCADE,
    weight                INTEGER NOT NULL DEFAULT 1,
    created_at            TEXT NOT NULL,
    UNIQUE (integrated_reading_id, source_reading_id),
    CHECK  (integrated_reading_id != source_reading_id)
);

-- Only an Integrated reading may aggregate, and it may only aggregate
-- ordinary readings.
CREATE TRIGGER IF NOT EXISTS reading_sources_integrated_side
BEFORE INSERT ON reading_sources
WHEN (SELECT method FROM readings WHERE id = NEW.integrated_reading_id)
     IS NOT 'Integrated'
BEGIN
    SELECT RAISE(ABORT, 'aggregate side of a reading source must be Integrated');
END;

CREATE TRIGGER IF NOT EXISTS reading_sources_source_side
BEFORE INSERT ON reading_sources
WHEN (SELECT method FROM readings WHERE id = NEW.source_reading_id)
     IS 'Integrated'
BEGIN
    SELECT RAISE(ABORT, 'source side of a reading source must not be Integrated');
END;

CREATE INDEX IF NOT EXISTS personas_user_created_idx  ON personas(user_id, created_at);
CREATE INDEX IF NOT EXISTS readings_user_created_idx  ON readings(user_id, created_at);
CREATE INDEX IF NOT EXISTS readings_persona_idx       ON readings(persona_id, created_at);
CREATE INDEX IF NOT EXISTS readings_user_method_idx   ON readings(user_id, method);
CREATE INDEX IF NOT EXISTS reading_sources_source_idx ON reading_sources(source_reading_id);

PRAGMA user_version = 1;
";
