//! [`SqliteStore`]: the SQLite implementation of [`DivinationStore`].

use std::{collections::BTreeMap, path::Path};

use augur_core::{
  DivinationMethod, UserId,
  batch::{
    self, BatchOutcome, NewBatch, RECENT_READINGS, RecentReading, Summary,
    SummaryStatistics, UserInfo,
  },
  method::extract_input,
  persona::{NewPersona, Persona, PersonaPatch, PersonaStatistics, PersonaStats},
  reading::{
    IntegratedSummary, NewReading, Reading, ReadingDetails, ReadingPatch,
    ReadingQuery, ReadingSource, ReadingStatus, SourceSummary,
  },
  store::DivinationStore,
  user::User,
};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, Transaction};

use crate::{
  Error, Result,
  encode::{
    PERSONA_COLUMNS, READING_COLUMNS, RawPersona, RawReading, RawSource,
    RawUser, USER_COLUMNS, decode_dt, decode_method, encode_dt, encode_input,
    encode_tags,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Augur store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
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

  /// Run a read-only closure on the connection thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside one transaction. The transaction commits only when `f`
  /// returns `Ok`; any error (or panic) drops it, which rolls back every
  /// write `f` made.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match f(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn now() -> String { encode_dt(Utc::now()) }

fn fetch_user(conn: &Connection, user: UserId) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
      rusqlite::params![user.0],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

fn require_user(conn: &Connection, user: UserId) -> Result<()> {
  let exists = conn
    .query_row(
      "SELECT 1 FROM users WHERE id = ?1",
      rusqlite::params![user.0],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if exists {
    Ok(())
  } else {
    Err(augur_core::Error::UserNotFound(user).into())
  }
}

fn query_personas(
  conn: &Connection,
  clause: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<Persona>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {PERSONA_COLUMNS} FROM personas p {clause}"))?;
  let raws = stmt
    .query_map(params, RawPersona::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawPersona::into_persona).collect()
}

fn fetch_persona(conn: &Connection, user: UserId, id: i64) -> Result<Option<Persona>> {
  Ok(
    query_personas(
      conn,
      "WHERE p.id = ?1 AND p.user_id = ?2",
      rusqlite::params![id, user.0],
    )?
    .pop(),
  )
}

fn fetch_persona_by_name(
  conn: &Connection,
  user: UserId,
  name: &str,
) -> Result<Option<Persona>> {
  Ok(
    query_personas(
      conn,
      "WHERE p.user_id = ?1 AND p.display_name = ?2",
      rusqlite::params![user.0, name],
    )?
    .pop(),
  )
}

fn insert_persona(conn: &Connection, user: UserId, input: &NewPersona) -> Result<Persona> {
  let at = now();
  conn.execute(
    "INSERT INTO personas (
       user_id, display_name, description, birth_date, birth_time,
       birth_location, gender, character_archetypes, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    rusqlite::params![
      user.0,
      input.display_name,
      input.description,
      input.birth_date,
      input.birth_time,
      input.birth_location,
      input.gender,
      encode_tags(&input.character_archetypes)?,
      at,
    ],
  )?;
  let id = conn.last_insert_rowid();
  fetch_persona(conn, user, id)?.ok_or_else(|| augur_core::Error::PersonaNotFound(id).into())
}

fn query_readings(
  conn: &Connection,
  clause: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<Reading>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {READING_COLUMNS} FROM readings {clause}"))?;
  let raws = stmt
    .query_map(params, RawReading::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawReading::into_reading).collect()
}

fn fetch_reading(conn: &Connection, user: UserId, id: i64) -> Result<Option<Reading>> {
  Ok(
    query_readings(conn, "WHERE id = ?1 AND user_id = ?2", rusqlite::params![id, user.0])?
      .pop(),
  )
}

/// Insert a reading with status `completed`. Ownership of `persona_id` is the
/// caller's responsibility.
fn insert_reading(conn: &Connection, user: UserId, input: &NewReading) -> Result<Reading> {
  let at = now();
  conn.execute(
    "INSERT INTO readings (
       user_id, persona_id, method, main_question, output_text, input_data,
       status, ai_model_used, processing_time, confidence_score,
       created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
    rusqlite::params![
      user.0,
      input.persona_id,
      input.method.as_ref(),
      input.main_question,
      input.output_text,
      encode_input(input.input_data.as_ref())?,
      ReadingStatus::Completed.as_ref(),
      input.ai_model_used,
      input.processing_time,
      input.confidence_score,
      at,
    ],
  )?;
  let id = conn.last_insert_rowid();
  fetch_reading(conn, user, id)?.ok_or_else(|| augur_core::Error::ReadingNotFound(id).into())
}

fn insert_link(
  conn: &Connection,
  integrated_reading_id: i64,
  source_reading_id: i64,
  weight: i64,
) -> Result<ReadingSource> {
  let at = now();
  conn.execute(
    "INSERT INTO reading_sources (
       integrated_reading_id, source_reading_id, weight, created_at
     ) VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![integrated_reading_id, source_reading_id, weight, at],
  )?;
  RawSource {
    id: conn.last_insert_rowid(),
    integrated_reading_id,
    source_reading_id,
    weight,
    created_at: at,
  }
  .into_source()
}

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<u64> {
  let n: i64 = conn.query_row(sql, params, |r| r.get(0))?;
  Ok(n.max(0) as u64)
}

fn method_breakdown(
  conn: &Connection,
  clause: &str,
  params: impl rusqlite::Params,
) -> Result<BTreeMap<String, u64>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT method, COUNT(*) FROM readings {clause} GROUP BY method"
  ))?;
  let rows = stmt
    .query_map(params, |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows.into_iter().map(|(m, n)| (m, n.max(0) as u64)).collect())
}

fn integrity(reason: impl Into<String>) -> Error {
  augur_core::Error::Validation { field: "method", reason: reason.into() }.into()
}

// ─── Batch orchestration ─────────────────────────────────────────────────────

/// The body of [`DivinationStore::submit_batch`]. Runs inside the caller's
/// transaction; returning `Err` at any point discards every row written here.
fn apply_batch(tx: &Transaction<'_>, user: UserId, batch: NewBatch) -> Result<BatchOutcome> {
  require_user(tx, user)?;

  if batch.individual_reports.is_empty() {
    return Err(
      augur_core::Error::Validation {
        field:  "individual_reports",
        reason: "at least one report is required".into(),
      }
      .into(),
    );
  }

  let persona_id = match fetch_persona_by_name(tx, user, &batch.persona_name)? {
    Some(existing) => existing.id,
    None => {
      insert_persona(tx, user, &NewPersona::from_session(&batch.persona_name))?.id
    }
  };

  let share =
    batch::processing_share(batch.total_processing_time, batch.individual_reports.len());

  let mut individual = Vec::with_capacity(batch.individual_reports.len());
  for (tag, text) in &batch.individual_reports {
    let method = DivinationMethod::parse(tag)?;
    if method.is_integrated() {
      return Err(integrity(
        "Integrated is produced from the batch's integrated report, not listed as an individual method",
      ));
    }
    let reading = insert_reading(tx, user, &NewReading {
      persona_id:       Some(persona_id),
      method,
      main_question:    batch.primary_question.clone(),
      output_text:      text.clone(),
      input_data:       Some(extract_input(method, &batch.input_data)),
      ai_model_used:    batch.ai_model_used.clone(),
      processing_time:  share,
      confidence_score: None,
    })?;
    individual.push(reading);
  }

  let mut links = Vec::new();
  let integrated = match &batch.integrated_report {
    Some(text) => {
      let methods: Vec<DivinationMethod> = individual.iter().map(|r| r.method).collect();
      let aggregate = insert_reading(tx, user, &NewReading {
        persona_id:       Some(persona_id),
        method:           DivinationMethod::Integrated,
        main_question:    batch.primary_question.clone(),
        output_text:      text.clone(),
        input_data:       Some(batch::integrated_input(
          &methods,
          batch.character_archetypes.as_deref(),
        )),
        ai_model_used:    batch.ai_model_used.clone(),
        processing_time:  batch.total_processing_time,
        confidence_score: None,
      })?;
      for source in &individual {
        links.push(insert_link(tx, aggregate.id, source.id, 1)?);
      }
      Some(aggregate)
    }
    None => None,
  };

  let persona = fetch_persona(tx, user, persona_id)?
    .ok_or(augur_core::Error::PersonaNotFound(persona_id))?;

  Ok(BatchOutcome {
    persona,
    individual_readings: individual,
    integrated_reading: integrated,
    links,
  })
}

// ─── DivinationStore impl ────────────────────────────────────────────────────

impl DivinationStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn ensure_user(&self, username: &str) -> Result<User> {
    let username = username.to_owned();
    self
      .write(move |tx| {
        tx.execute(
          "INSERT OR IGNORE INTO users (username, created_at) VALUES (?1, ?2)",
          rusqlite::params![username, now()],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
          rusqlite::params![username],
          RawUser::from_row,
        )?;
        raw.into_user()
      })
      .await
  }

  async fn get_user(&self, user: UserId) -> Result<Option<User>> {
    self.read(move |conn| fetch_user(conn, user)).await
  }

  async fn ping(&self) -> Result<()> {
    self
      .read(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await
  }

  // ── Personas ──────────────────────────────────────────────────────────────

  async fn create_persona(&self, user: UserId, input: NewPersona) -> Result<Persona> {
    let persona = self
      .write(move |tx| {
        require_user(tx, user)?;
        match fetch_persona_by_name(tx, user, &input.display_name)? {
          Some(existing) => Ok(existing),
          None => insert_persona(tx, user, &input.with_default_description()),
        }
      })
      .await?;
    tracing::debug!(persona_id = persona.id, %user, "persona ready");
    Ok(persona)
  }

  async fn get_persona(&self, user: UserId, id: i64) -> Result<Option<Persona>> {
    self.read(move |conn| fetch_persona(conn, user, id)).await
  }

  async fn list_personas(&self, user: UserId) -> Result<Vec<Persona>> {
    self
      .read(move |conn| {
        query_personas(
          conn,
          "WHERE p.user_id = ?1 ORDER BY p.created_at DESC, p.id DESC",
          rusqlite::params![user.0],
        )
      })
      .await
  }

  async fn find_persona_by_name(&self, user: UserId, name: &str) -> Result<Option<Persona>> {
    let name = name.trim().to_owned();
    self.read(move |conn| fetch_persona_by_name(conn, user, &name)).await
  }

  async fn search_personas(&self, user: UserId, fragment: &str) -> Result<Vec<Persona>> {
    let escaped = fragment
      .trim()
      .replace('\\', "\\\\")
      .replace('%', "\\%")
      .replace('_', "\\_");
    let pattern = format!("%{escaped}%");
    self
      .read(move |conn| {
        query_personas(
          conn,
          "WHERE p.user_id = ?1 AND p.display_name LIKE ?2 ESCAPE '\\'
           ORDER BY p.created_at DESC, p.id DESC",
          rusqlite::params![user.0, pattern],
        )
      })
      .await
  }

  async fn update_persona(
    &self,
    user: UserId,
    id: i64,
    patch: PersonaPatch,
  ) -> Result<Persona> {
    self
      .write(move |tx| {
        let current =
          fetch_persona(tx, user, id)?.ok_or(augur_core::Error::PersonaNotFound(id))?;

        if let Some(name) = &patch.display_name
          && *name != current.display_name
          && fetch_persona_by_name(tx, user, name)?.is_some()
        {
          return Err(augur_core::Error::DuplicatePersonaName(name.clone()).into());
        }

        let archetypes = patch
          .character_archetypes
          .as_deref()
          .map(encode_tags)
          .transpose()?;

        tx.execute(
          "UPDATE personas SET
             display_name         = COALESCE(?1, display_name),
             description          = COALESCE(?2, description),
             birth_date           = COALESCE(?3, birth_date),
             birth_time           = COALESCE(?4, birth_time),
             birth_location       = COALESCE(?5, birth_location),
             gender               = COALESCE(?6, gender),
             character_archetypes = COALESCE(?7, character_archetypes),
             updated_at           = ?8
           WHERE id = ?9 AND user_id = ?10",
          rusqlite::params![
            patch.display_name,
            patch.description,
            patch.birth_date,
            patch.birth_time,
            patch.birth_location,
            patch.gender,
            archetypes,
            now(),
            id,
            user.0,
          ],
        )?;

        fetch_persona(tx, user, id)?
          .ok_or_else(|| augur_core::Error::PersonaNotFound(id).into())
      })
      .await
  }

  async fn delete_persona(&self, user: UserId, id: i64) -> Result<()> {
    self
      .write(move |tx| {
        let persona =
          fetch_persona(tx, user, id)?.ok_or(augur_core::Error::PersonaNotFound(id))?;
        if persona.reading_count > 0 {
          return Err(
            augur_core::Error::PersonaHasReadings {
              persona_id: id,
              count:      persona.reading_count,
            }
            .into(),
          );
        }
        tx.execute(
          "DELETE FROM personas WHERE id = ?1 AND user_id = ?2",
          rusqlite::params![id, user.0],
        )?;
        Ok(())
      })
      .await?;
    tracing::debug!(persona_id = id, %user, "persona deleted");
    Ok(())
  }

  async fn persona_stats(&self, user: UserId, id: i64) -> Result<PersonaStats> {
    self
      .read(move |conn| {
        let persona =
          fetch_persona(conn, user, id)?.ok_or(augur_core::Error::PersonaNotFound(id))?;

        let (total, completed, favorites): (i64, i64, i64) = conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(SUM(status = 'completed'), 0),
                  COALESCE(SUM(is_favorite), 0)
           FROM readings WHERE persona_id = ?1 AND user_id = ?2",
          rusqlite::params![id, user.0],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;

        let method_breakdown = method_breakdown(
          conn,
          "WHERE persona_id = ?1 AND user_id = ?2",
          rusqlite::params![id, user.0],
        )?;

        Ok(PersonaStats {
          persona,
          statistics: PersonaStatistics {
            total_readings: total.max(0) as u64,
            completed_readings: completed.max(0) as u64,
            favorite_readings: favorites.max(0) as u64,
            method_breakdown,
          },
        })
      })
      .await
  }

  // ── Readings ──────────────────────────────────────────────────────────────

  async fn create_reading(&self, user: UserId, input: NewReading) -> Result<Reading> {
    if input.method.is_integrated() {
      return Err(integrity(
        "Integrated readings are only created by batch submission",
      ));
    }
    self
      .write(move |tx| {
        require_user(tx, user)?;
        if let Some(persona_id) = input.persona_id
          && fetch_persona(tx, user, persona_id)?.is_none()
        {
          return Err(augur_core::Error::PersonaNotFound(persona_id).into());
        }
        insert_reading(tx, user, &input)
      })
      .await
  }

  async fn get_reading(&self, user: UserId, id: i64) -> Result<Option<Reading>> {
    self.read(move |conn| fetch_reading(conn, user, id)).await
  }

  async fn list_readings(&self, user: UserId, query: ReadingQuery) -> Result<Vec<Reading>> {
    let method = query.method.map(|m| m.as_ref().to_owned());
    self
      .read(move |conn| {
        query_readings(
          conn,
          "WHERE user_id = ?1
             AND (?2 IS NULL OR persona_id = ?2)
             AND (?3 IS NULL OR method = ?3)
             AND (?4 = 0 OR is_favorite = 1)
           ORDER BY created_at DESC, id DESC
           LIMIT ?5 OFFSET ?6",
          rusqlite::params![
            user.0,
            query.persona_id,
            method,
            query.favorites_only,
            query.limit,
            query.offset,
          ],
        )
      })
      .await
  }

  async fn update_reading(
    &self,
    user: UserId,
    id: i64,
    patch: ReadingPatch,
  ) -> Result<Reading> {
    self
      .write(move |tx| {
        let changed = tx.execute(
          "UPDATE readings SET
             is_favorite   = COALESCE(?1, is_favorite),
             user_rating   = COALESCE(?2, user_rating),
             user_feedback = COALESCE(?3, user_feedback),
             updated_at    = ?4
           WHERE id = ?5 AND user_id = ?6",
          rusqlite::params![
            patch.is_favorite,
            patch.user_rating,
            patch.user_feedback,
            now(),
            id,
            user.0,
          ],
        )?;
        if changed == 0 {
          return Err(augur_core::Error::ReadingNotFound(id).into());
        }
        fetch_reading(tx, user, id)?
          .ok_or_else(|| augur_core::Error::ReadingNotFound(id).into())
      })
      .await
  }

  async fn delete_reading(&self, user: UserId, id: i64) -> Result<()> {
    self
      .write(move |tx| {
        let removed = tx.execute(
          "DELETE FROM readings WHERE id = ?1 AND user_id = ?2",
          rusqlite::params![id, user.0],
        )?;
        if removed == 0 {
          return Err(augur_core::Error::ReadingNotFound(id).into());
        }
        Ok(())
      })
      .await
  }

  async fn reading_details(&self, user: UserId, id: i64) -> Result<ReadingDetails> {
    self
      .read(move |conn| {
        let reading =
          fetch_reading(conn, user, id)?.ok_or(augur_core::Error::ReadingNotFound(id))?;

        let mut details = ReadingDetails {
          reading,
          source_readings: Vec::new(),
          integrated_readings: Vec::new(),
        };

        if details.reading.method.is_integrated() {
          let mut stmt = conn.prepare(
            "SELECT r.id, r.method, r.main_question, rs.weight
             FROM reading_sources rs
             JOIN readings r ON r.id = rs.source_reading_id
             WHERE rs.integrated_reading_id = ?1
             ORDER BY rs.id",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![id], |r| {
              Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, i64>(3)?,
              ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          for (id, method, question, weight) in rows {
            details.source_readings.push(SourceSummary {
              id,
              method: decode_method(&method)?,
              question,
              weight,
            });
          }
        } else {
          let mut stmt = conn.prepare(
            "SELECT r.id, r.main_question, r.created_at
             FROM reading_sources rs
             JOIN readings r ON r.id = rs.integrated_reading_id
             WHERE rs.source_reading_id = ?1
             ORDER BY rs.id",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![id], |r| {
              Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
              ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          for (id, question, created_at) in rows {
            details.integrated_readings.push(IntegratedSummary {
              id,
              question,
              created_at: decode_dt(&created_at)?,
            });
          }
        }

        Ok(details)
      })
      .await
  }

  // ── Batch ─────────────────────────────────────────────────────────────────

  async fn submit_batch(&self, user: UserId, batch: NewBatch) -> Result<BatchOutcome> {
    let outcome = self.write(move |tx| apply_batch(tx, user, batch)).await?;
    tracing::info!(
      %user,
      persona_id = outcome.persona.id,
      readings = outcome.individual_readings.len(),
      integrated = outcome.integrated_reading.is_some(),
      links = outcome.links.len(),
      "batch committed"
    );
    Ok(outcome)
  }

  async fn summary(&self, user: UserId) -> Result<Summary> {
    self
      .read(move |conn| {
        let account = fetch_user(conn, user)?.ok_or(augur_core::Error::UserNotFound(user))?;

        let total_personas = count(
          conn,
          "SELECT COUNT(*) FROM personas WHERE user_id = ?1",
          rusqlite::params![user.0],
        )?;
        let total_readings = count(
          conn,
          "SELECT COUNT(*) FROM readings WHERE user_id = ?1",
          rusqlite::params![user.0],
        )?;
        let favorite_readings = count(
          conn,
          "SELECT COUNT(*) FROM readings WHERE user_id = ?1 AND is_favorite = 1",
          rusqlite::params![user.0],
        )?;
        let method_breakdown =
          method_breakdown(conn, "WHERE user_id = ?1", rusqlite::params![user.0])?;

        let recent_readings = query_readings(
          conn,
          "WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
          rusqlite::params![user.0, RECENT_READINGS],
        )?
        .into_iter()
        .map(|r| RecentReading {
          id:          r.id,
          method:      r.method,
          question:    batch::preview_question(&r.main_question),
          created_at:  r.created_at,
          is_favorite: r.is_favorite,
        })
        .collect();

        Ok(Summary {
          user_info: UserInfo {
            id:         account.id,
            username:   account.username,
            created_at: account.created_at,
          },
          statistics: SummaryStatistics {
            total_personas,
            total_readings,
            favorite_readings,
            method_breakdown,
          },
          recent_readings,
        })
      })
      .await
  }

  async fn persona_reading_count(&self, user: UserId, persona_id: i64) -> Result<u64> {
    self
      .read(move |conn| {
        count(
          conn,
          "SELECT COUNT(*) FROM readings WHERE persona_id = ?1 AND user_id = ?2",
          rusqlite::params![persona_id, user.0],
        )
      })
      .await
  }

  async fn delete_persona_readings(&self, user: UserId, persona_id: i64) -> Result<u64> {
    let removed = self
      .write(move |tx| {
        let n = tx.execute(
          "DELETE FROM readings WHERE persona_id = ?1 AND user_id = ?2",
          rusqlite::params![persona_id, user.0],
        )?;
        Ok(n as u64)
      })
      .await?;
    tracing::info!(%user, persona_id, removed, "persona readings deleted");
    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use indexmap::IndexMap;
  use serde_json::Map;

  use super::*;

  async fn store() -> (SqliteStore, UserId) {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let user = s.ensure_user("testuser").await.unwrap();
    (s, user.id)
  }

  fn session(persona: &str) -> NewBatch {
    let mut reports = IndexMap::new();
    reports.insert("Tarot".to_owned(), "The Hermit: look inward.".to_owned());
    reports.insert("Astrology".to_owned(), "Saturn asks for patience.".to_owned());
    NewBatch {
      persona_name:          persona.into(),
      primary_question:      "What should I focus on?".into(),
      individual_reports:    reports,
      input_data:            Map::new(),
      integrated_report:     Some("Slow down and listen.".into()),
      character_archetypes:  None,
      ai_model_used:         None,
      total_processing_time: Some(60),
    }
  }

  async fn row_counts(s: &SqliteStore) -> (u64, u64, u64) {
    s.read(|conn| {
      Ok((
        count(conn, "SELECT COUNT(*) FROM personas", rusqlite::params![])?,
        count(conn, "SELECT COUNT(*) FROM readings", rusqlite::params![])?,
        count(conn, "SELECT COUNT(*) FROM reading_sources", rusqlite::params![])?,
      ))
    })
    .await
    .unwrap()
  }

  fn sqlite_message(e: &Error) -> String {
    match e {
      Error::Sqlite(inner) => inner.to_string(),
      other => panic!("expected an sqlite error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn links_between_ordinary_readings_are_rejected() {
    let (s, user) = store().await;
    let tarot = s
      .create_reading(
        user,
        NewReading::new(DivinationMethod::Tarot, "Which card?", "The Hermit, upright."),
      )
      .await
      .unwrap();
    let mbti = s
      .create_reading(
        user,
        NewReading::new(DivinationMethod::Mbti, "Which type?", "INTJ: the architect."),
      )
      .await
      .unwrap();

    let (a, b) = (tarot.id, mbti.id);
    let err = s.write(move |tx| insert_link(tx, a, b, 1)).await.unwrap_err();
    assert!(sqlite_message(&err).contains("must be Integrated"), "{err}");
    assert_eq!(row_counts(&s).await.2, 0);
  }

  #[tokio::test]
  async fn integrated_readings_cannot_be_sources() {
    let (s, user) = store().await;
    let first = s.submit_batch(user, session("Ada")).await.unwrap();
    let second = s.submit_batch(user, session("Grace")).await.unwrap();
    let first_agg = first.integrated_reading.unwrap().id;
    let second_agg = second.integrated_reading.unwrap().id;

    let err = s
      .write(move |tx| insert_link(tx, first_agg, second_agg, 1))
      .await
      .unwrap_err();
    assert!(sqlite_message(&err).contains("must not be Integrated"), "{err}");

    // An aggregate may still pick up an ordinary reading from elsewhere.
    let stray = second.individual_readings[0].id;
    let link = s
      .write(move |tx| insert_link(tx, first_agg, stray, 2))
      .await
      .unwrap();
    assert_eq!(link.weight, 2);
  }

  #[tokio::test]
  async fn batch_failing_while_linking_rolls_back_everything() {
    let (s, user) = store().await;
    s.write(|tx| {
      tx.execute_batch(
        "CREATE TEMP TRIGGER refuse_links BEFORE INSERT ON reading_sources
         BEGIN SELECT RAISE(ABORT, 'links refused'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

    let err = s.submit_batch(user, session("Ada")).await.unwrap_err();
    assert!(sqlite_message(&err).contains("links refused"), "{err}");
    assert_eq!(row_counts(&s).await, (0, 0, 0));
    assert!(s.find_persona_by_name(user, "Ada").await.unwrap().is_none());
  }
}
