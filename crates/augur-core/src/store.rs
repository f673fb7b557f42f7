//! The `DivinationStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `augur-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  Error,
  batch::{BatchOutcome, NewBatch, Summary},
  persona::{NewPersona, Persona, PersonaPatch, PersonaStats},
  reading::{NewReading, Reading, ReadingDetails, ReadingPatch, ReadingQuery},
  user::{User, UserId},
};

/// A backend error that may wrap a domain [`Error`].
///
/// Callers use [`StoreError::domain`] to tell "the request was wrong" apart
/// from "the backend failed" without knowing the backend's error type.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&Error>;
}

/// Abstraction over an Augur store backend.
///
/// Every operation is scoped to a caller. Rows owned by another user behave
/// exactly like rows that do not exist.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DivinationStore: Send + Sync {
  type Error: StoreError;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Return the user with `username`, creating it first if necessary.
  fn ensure_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  fn get_user(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Cheap round-trip used by health checks.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Personas ──────────────────────────────────────────────────────────

  /// Create a persona, or return the caller's existing persona with the same
  /// display name unchanged.
  fn create_persona(
    &self,
    user: UserId,
    input: NewPersona,
  ) -> impl Future<Output = Result<Persona, Self::Error>> + Send + '_;

  fn get_persona(
    &self,
    user: UserId,
    id: i64,
  ) -> impl Future<Output = Result<Option<Persona>, Self::Error>> + Send + '_;

  /// All of the caller's personas, newest first.
  fn list_personas(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<Persona>, Self::Error>> + Send + '_;

  fn find_persona_by_name<'a>(
    &'a self,
    user: UserId,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Persona>, Self::Error>> + Send + 'a;

  /// Case-insensitive substring match on display name, newest first.
  fn search_personas<'a>(
    &'a self,
    user: UserId,
    fragment: &'a str,
  ) -> impl Future<Output = Result<Vec<Persona>, Self::Error>> + Send + 'a;

  /// Apply `patch`. Fails with [`Error::DuplicatePersonaName`] when renaming
  /// onto another of the caller's personas.
  fn update_persona(
    &self,
    user: UserId,
    id: i64,
    patch: PersonaPatch,
  ) -> impl Future<Output = Result<Persona, Self::Error>> + Send + '_;

  /// Delete a persona. Fails with [`Error::PersonaHasReadings`] while any
  /// reading still references it.
  fn delete_persona(
    &self,
    user: UserId,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn persona_stats(
    &self,
    user: UserId,
    id: i64,
  ) -> impl Future<Output = Result<PersonaStats, Self::Error>> + Send + '_;

  // ── Readings ──────────────────────────────────────────────────────────

  /// Insert a single ordinary reading. Integrated readings are only ever
  /// written by [`DivinationStore::submit_batch`].
  fn create_reading(
    &self,
    user: UserId,
    input: NewReading,
  ) -> impl Future<Output = Result<Reading, Self::Error>> + Send + '_;

  fn get_reading(
    &self,
    user: UserId,
    id: i64,
  ) -> impl Future<Output = Result<Option<Reading>, Self::Error>> + Send + '_;

  fn list_readings(
    &self,
    user: UserId,
    query: ReadingQuery,
  ) -> impl Future<Output = Result<Vec<Reading>, Self::Error>> + Send + '_;

  fn update_reading(
    &self,
    user: UserId,
    id: i64,
    patch: ReadingPatch,
  ) -> impl Future<Output = Result<Reading, Self::Error>> + Send + '_;

  /// Delete a reading; its `reading_sources` links go with it.
  fn delete_reading(
    &self,
    user: UserId,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn reading_details(
    &self,
    user: UserId,
    id: i64,
  ) -> impl Future<Output = Result<ReadingDetails, Self::Error>> + Send + '_;

  // ── Batch ─────────────────────────────────────────────────────────────

  /// Persist a whole session atomically. On any error nothing is written.
  fn submit_batch(
    &self,
    user: UserId,
    batch: NewBatch,
  ) -> impl Future<Output = Result<BatchOutcome, Self::Error>> + Send + '_;

  fn summary(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Summary, Self::Error>> + Send + '_;

  fn persona_reading_count(
    &self,
    user: UserId,
    persona_id: i64,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Delete every reading attached to a persona and return how many went.
  fn delete_persona_readings(
    &self,
    user: UserId,
    persona_id: i64,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
