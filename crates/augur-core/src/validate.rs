//! Field constraints for caller-supplied text and numbers.
//!
//! Each function returns the normalised value (usually trimmed) or an
//! [`Error::Validation`] naming the offending field.

use crate::{Error, Result};

pub const MIN_NAME_LENGTH: usize = 1;
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MIN_QUESTION_LENGTH: usize = 5;
pub const MAX_QUESTION_LENGTH: usize = 1000;
pub const MIN_REPORT_LENGTH: usize = 10;
pub const MAX_FEEDBACK_LENGTH: usize = 1000;
pub const MAX_CHARACTER_ARCHETYPES: usize = 10;
pub const MIN_READING_METHODS: usize = 1;
pub const MAX_READING_METHODS: usize = 5;
pub const MIN_USER_RATING: u8 = 1;
pub const MAX_USER_RATING: u8 = 5;
pub const MIN_CONFIDENCE: u8 = 1;
pub const MAX_CONFIDENCE: u8 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// True when the text has at least one character a name could be made of.
fn has_word_char(s: &str) -> bool {
  s.chars().any(|c| c.is_alphanumeric() || c == '_')
}

/// True for non-empty text made only of punctuation and symbols.
fn purely_symbolic(s: &str) -> bool {
  !s.is_empty() && s.chars().all(|c| !c.is_alphanumeric() && c != '_' && !c.is_whitespace())
}

fn char_len(s: &str) -> usize { s.chars().count() }

pub fn display_name(raw: &str) -> Result<String> {
  let name = raw.trim();
  if char_len(name) < MIN_NAME_LENGTH {
    return Err(Error::validation("display_name", "must not be empty"));
  }
  if char_len(name) > MAX_NAME_LENGTH {
    return Err(Error::validation(
      "display_name",
      format!("must be at most {MAX_NAME_LENGTH} characters"),
    ));
  }
  if !has_word_char(name) {
    return Err(Error::validation(
      "display_name",
      "must contain at least one letter or digit",
    ));
  }
  Ok(name.to_owned())
}

pub fn description(raw: &str) -> Result<String> {
  let text = raw.trim();
  if char_len(text) > MAX_DESCRIPTION_LENGTH {
    return Err(Error::validation(
      "description",
      format!("must be at most {MAX_DESCRIPTION_LENGTH} characters"),
    ));
  }
  if purely_symbolic(text) {
    return Err(Error::validation("description", "must not be only symbols"));
  }
  Ok(text.to_owned())
}

/// Trim every tag and drop the empty ones.
pub fn archetypes(raw: &[String]) -> Result<Vec<String>> {
  let tags: Vec<String> = raw
    .iter()
    .map(|t| t.trim())
    .filter(|t| !t.is_empty())
    .map(str::to_owned)
    .collect();

  if let Some(bad) = tags.iter().find(|t| purely_symbolic(t)) {
    return Err(Error::validation(
      "character_archetypes",
      format!("{bad:?} is only symbols"),
    ));
  }
  if tags.len() > MAX_CHARACTER_ARCHETYPES {
    return Err(Error::validation(
      "character_archetypes",
      format!("at most {MAX_CHARACTER_ARCHETYPES} tags are allowed"),
    ));
  }
  Ok(tags)
}

pub fn question(field: &'static str, raw: &str) -> Result<String> {
  let len = char_len(raw);
  if !(MIN_QUESTION_LENGTH..=MAX_QUESTION_LENGTH).contains(&len) {
    return Err(Error::validation(
      field,
      format!(
        "must be between {MIN_QUESTION_LENGTH} and {MAX_QUESTION_LENGTH} characters"
      ),
    ));
  }
  Ok(raw.to_owned())
}

pub fn report_text(field: &'static str, raw: &str) -> Result<String> {
  if char_len(raw) < MIN_REPORT_LENGTH {
    return Err(Error::validation(
      field,
      format!("must be at least {MIN_REPORT_LENGTH} characters"),
    ));
  }
  Ok(raw.to_owned())
}

pub fn rating(value: u8) -> Result<u8> {
  if !(MIN_USER_RATING..=MAX_USER_RATING).contains(&value) {
    return Err(Error::validation(
      "user_rating",
      format!("must be between {MIN_USER_RATING} and {MAX_USER_RATING}"),
    ));
  }
  Ok(value)
}

pub fn confidence(value: u8) -> Result<u8> {
  if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&value) {
    return Err(Error::validation(
      "confidence_score",
      format!("must be between {MIN_CONFIDENCE} and {MAX_CONFIDENCE}"),
    ));
  }
  Ok(value)
}

pub fn feedback(raw: &str) -> Result<String> {
  if char_len(raw) > MAX_FEEDBACK_LENGTH {
    return Err(Error::validation(
      "user_feedback",
      format!("must be at most {MAX_FEEDBACK_LENGTH} characters"),
    ));
  }
  Ok(raw.to_owned())
}

pub fn report_count(count: usize) -> Result<usize> {
  if !(MIN_READING_METHODS..=MAX_READING_METHODS).contains(&count) {
    return Err(Error::validation(
      "individual_reports",
      format!(
        "between {MIN_READING_METHODS} and {MAX_READING_METHODS} reports are required"
      ),
    ));
  }
  Ok(count)
}

/// Resolve an optional page size, applying the default and the upper cap.
pub fn page_limit(limit: Option<u32>) -> Result<u32> {
  let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
  if !(1..=MAX_PAGE_SIZE).contains(&limit) {
    return Err(Error::validation(
      "limit",
      format!("must be between 1 and {MAX_PAGE_SIZE}"),
    ));
  }
  Ok(limit)
}
