//! Divination methods and the per-method input allow-lists.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result};

/// The technique a reading was produced with. The string forms are the wire
/// and database representation and must not change.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
pub enum DivinationMethod {
  LifePathNumber,
  Palmistry,
  Astrology,
  #[serde(rename = "MBTI")]
  #[strum(serialize = "MBTI")]
  Mbti,
  Tarot,
  /// A synthesis over several ordinary readings, linked through
  /// `reading_sources`.
  Integrated,
}

impl DivinationMethod {
  /// Parse a method tag, mapping unknown tags to [`Error::InvalidMethod`].
  pub fn parse(tag: &str) -> Result<Self> {
    tag.parse().map_err(|_| Error::InvalidMethod(tag.to_owned()))
  }

  pub fn is_integrated(self) -> bool { matches!(self, Self::Integrated) }

  /// Input-bag keys that are kept for a reading of this method.
  pub fn input_fields(self) -> &'static [&'static str] {
    METHOD_INPUT_FIELDS
      .iter()
      .find(|(m, _)| *m == self)
      .map(|(_, fields)| *fields)
      .unwrap_or(&[])
  }

  pub fn description(self) -> &'static str {
    match self {
      Self::LifePathNumber => "Life path numerology derived from the birth date",
      Self::Palmistry => "Palm reading from line and shape analysis",
      Self::Astrology => "Natal chart reading from birth time and place",
      Self::Mbti => "Personality typing on the MBTI axes",
      Self::Tarot => "Tarot spread interpretation",
      Self::Integrated => "Synthesis across several individual readings",
    }
  }
}

/// Which fields of a batch input bag belong to which method.
const METHOD_INPUT_FIELDS: &[(DivinationMethod, &[&str])] = &[
  (DivinationMethod::LifePathNumber, &["birth_date"]),
  (DivinationMethod::Palmistry, &[
    "palm_image_url",
    "hand_type",
    "palm_analysis",
  ]),
  (DivinationMethod::Astrology, &[
    "birth_date",
    "birth_time",
    "birth_location",
    "birth_city",
    "birth_country",
  ]),
  (DivinationMethod::Mbti, &[
    "mbti_type",
    "quiz_answers",
    "personality_traits",
  ]),
  (DivinationMethod::Tarot, &[
    "tarot_question",
    "selected_cards",
    "card_positions",
    "spread_type",
  ]),
  (DivinationMethod::Integrated, &[]),
];

/// Project a shared batch input bag down to the fields relevant to `method`,
/// then stamp the batch provenance keys every batch reading carries.
pub fn extract_input(
  method: DivinationMethod,
  bag: &Map<String, Value>,
) -> Map<String, Value> {
  let mut out: Map<String, Value> = method
    .input_fields()
    .iter()
    .filter_map(|key| bag.get(*key).map(|v| ((*key).to_owned(), v.clone())))
    .collect();

  out.insert("created_via".into(), Value::from("batch_creation"));
  out.insert(
    "primary_question".into(),
    bag.get("primary_question").cloned().unwrap_or(Value::Null),
  );
  out
}
