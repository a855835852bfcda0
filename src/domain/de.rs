//! Lenient deserializers for marketplace API payloads.
//!
//! The backend is inconsistent about scalar encodings: identifiers arrive as
//! numbers or strings and amounts sometimes arrive as numeric strings.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

fn scalar_to_id(value: Scalar) -> String {
    match value {
        Scalar::Str(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
    }
}

fn scalar_to_amount<E: de::Error>(value: Scalar) -> Result<i64, E> {
    match value {
        Scalar::Int(n) => Ok(n),
        Scalar::Float(f) => Ok(f.round() as i64),
        Scalar::Str(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(n);
            }
            trimmed
                .parse::<f64>()
                .map(|f| f.round() as i64)
                .map_err(|_| E::custom(format!("invalid amount '{}'", s)))
        }
    }
}

/// String identifier, accepting JSON numbers.
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(scalar_to_id)
}

/// Optional string identifier, accepting JSON numbers and null.
pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(scalar_to_id))
}

/// List of identifiers, accepting JSON numbers.
pub fn ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Scalar>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(scalar_to_id)
        .collect())
}

/// Integer amount, accepting floats and numeric strings.
pub fn amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_to_amount(Scalar::deserialize(deserializer)?)
}

/// Optional integer amount, accepting floats, numeric strings and null.
pub fn opt_amount<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer)?
        .map(scalar_to_amount)
        .transpose()
}
