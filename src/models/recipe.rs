//! Recipe model
//!
//! A recipe belongs to exactly one user. Prices are fixed-point decimals with
//! two places, kept as integer cents so they compare exactly.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Largest representable price: five digits, two of them decimals
pub const MAX_PRICE_CENTS: i64 = 99_999;

/// Recipe entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    /// Unique identifier
    pub id: i64,
    /// Owning user ID
    pub user_id: i64,
    /// Title
    pub title: String,
    /// Longer description, empty when not given
    pub description: String,
    /// Preparation time in minutes
    pub time_minutes: i32,
    /// Price
    pub price: Price,
    /// External link, empty when not given
    pub link: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Create a new Recipe owned by `user_id`.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(user_id: i64, title: String, time_minutes: i32, price: Price) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id,
            title,
            description: String::new(),
            time_minutes,
            price,
            link: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Recipe fields supplied by a client. On create and full update the
/// required fields must be present; on partial update any subset is allowed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<PriceInput>,
    pub link: Option<String>,
}

/// A price as sent by a client, validated later so that a bad value is
/// reported against the `price` field instead of failing the whole body
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl PriceInput {
    pub fn parse(&self) -> Result<Price, PriceError> {
        match self {
            PriceInput::Number(n) => n.to_string().parse(),
            PriceInput::Text(s) => s.parse(),
            PriceInput::Other(_) => Err(PriceError::Invalid),
        }
    }
}

impl From<Price> for PriceInput {
    fn from(price: Price) -> Self {
        PriceInput::Text(price.to_string())
    }
}

/// Non-negative decimal price with two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(i64);

impl Price {
    /// Build a price from cents, rejecting values outside `0..=MAX_PRICE_CENTS`
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents < 0 {
            return Err(PriceError::Negative);
        }
        if cents > MAX_PRICE_CENTS {
            return Err(PriceError::TooManyDigits);
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }
}

/// Reasons a price is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimals,
    #[error("Ensure that there are no more than 5 digits in total.")]
    TooManyDigits,
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('-') {
            // "-0" and friends are still zero
            return match rest.parse::<Price>()? {
                Price(0) => Ok(Price(0)),
                _ => Err(PriceError::Negative),
            };
        }

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(PriceError::Invalid);
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(PriceError::Invalid);
        }

        let frac = frac.trim_end_matches('0');
        if frac.len() > 2 {
            return Err(PriceError::TooManyDecimals);
        }

        let whole = whole.trim_start_matches('0');
        if whole.len() > 3 {
            return Err(PriceError::TooManyDigits);
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| PriceError::Invalid)? };
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| PriceError::Invalid)? * 10,
            _ => frac.parse().map_err(|_| PriceError::Invalid)?,
        };

        Price::from_cents(whole * 100 + frac)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PriceVisitor;

        impl<'de> de::Visitor<'de> for PriceVisitor {
            type Value = Price;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal price as a number or string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
                let cents = i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(100))
                    .ok_or_else(|| E::custom(PriceError::TooManyDigits))?;
                Price::from_cents(cents).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
                if v < 0 {
                    return Err(E::custom(PriceError::Negative));
                }
                self.visit_u64(v as u64)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
                if !v.is_finite() {
                    return Err(E::custom(PriceError::Invalid));
                }
                // Shortest round-trip formatting keeps 10.4 as "10.4".
                v.to_string().parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PriceVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_price() {
        assert_eq!("10.40".parse::<Price>().unwrap().cents(), 1040);
        assert_eq!("10.4".parse::<Price>().unwrap().cents(), 1040);
        assert_eq!("5.5".parse::<Price>().unwrap().cents(), 550);
        assert_eq!("5".parse::<Price>().unwrap().cents(), 500);
        assert_eq!(".75".parse::<Price>().unwrap().cents(), 75);
        assert_eq!("999.99".parse::<Price>().unwrap().cents(), MAX_PRICE_CENTS);
        assert_eq!("1.500".parse::<Price>().unwrap().cents(), 150);
    }

    #[test]
    fn test_parse_price_rejects_invalid() {
        assert_eq!("abc".parse::<Price>(), Err(PriceError::Invalid));
        assert_eq!("".parse::<Price>(), Err(PriceError::Invalid));
        assert_eq!(".".parse::<Price>(), Err(PriceError::Invalid));
        assert_eq!("-1.00".parse::<Price>(), Err(PriceError::Negative));
        assert_eq!("1.234".parse::<Price>(), Err(PriceError::TooManyDecimals));
        assert_eq!("1000".parse::<Price>(), Err(PriceError::TooManyDigits));
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(1040).unwrap().to_string(), "10.40");
        assert_eq!(Price::from_cents(5).unwrap().to_string(), "0.05");
        assert_eq!(Price::default().to_string(), "0.00");
    }

    #[test]
    fn test_price_json() {
        let from_number: Price = serde_json::from_str("5.5").unwrap();
        let from_string: Price = serde_json::from_str("\"5.50\"").unwrap();
        let from_integer: Price = serde_json::from_str("7").unwrap();

        assert_eq!(from_number.cents(), 550);
        assert_eq!(from_string, from_number);
        assert_eq!(from_integer.cents(), 700);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"5.50\"");
        assert!(serde_json::from_str::<Price>("-3").is_err());
        assert!(serde_json::from_str::<Price>("true").is_err());
    }

    #[test]
    fn test_price_input_keeps_bad_values() {
        let input: RecipeInput =
            serde_json::from_str(r#"{"title": "Soup", "price": "5.555"}"#).unwrap();
        assert_eq!(input.price.unwrap().parse(), Err(PriceError::TooManyDecimals));

        let input: RecipeInput = serde_json::from_str(r#"{"price": true}"#).unwrap();
        assert_eq!(input.price.unwrap().parse(), Err(PriceError::Invalid));

        let input: RecipeInput = serde_json::from_str(r#"{"price": -2}"#).unwrap();
        assert_eq!(input.price.unwrap().parse(), Err(PriceError::Negative));

        let input: RecipeInput = serde_json::from_str(r#"{"price": 10.4}"#).unwrap();
        assert_eq!(input.price.unwrap().parse().unwrap().cents(), 1040);

        let input: RecipeInput = serde_json::from_str(r#"{"price": null}"#).unwrap();
        assert!(input.price.is_none());
    }

    #[test]
    fn test_recipe_new() {
        let recipe = Recipe::new(1, "Chocolate cheesecake".to_string(), 30, Price::from_cents(500).unwrap());

        assert_eq!(recipe.id, 0);
        assert_eq!(recipe.user_id, 1);
        assert_eq!(recipe.title, "Chocolate cheesecake");
        assert_eq!(recipe.time_minutes, 30);
        assert_eq!(recipe.price.to_string(), "5.00");
        assert!(recipe.description.is_empty());
    }

    proptest! {
        #[test]
        fn prop_price_text_is_stable(cents in 0i64..=MAX_PRICE_CENTS) {
            let price = Price::from_cents(cents).unwrap();
            prop_assert_eq!(price.to_string().parse::<Price>(), Ok(price));
        }

        #[test]
        fn prop_out_of_range_rejected(cents in (MAX_PRICE_CENTS + 1)..i64::MAX) {
            prop_assert_eq!(Price::from_cents(cents), Err(PriceError::TooManyDigits));
        }
    }
}
