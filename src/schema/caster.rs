//! Caster registry
//!
//! A fixed table of named type casters. Each type exposes:
//! - `matches`: is the value already in the type's native representation
//! - `cast`: convert a raw value, only invoked when `matches` is false
//!
//! Casting is therefore idempotent: a value that already matches comes back
//! unchanged.

use std::fmt::{self, Display, Write as _};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
pub const DEFAULT_TIME_FORMAT: &str = DEFAULT_DATETIME_FORMAT;
pub const DEFAULT_DECIMAL_PRECISION: u32 = 2;
pub const DEFAULT_INTEGER_BASE: u32 = 10;

/// Declarable attribute types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Decimal,
    Symbol,
    Time,
    Date,
    DateTime,
    Bool,
}

impl ValueType {
    /// Every registered caster, in registry order
    pub const ALL: [ValueType; 9] = [
        ValueType::String,
        ValueType::Integer,
        ValueType::Float,
        ValueType::Decimal,
        ValueType::Symbol,
        ValueType::Time,
        ValueType::Date,
        ValueType::DateTime,
        ValueType::Bool,
    ];

    /// Returns the type name used in specs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Decimal => "decimal",
            ValueType::Symbol => "symbol",
            ValueType::Time => "time",
            ValueType::Date => "date",
            ValueType::DateTime => "datetime",
            ValueType::Bool => "bool",
        }
    }

    /// Is the value already this type's native representation
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueType::String, Value::String(_))
                | (ValueType::Integer, Value::Integer(_))
                | (ValueType::Float, Value::Float(_))
                | (ValueType::Decimal, Value::Decimal(_))
                | (ValueType::Symbol, Value::Symbol(_))
                | (ValueType::Time, Value::Time(_))
                | (ValueType::Date, Value::Date(_))
                | (ValueType::DateTime, Value::DateTime(_))
                | (ValueType::Bool, Value::Bool(_))
        )
    }

    /// Casts a raw value to this type.
    ///
    /// Values that already match are returned unchanged.
    pub fn cast(&self, value: Value, format: &FormatOptions) -> Result<Value, CastFailure> {
        if self.matches(&value) {
            return Ok(value);
        }

        match self {
            ValueType::String => cast_string(value, format),
            ValueType::Integer => cast_integer(value, format.integer_base),
            ValueType::Float => cast_float(value),
            ValueType::Decimal => cast_decimal(value, format.decimal_precision),
            ValueType::Symbol => cast_symbol(value),
            ValueType::Time => cast_time(value, &format.time_format),
            ValueType::Date => cast_date(value, &format.date_format),
            ValueType::DateTime => cast_datetime(value, &format.datetime_format),
            ValueType::Bool => Ok(cast_bool(value)),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// No caster is registered under the requested name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no caster registered for type '{0}'")]
pub struct UnknownValueType(pub String);

impl FromStr for ValueType {
    type Err = UnknownValueType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ValueType::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| UnknownValueType(s.to_string()))
    }
}

/// Lower-level conversion failure, wrapped into a `TypeCastingError` by the
/// attribute that requested the cast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{cause} - {message}")]
pub struct CastFailure {
    cause: &'static str,
    message: String,
}

impl CastFailure {
    fn new(cause: &'static str, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }

    fn unsupported(value: &Value, target: ValueType) -> Self {
        Self::new(
            "TypeError",
            format!("can't convert {} into {}", value.type_name(), target),
        )
    }

    pub fn cause(&self) -> &'static str {
        self.cause
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Fully resolved formatting options consulted by the casters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub date_format: String,
    pub datetime_format: String,
    pub time_format: String,
    pub decimal_precision: u32,
    pub integer_base: u32,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            decimal_precision: DEFAULT_DECIMAL_PRECISION,
            integer_base: DEFAULT_INTEGER_BASE,
        }
    }
}

impl FormatOptions {
    /// Returns these options with every field set in `overrides` replaced.
    pub fn apply(mut self, overrides: &FormatOverrides) -> Self {
        if let Some(f) = &overrides.date_format {
            self.date_format = f.clone();
        }
        if let Some(f) = &overrides.datetime_format {
            self.datetime_format = f.clone();
        }
        if let Some(f) = &overrides.time_format {
            self.time_format = f.clone();
        }
        if let Some(p) = overrides.decimal_precision {
            self.decimal_precision = p;
        }
        if let Some(b) = overrides.integer_base {
            self.integer_base = b;
        }
        self
    }
}

/// Partial formatting options, as declared on an attribute or passed with a
/// parse call. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer_base: Option<u32>,
}

impl FormatOverrides {
    /// Layers `other` over `self`; fields set in `other` win.
    pub fn layer(&self, other: &FormatOverrides) -> FormatOverrides {
        FormatOverrides {
            date_format: other.date_format.clone().or_else(|| self.date_format.clone()),
            datetime_format: other
                .datetime_format
                .clone()
                .or_else(|| self.datetime_format.clone()),
            time_format: other.time_format.clone().or_else(|| self.time_format.clone()),
            decimal_precision: other.decimal_precision.or(self.decimal_precision),
            integer_base: other.integer_base.or(self.integer_base),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FormatOverrides::default()
    }
}

fn render(item: impl Display) -> Result<String, CastFailure> {
    let mut out = String::new();
    write!(out, "{}", item)
        .map_err(|_| CastFailure::new("FormatError", "invalid format string"))?;
    Ok(out)
}

fn cast_string(value: Value, format: &FormatOptions) -> Result<Value, CastFailure> {
    let text = match value {
        Value::Time(t) => render(t.format(&format.time_format))?,
        Value::DateTime(dt) => render(dt.format(&format.datetime_format))?,
        Value::Date(d) => render(d.format(&format.date_format))?,
        Value::Symbol(s) => s,
        other => other.to_string(),
    };
    Ok(Value::String(text))
}

fn cast_integer(value: Value, base: u32) -> Result<Value, CastFailure> {
    match value {
        Value::String(s) => parse_integer(&s, base).map(Value::Integer),
        Value::Float(x) => {
            if x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64 {
                Ok(Value::Integer(x.trunc() as i64))
            } else {
                Err(CastFailure::new(
                    "FloatDomainError",
                    format!("{} out of integer range", x),
                ))
            }
        }
        Value::Decimal(d) => d.trunc().to_i64().map(Value::Integer).ok_or_else(|| {
            CastFailure::new("RangeError", format!("{} out of integer range", d))
        }),
        other => Err(CastFailure::unsupported(&other, ValueType::Integer)),
    }
}

/// Parses an integer literal in the given base.
///
/// Accepts surrounding whitespace, an optional sign, `_` separators and the
/// `0x`/`0o`/`0b` prefix matching the base.
fn parse_integer(text: &str, base: u32) -> Result<i64, CastFailure> {
    if !(2..=36).contains(&base) {
        return Err(CastFailure::new(
            "ArgumentError",
            format!("invalid radix {}", base),
        ));
    }

    let trimmed = text.trim();
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let prefix = match base {
        16 => Some(["0x", "0X"]),
        8 => Some(["0o", "0O"]),
        2 => Some(["0b", "0B"]),
        _ => None,
    };
    let digits = prefix
        .and_then(|pair| pair.iter().find_map(|p| unsigned.strip_prefix(p)))
        .unwrap_or(unsigned);

    if digits.starts_with('_') || digits.ends_with('_') {
        return Err(CastFailure::new(
            "ArgumentError",
            format!("invalid value for Integer(): {:?}", text),
        ));
    }

    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    i64::from_str_radix(&format!("{}{}", sign, cleaned), base).map_err(|e| {
        CastFailure::new(
            "ArgumentError",
            format!("invalid value for Integer(): {:?} ({})", text, e),
        )
    })
}

fn cast_float(value: Value) -> Result<Value, CastFailure> {
    match value {
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
            match cleaned.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(Value::Float(x)),
                Ok(_) => Err(CastFailure::new(
                    "ArgumentError",
                    format!("invalid value for Float(): {:?}", s),
                )),
                Err(e) => Err(CastFailure::new(
                    "ArgumentError",
                    format!("invalid value for Float(): {:?} ({})", s, e),
                )),
            }
        }
        Value::Integer(i) => Ok(Value::Float(i as f64)),
        Value::Decimal(d) => d.to_f64().map(Value::Float).ok_or_else(|| {
            CastFailure::new("RangeError", format!("{} out of float range", d))
        }),
        other => Err(CastFailure::unsupported(&other, ValueType::Float)),
    }
}

fn cast_decimal(value: Value, precision: u32) -> Result<Value, CastFailure> {
    let decimal = match value {
        Value::String(s) => {
            let trimmed = s.trim();
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map_err(|e| {
                    CastFailure::new(
                        "ArgumentError",
                        format!("invalid value for Decimal(): {:?} ({})", s, e),
                    )
                })?
        }
        Value::Integer(i) => Decimal::from(i),
        Value::Float(x) => Decimal::try_from(x)
            .map_err(|e| CastFailure::new("FloatDomainError", format!("{} ({})", x, e)))?,
        other => return Err(CastFailure::unsupported(&other, ValueType::Decimal)),
    };

    Ok(Value::Decimal(decimal.round_dp_with_strategy(
        precision,
        RoundingStrategy::MidpointAwayFromZero,
    )))
}

fn cast_symbol(value: Value) -> Result<Value, CastFailure> {
    match value {
        Value::String(s) => Ok(Value::Symbol(s)),
        other => Err(CastFailure::unsupported(&other, ValueType::Symbol)),
    }
}

fn cast_time(value: Value, format: &str) -> Result<Value, CastFailure> {
    let text = match value {
        Value::String(s) => s,
        other => return Err(CastFailure::unsupported(&other, ValueType::Time)),
    };

    if let Ok(with_offset) = DateTime::parse_from_str(&text, format) {
        return Ok(Value::Time(with_offset.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(&text, format)
        .map(|naive| Value::Time(Utc.from_utc_datetime(&naive)))
        .map_err(|e| strptime_failure(&text, format, e))
}

fn cast_date(value: Value, format: &str) -> Result<Value, CastFailure> {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(&s, format)
            .map(Value::Date)
            .map_err(|e| strptime_failure(&s, format, e)),
        other => Err(CastFailure::unsupported(&other, ValueType::Date)),
    }
}

fn cast_datetime(value: Value, format: &str) -> Result<Value, CastFailure> {
    match value {
        Value::String(s) => NaiveDateTime::parse_from_str(&s, format)
            .map(Value::DateTime)
            .map_err(|e| strptime_failure(&s, format, e)),
        other => Err(CastFailure::unsupported(&other, ValueType::DateTime)),
    }
}

fn strptime_failure(text: &str, format: &str, error: chrono::ParseError) -> CastFailure {
    CastFailure::new(
        "ArgumentError",
        format!("invalid date {:?} for format {:?} ({})", text, format, error),
    )
}

fn cast_bool(value: Value) -> Value {
    match value {
        Value::String(s) if s == "false" => Value::Bool(false),
        Value::String(s) if s == "true" => Value::Bool(true),
        other => Value::Bool(other.is_truthy()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn defaults() -> FormatOptions {
        FormatOptions::default()
    }

    #[test]
    fn test_type_names_round_trip() {
        for t in ValueType::ALL {
            assert_eq!(t.name().parse::<ValueType>().unwrap(), t);
        }
        assert_eq!("Integer".parse::<ValueType>().unwrap(), ValueType::Integer);
        assert!("uuid".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_integer_from_string() {
        let v = ValueType::Integer.cast(Value::from("42"), &defaults()).unwrap();
        assert_eq!(v, Value::Integer(42));

        let v = ValueType::Integer.cast(Value::from(" -1_000 "), &defaults()).unwrap();
        assert_eq!(v, Value::Integer(-1000));
    }

    #[test]
    fn test_integer_with_base() {
        let hex = defaults().apply(&FormatOverrides {
            integer_base: Some(16),
            ..Default::default()
        });
        assert_eq!(
            ValueType::Integer.cast(Value::from("ff"), &hex).unwrap(),
            Value::Integer(255)
        );
        assert_eq!(
            ValueType::Integer.cast(Value::from("0x1A"), &hex).unwrap(),
            Value::Integer(26)
        );
    }

    #[test]
    fn test_integer_rejects_garbage() {
        let err = ValueType::Integer
            .cast(Value::from("4x2"), &defaults())
            .unwrap_err();
        assert_eq!(err.cause(), "ArgumentError");
        assert!(ValueType::Integer.cast(Value::from(""), &defaults()).is_err());
        assert!(ValueType::Integer.cast(Value::Bool(true), &defaults()).is_err());
    }

    #[test]
    fn test_integer_from_float_truncates() {
        assert_eq!(
            ValueType::Integer.cast(Value::Float(3.9), &defaults()).unwrap(),
            Value::Integer(3)
        );
    }

    #[test]
    fn test_float_from_string_and_integer() {
        assert_eq!(
            ValueType::Float.cast(Value::from("1.25"), &defaults()).unwrap(),
            Value::Float(1.25)
        );
        assert_eq!(
            ValueType::Float.cast(Value::Integer(2), &defaults()).unwrap(),
            Value::Float(2.0)
        );
        assert!(ValueType::Float.cast(Value::from("NaN"), &defaults()).is_err());
    }

    #[test]
    fn test_decimal_rounds_to_precision() {
        let v = ValueType::Decimal.cast(Value::from("12.345"), &defaults()).unwrap();
        assert_eq!(v, Value::Decimal("12.35".parse().unwrap()));

        let one_place = defaults().apply(&FormatOverrides {
            decimal_precision: Some(1),
            ..Default::default()
        });
        let v = ValueType::Decimal.cast(Value::Float(2.25), &one_place).unwrap();
        assert_eq!(v, Value::Decimal("2.3".parse().unwrap()));
    }

    #[test]
    fn test_symbol_from_string() {
        assert_eq!(
            ValueType::Symbol.cast(Value::from("on"), &defaults()).unwrap(),
            Value::Symbol("on".into())
        );
        assert!(ValueType::Symbol.cast(Value::Integer(1), &defaults()).is_err());
    }

    #[test]
    fn test_date_with_format() {
        let v = ValueType::Date.cast(Value::from("2024-03-09"), &defaults()).unwrap();
        assert_eq!(v, Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));

        let us = defaults().apply(&FormatOverrides {
            date_format: Some("%m/%d/%Y".into()),
            ..Default::default()
        });
        let v = ValueType::Date.cast(Value::from("03/09/2024"), &us).unwrap();
        assert_eq!(v, Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));

        let err = ValueType::Date.cast(Value::from("09.03.2024"), &defaults()).unwrap_err();
        assert!(err.message().contains("09.03.2024"));
    }

    #[test]
    fn test_datetime_and_time() {
        let v = ValueType::DateTime
            .cast(Value::from("2024-01-02T03:04:05.678"), &defaults())
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 678)
            .unwrap();
        assert_eq!(v, Value::DateTime(expected));

        let v = ValueType::Time
            .cast(Value::from("2024-01-02T03:04:05.678"), &defaults())
            .unwrap();
        assert_eq!(v, Value::Time(Utc.from_utc_datetime(&expected)));
    }

    #[test]
    fn test_time_with_offset_is_normalized_to_utc() {
        let zoned = defaults().apply(&FormatOverrides {
            time_format: Some("%Y-%m-%d %H:%M:%S %z".into()),
            ..Default::default()
        });
        let v = ValueType::Time
            .cast(Value::from("2024-01-02 10:00:00 +0200"), &zoned)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(v, Value::Time(Utc.from_utc_datetime(&expected)));
    }

    #[test]
    fn test_string_formats_temporal_values() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let custom = defaults().apply(&FormatOverrides {
            date_format: Some("%d/%m/%Y".into()),
            ..Default::default()
        });
        assert_eq!(
            ValueType::String.cast(Value::Date(date), &custom).unwrap(),
            Value::from("09/03/2024")
        );
        assert_eq!(
            ValueType::String.cast(Value::Integer(7), &defaults()).unwrap(),
            Value::from("7")
        );
    }

    #[test]
    fn test_bool_literals_and_truthiness() {
        let cast = |v: Value| ValueType::Bool.cast(v, &defaults()).unwrap();
        assert_eq!(cast(Value::from("false")), Value::Bool(false));
        assert_eq!(cast(Value::from("true")), Value::Bool(true));
        assert_eq!(cast(Value::from("no")), Value::Bool(true));
        assert_eq!(cast(Value::Integer(0)), Value::Bool(true));
        assert_eq!(cast(Value::Null), Value::Bool(false));
    }

    #[test]
    fn test_overrides_layering() {
        let base = FormatOverrides {
            date_format: Some("%d.%m.%Y".into()),
            integer_base: Some(8),
            ..Default::default()
        };
        let top = FormatOverrides {
            integer_base: Some(16),
            ..Default::default()
        };
        let layered = base.layer(&top);
        assert_eq!(layered.date_format.as_deref(), Some("%d.%m.%Y"));
        assert_eq!(layered.integer_base, Some(16));
        assert!(FormatOverrides::default().is_empty());
    }

    proptest! {
        /// Integers are already native: casting never changes them.
        #[test]
        fn integer_cast_is_idempotent(i in any::<i64>(), base in 2u32..=36) {
            let format = FormatOptions { integer_base: base, ..FormatOptions::default() };
            let v = Value::Integer(i);
            prop_assert_eq!(ValueType::Integer.cast(v.clone(), &format).unwrap(), v);
        }

        /// Strings pass through the string caster untouched.
        #[test]
        fn string_cast_is_idempotent(s in ".*") {
            let v = Value::String(s);
            prop_assert_eq!(ValueType::String.cast(v.clone(), &defaults()).unwrap(), v);
        }

        /// Re-casting an already cast value is a no-op for every caster.
        #[test]
        fn recast_is_noop(i in -1_000_000i64..1_000_000) {
            let raw = Value::String(i.to_string());
            for t in [ValueType::Integer, ValueType::Float, ValueType::Decimal, ValueType::Symbol, ValueType::Bool] {
                let once = t.cast(raw.clone(), &defaults()).unwrap();
                prop_assert!(t.matches(&once));
                prop_assert_eq!(t.cast(once.clone(), &defaults()).unwrap(), once);
            }
        }

        /// Native temporal values survive casting unchanged.
        #[test]
        fn temporal_cast_is_idempotent(
            days in 0i64..100_000,
            secs in 0u32..86_400,
            millis in 0u32..1_000,
        ) {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Duration::days(days);
            let datetime = date.and_hms_milli_opt(secs / 3600, (secs / 60) % 60, secs % 60, millis).unwrap();
            let samples = [
                (ValueType::Date, Value::Date(date)),
                (ValueType::DateTime, Value::DateTime(datetime)),
                (ValueType::Time, Value::Time(Utc.from_utc_datetime(&datetime))),
            ];
            for (t, v) in samples {
                prop_assert!(t.matches(&v));
                prop_assert_eq!(t.cast(v.clone(), &defaults()).unwrap(), v);
            }
        }

        /// Decimals keep their scale even beyond the configured precision.
        #[test]
        fn decimal_cast_is_idempotent(mantissa in any::<i64>(), scale in 0u32..=10) {
            let v = Value::Decimal(Decimal::new(mantissa, scale));
            prop_assert_eq!(ValueType::Decimal.cast(v.clone(), &defaults()).unwrap(), v);
        }
    }
}
