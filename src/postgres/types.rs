// ABOUTME: Conversion between PostgreSQL wire types and tagged scalar Values
// ABOUTME: Decodes result rows by column type; binds Values to the inferred parameter type

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

use crate::error::{Result, SyncError};
use crate::row::{Row, Value};

type BoxError = Box<dyn std::error::Error + Sync + Send>;

const TEXT_TYPES: &[&str] = &["text", "varchar", "bpchar", "name", "citext"];

fn is_text_type(ty: &Type) -> bool {
    TEXT_TYPES.contains(&ty.name())
}

/// Catalog `data_type`s that [`decode_row`] reads directly.
const NATIVE_DATA_TYPES: &[&str] = &[
    "boolean",
    "smallint",
    "integer",
    "bigint",
    "oid",
    "real",
    "double precision",
    "numeric",
    "date",
    "timestamp without time zone",
    "timestamp with time zone",
    "uuid",
    "json",
    "jsonb",
    "text",
    "character varying",
    "character",
    "name",
];

/// Whether a column with this `information_schema.columns.data_type` must be
/// read as `::text` and written back through a text cast. Covers enums,
/// arrays, `bytea`, `interval`, network types and everything else without a
/// `Value` variant. Domains always travel as text.
pub(crate) fn travels_as_text(data_type: &str, is_domain: bool) -> bool {
    is_domain || !NATIVE_DATA_TYPES.contains(&data_type)
}

/// Convert a fetched row into an ordered [`Row`].
pub fn decode_row(row: &tokio_postgres::Row) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, idx, column.name(), column.type_())?;
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

fn decode_value(row: &tokio_postgres::Row, idx: usize, name: &str, ty: &Type) -> Result<Value> {
    let value = match ty.name() {
        "bool" => row.try_get::<_, Option<bool>>(idx)?.into(),
        "int2" => row.try_get::<_, Option<i16>>(idx)?.map(i64::from).into(),
        "int4" => row.try_get::<_, Option<i32>>(idx)?.map(i64::from).into(),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.into(),
        "oid" => row.try_get::<_, Option<u32>>(idx)?.map(i64::from).into(),
        "float4" => row.try_get::<_, Option<f32>>(idx)?.map(f64::from).into(),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.into(),
        "numeric" => row.try_get::<_, Option<Decimal>>(idx)?.into(),
        "date" => row.try_get::<_, Option<NaiveDate>>(idx)?.into(),
        "timestamp" => row.try_get::<_, Option<NaiveDateTime>>(idx)?.into(),
        "timestamptz" => row.try_get::<_, Option<DateTime<Utc>>>(idx)?.into(),
        "uuid" => row
            .try_get::<_, Option<uuid::Uuid>>(idx)?
            .map(|u| u.to_string())
            .into(),
        "json" | "jsonb" => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(|j| j.to_string())
            .into(),
        _ if is_text_type(ty) => row.try_get::<_, Option<String>>(idx)?.into(),
        other => return Err(SyncError::unsupported_type(name, other)),
    };
    Ok(value)
}

/// Why a [`Value`] could not be bound to a statement parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("cannot bind a {kind} value to a {type_name} parameter")]
    Mismatch {
        kind: &'static str,
        type_name: String,
    },

    #[error("cannot convert '{text}' to {type_name}")]
    Unparsable { text: String, type_name: String },

    #[error("value {value} is out of range for {type_name}")]
    OutOfRange { value: String, type_name: String },
}

impl BindError {
    fn mismatch(value: &Value, type_name: &str) -> Self {
        BindError::Mismatch {
            kind: value.kind(),
            type_name: type_name.to_string(),
        }
    }

    fn unparsable(text: &str, type_name: &str) -> Self {
        BindError::Unparsable {
            text: text.to_string(),
            type_name: type_name.to_string(),
        }
    }

    fn out_of_range(value: impl ToString, type_name: &str) -> Self {
        BindError::OutOfRange {
            value: value.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

/// Convert `value` to the variant that natively matches the PostgreSQL type
/// `type_name` (a `pg_type` name such as `int4` or `timestamptz`).
///
/// Text targets always receive [`Value::to_text`], the same form the COPY
/// path writes, so both insert strategies store identical text. Text sources
/// are parsed the way the server parses COPY input for the common scalar types.
pub fn coerce_param(value: &Value, type_name: &str) -> std::result::Result<Value, BindError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if TEXT_TYPES.contains(&type_name) {
        return Ok(Value::Text(value.to_text().unwrap_or_default()));
    }

    let coerced = match type_name {
        "bool" => match value {
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(0) => Value::Bool(false),
            Value::Int(1) => Value::Bool(true),
            Value::Text(s) => {
                Value::Bool(parse_bool(s).ok_or_else(|| BindError::unparsable(s, type_name))?)
            }
            _ => return Err(BindError::mismatch(value, type_name)),
        },
        "int2" | "int4" | "int8" | "oid" => {
            let i = match value {
                Value::Int(i) => *i,
                Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => *f as i64,
                Value::Decimal(d) if d.fract().is_zero() => d
                    .to_i64()
                    .ok_or_else(|| BindError::out_of_range(d, type_name))?,
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| BindError::unparsable(s, type_name))?,
                _ => return Err(BindError::mismatch(value, type_name)),
            };
            let fits = match type_name {
                "int2" => i16::try_from(i).is_ok(),
                "int4" => i32::try_from(i).is_ok(),
                "oid" => u32::try_from(i).is_ok(),
                _ => true,
            };
            if !fits {
                return Err(BindError::out_of_range(i, type_name));
            }
            Value::Int(i)
        }
        "float4" | "float8" => match value {
            Value::Int(i) => Value::Float(*i as f64),
            Value::Float(f) => Value::Float(*f),
            Value::Decimal(d) => Value::Float(
                d.to_f64()
                    .ok_or_else(|| BindError::out_of_range(d, type_name))?,
            ),
            Value::Text(s) => Value::Float(
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| BindError::unparsable(s, type_name))?,
            ),
            _ => return Err(BindError::mismatch(value, type_name)),
        },
        "numeric" => match value {
            Value::Int(i) => Value::Decimal(Decimal::from(*i)),
            Value::Decimal(d) => Value::Decimal(*d),
            // Through the shortest decimal rendering, as COPY would see it.
            Value::Float(f) => Value::Decimal(
                Decimal::from_str(&f.to_string())
                    .map_err(|_| BindError::out_of_range(f, type_name))?,
            ),
            Value::Text(s) => Value::Decimal(
                Decimal::from_str(s.trim()).map_err(|_| BindError::unparsable(s, type_name))?,
            ),
            _ => return Err(BindError::mismatch(value, type_name)),
        },
        "date" => match value {
            Value::Date(d) => Value::Date(*d),
            Value::DateTime(dt) => Value::Date(dt.date()),
            Value::DateTimeUtc(dt) => Value::Date(dt.date_naive()),
            Value::Text(s) => Value::Date(
                parse_date(s.trim()).ok_or_else(|| BindError::unparsable(s, type_name))?,
            ),
            _ => return Err(BindError::mismatch(value, type_name)),
        },
        "timestamp" => match value {
            Value::Date(d) => Value::DateTime(d.and_time(NaiveTime::MIN)),
            Value::DateTime(dt) => Value::DateTime(*dt),
            Value::DateTimeUtc(dt) => Value::DateTime(dt.naive_utc()),
            Value::Text(s) => Value::DateTime(
                parse_timestamp(s.trim()).ok_or_else(|| BindError::unparsable(s, type_name))?,
            ),
            _ => return Err(BindError::mismatch(value, type_name)),
        },
        "timestamptz" => match value {
            Value::Date(d) => Value::DateTimeUtc(d.and_time(NaiveTime::MIN).and_utc()),
            Value::DateTime(dt) => Value::DateTimeUtc(dt.and_utc()),
            Value::DateTimeUtc(dt) => Value::DateTimeUtc(*dt),
            Value::Text(s) => Value::DateTimeUtc(
                parse_timestamptz(s.trim()).ok_or_else(|| BindError::unparsable(s, type_name))?,
            ),
            _ => return Err(BindError::mismatch(value, type_name)),
        },
        "uuid" => match value {
            Value::Text(s) if uuid::Uuid::parse_str(s).is_ok() => value.clone(),
            Value::Text(s) => return Err(BindError::unparsable(s, type_name)),
            _ => return Err(BindError::mismatch(value, type_name)),
        },
        "json" | "jsonb" => match value {
            Value::Text(s) if serde_json::from_str::<serde_json::Value>(s).is_ok() => {
                value.clone()
            }
            Value::Text(s) => return Err(BindError::unparsable(s, type_name)),
            _ => return Err(BindError::mismatch(value, type_name)),
        },
        _ => return Err(BindError::mismatch(value, type_name)),
    };
    Ok(coerced)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|dt| dt.date()))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Offset-less input is taken as UTC.
fn parse_timestamptz(s: &str) -> Option<DateTime<Utc>> {
    ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"]
        .iter()
        .find_map(|format| DateTime::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_timestamp(s).map(|dt| dt.and_utc()))
}

/// Values are bound to whatever type PostgreSQL inferred for the parameter.
/// [`coerce_param`] picks the matching variant first, so the bytes written
/// are always in that type's binary format. Pairs that cannot be converted
/// fail with a [`BindError`].
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match coerce_param(self, ty.name())? {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => match ty.name() {
                "int2" => i16::try_from(i)?.to_sql(ty, out),
                "int4" => i32::try_from(i)?.to_sql(ty, out),
                "oid" => u32::try_from(i)?.to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            Value::Float(f) => match ty.name() {
                "float4" => (f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            Value::Decimal(d) => d.to_sql(ty, out),
            Value::Text(s) => match ty.name() {
                "uuid" => uuid::Uuid::parse_str(&s)?.to_sql(ty, out),
                "json" | "jsonb" => serde_json::from_str::<serde_json::Value>(&s)?.to_sql(ty, out),
                _ => s.to_sql(ty, out),
            },
            Value::Date(d) => d.to_sql(ty, out),
            Value::DateTime(dt) => dt.to_sql(ty, out),
            Value::DateTimeUtc(dt) => dt.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
