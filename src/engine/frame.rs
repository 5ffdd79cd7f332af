//! DuckDB result rows → polars DataFrame.

use duckdb::types::TimeUnit as DuckTimeUnit;
use polars::prelude::{DataFrame, DataType, NamedFrom, Series, TimeUnit};

use super::Value;
use crate::error::Result;

/// Column type picked from the first non-null value of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Integer,
    Unsigned,
    Float,
    Timestamp,
    Date,
    Time,
    Interval,
    Text,
}

const MICROS_PER_DAY: i64 = 86_400_000_000;
/// DuckDB counts a month as 30 days when an interval is reduced to one length.
const DAYS_PER_MONTH: i64 = 30;

pub(crate) fn rows_to_dataframe(columns: &[String], rows: &[Vec<Value>]) -> Result<DataFrame> {
    let series = columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<&Value> = rows.iter().map(|row| &row[idx]).collect();
            column_to_series(name, &values)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DataFrame::new(series)?)
}

fn column_to_series(name: &str, values: &[&Value]) -> Result<Series> {
    let kind = values.iter().find_map(|v| kind_of(v));
    let series = match kind {
        None => Series::full_null(name, values.len(), &DataType::String),
        Some(ColumnKind::Boolean) => {
            let data: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v {
                    Value::Boolean(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name, data)
        }
        Some(ColumnKind::Integer) => {
            let data: Vec<Option<i64>> = values.iter().map(|v| as_i64(v)).collect();
            Series::new(name, data)
        }
        Some(ColumnKind::Unsigned) => {
            let data: Vec<Option<u64>> = values
                .iter()
                .map(|v| match v {
                    Value::UBigInt(u) => Some(*u),
                    _ => None,
                })
                .collect();
            Series::new(name, data)
        }
        Some(ColumnKind::Float) => {
            let data: Vec<Option<f64>> = values.iter().map(|v| as_f64(v)).collect();
            Series::new(name, data)
        }
        Some(ColumnKind::Timestamp) => {
            let data: Vec<Option<i64>> = values.iter().map(|v| as_micros(v)).collect();
            Series::new(name, data).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
        Some(ColumnKind::Date) => {
            let data: Vec<Option<i32>> = values
                .iter()
                .map(|v| match v {
                    Value::Date32(days) => Some(*days),
                    _ => None,
                })
                .collect();
            Series::new(name, data).cast(&DataType::Date)?
        }
        Some(ColumnKind::Time) => {
            let data: Vec<Option<i64>> = values.iter().map(|v| as_nanos_of_day(v)).collect();
            Series::new(name, data).cast(&DataType::Time)?
        }
        Some(ColumnKind::Interval) => {
            let data: Vec<Option<i64>> = values.iter().map(|v| as_interval_micros(v)).collect();
            Series::new(name, data).cast(&DataType::Duration(TimeUnit::Microseconds))?
        }
        Some(ColumnKind::Text) => {
            let data: Vec<Option<String>> = values.iter().map(|v| as_text(v)).collect();
            Series::new(name, data)
        }
    };
    Ok(series)
}

fn kind_of(value: &Value) -> Option<ColumnKind> {
    match value {
        Value::Null => None,
        Value::Boolean(_) => Some(ColumnKind::Boolean),
        Value::TinyInt(_)
        | Value::SmallInt(_)
        | Value::Int(_)
        | Value::BigInt(_)
        | Value::UTinyInt(_)
        | Value::USmallInt(_)
        | Value::UInt(_) => Some(ColumnKind::Integer),
        Value::UBigInt(_) => Some(ColumnKind::Unsigned),
        Value::Float(_) | Value::Double(_) | Value::Decimal(_) | Value::HugeInt(_) => {
            Some(ColumnKind::Float)
        }
        Value::Timestamp(_, _) => Some(ColumnKind::Timestamp),
        Value::Date32(_) => Some(ColumnKind::Date),
        Value::Time64(_, _) => Some(ColumnKind::Time),
        Value::Interval { .. } => Some(ColumnKind::Interval),
        _ => Some(ColumnKind::Text),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::TinyInt(v) => Some(i64::from(*v)),
        Value::SmallInt(v) => Some(i64::from(*v)),
        Value::Int(v) => Some(i64::from(*v)),
        Value::BigInt(v) => Some(*v),
        Value::UTinyInt(v) => Some(i64::from(*v)),
        Value::USmallInt(v) => Some(i64::from(*v)),
        Value::UInt(v) => Some(i64::from(*v)),
        _ => None,
    }
}

/// DECIMAL and HUGEINT land in Float64; precision beyond an f64 is lost.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(f64::from(*v)),
        Value::Double(v) => Some(*v),
        Value::Decimal(v) => v.to_string().parse().ok(),
        Value::HugeInt(v) => Some(*v as f64),
        _ => None,
    }
}

/// `v` in `unit` converted to `target`; `None` when the result leaves the i64 range.
fn rescale(unit: &DuckTimeUnit, v: i64, target: &DuckTimeUnit) -> Option<i64> {
    let per_second = |unit: &DuckTimeUnit| -> i64 {
        match unit {
            DuckTimeUnit::Second => 1,
            DuckTimeUnit::Millisecond => 1_000,
            DuckTimeUnit::Microsecond => 1_000_000,
            DuckTimeUnit::Nanosecond => 1_000_000_000,
        }
    };
    let (from, to) = (per_second(unit), per_second(target));
    if from <= to {
        v.checked_mul(to / from)
    } else {
        Some(v / (from / to))
    }
}

fn as_micros(value: &Value) -> Option<i64> {
    match value {
        Value::Timestamp(unit, v) => rescale(unit, *v, &DuckTimeUnit::Microsecond),
        _ => None,
    }
}

fn as_nanos_of_day(value: &Value) -> Option<i64> {
    match value {
        Value::Time64(unit, v) => rescale(unit, *v, &DuckTimeUnit::Nanosecond),
        _ => None,
    }
}

fn as_interval_micros(value: &Value) -> Option<i64> {
    match value {
        Value::Interval { months, days, nanos } => {
            let days = i64::from(*months)
                .checked_mul(DAYS_PER_MONTH)?
                .checked_add(i64::from(*days))?;
            days.checked_mul(MICROS_PER_DAY)?.checked_add(nanos / 1_000)
        }
        _ => None,
    }
}

/// Text for string-like values; nested and binary values fall back to their debug form.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) | Value::Enum(s) => Some(s.clone()),
        other => Some(format!("{:?}", other)),
    }
}
