use super::{arity_pos, check_arity, int_arg, str_arg, time_arg, unknown_function, Arg, Library};
use crate::{
    error::Error,
    source::Position,
    value::{TimeValue, Value},
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Write as _;

/// Instants and calendar arithmetic. A `Time` value is an epoch-millis
/// instant plus an IANA zone used for formatting and decomposition; all
/// parsing normalizes to UTC, and only `withZone` changes the zone.
pub struct TimeLib;

fn zone_of(time: &TimeValue) -> Tz {
    time.zone.parse().unwrap_or(chrono_tz::UTC)
}

fn datetime_in(time: &TimeValue, pos: Position, func: &str) -> Result<DateTime<Tz>, Error> {
    zone_of(time)
        .timestamp_millis_opt(time.epoch_millis)
        .single()
        .ok_or_else(|| Error::type_error(format!("{}: timestamp out of range", func), pos))
}

fn parse_error(err: chrono::ParseError, pos: Position) -> Error {
    Error::type_error(format!("time.parse error: {}", err), pos)
}

impl Library for TimeLib {
    fn call(
        &self,
        function: &str,
        args: &[Arg],
        call_pos: Position,
        paren_pos: Position,
    ) -> Result<Value, Error> {
        match function {
            "now" => {
                check_arity(args, 0, 0, "time.now() takes no arguments", paren_pos)?;
                Ok(Value::Time(TimeValue::new(
                    Utc::now().timestamp_millis(),
                    "UTC",
                )))
            }
            "parse" => {
                check_arity(
                    args,
                    2,
                    usize::MAX,
                    "time.parse requires at least 2 arguments",
                    paren_pos,
                )?;
                let input = str_arg(&args[0], "time.parse: first argument must be a string")?;
                let format = str_arg(&args[1], "time.parse: second argument must be a string")?;
                let millis = match format {
                    "iso8601" => DateTime::parse_from_rfc3339(input)
                        .map(|dt| dt.timestamp_millis())
                        .map_err(|err| parse_error(err, args[0].pos))?,
                    "dateOnly" => NaiveDate::parse_from_str(input, "%Y-%m-%d")
                        .map(|date| date.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
                        .map_err(|err| parse_error(err, args[0].pos))?,
                    "epochMillis" => input.parse::<i64>().map_err(|_| {
                        Error::type_error("time.parse: invalid epochMillis", args[0].pos)
                    })?,
                    "rfc2822" => DateTime::parse_from_rfc2822(input)
                        .map(|dt| dt.timestamp_millis())
                        .map_err(|err| parse_error(err, args[0].pos))?,
                    "custom" => {
                        if args.len() != 3 {
                            return Err(Error::parameter(
                                "time.parse with 'custom' requires a formatDetails argument",
                                arity_pos(args, paren_pos),
                            ));
                        }
                        let pattern =
                            str_arg(&args[2], "time.parse: formatDetails must be a string")?;
                        match DateTime::parse_from_str(input, pattern) {
                            Ok(dt) => dt.timestamp_millis(),
                            // Patterns without an offset parse as a naive
                            // datetime, taken to be UTC.
                            Err(_) => NaiveDateTime::parse_from_str(input, pattern)
                                .map(|dt| dt.and_utc().timestamp_millis())
                                .map_err(|err| parse_error(err, args[0].pos))?,
                        }
                    }
                    _ => {
                        return Err(Error::type_error("time.parse: unknown format", args[1].pos));
                    }
                };
                Ok(Value::Time(TimeValue::new(millis, "UTC")))
            }
            "add" => {
                check_arity(args, 2, 2, "time.add requires 2 arguments", paren_pos)?;
                let time = time_arg(&args[0], "time.add: first argument must be Time")?;
                let millis = int_arg(&args[1], "time.add: second argument must be numeric")?;
                Ok(Value::Time(TimeValue::new(
                    time.epoch_millis.wrapping_add(millis),
                    time.zone.clone(),
                )))
            }
            "subtract" => {
                check_arity(args, 2, 2, "time.subtract requires 2 arguments", paren_pos)?;
                let time = time_arg(&args[0], "time.subtract: first argument must be Time")?;
                let millis = int_arg(&args[1], "time.subtract: second argument must be numeric")?;
                Ok(Value::Time(TimeValue::new(
                    time.epoch_millis.wrapping_sub(millis),
                    time.zone.clone(),
                )))
            }
            "diff" => {
                check_arity(args, 2, 2, "time.diff requires 2 arguments", paren_pos)?;
                let a = time_arg(&args[0], "time.diff: first argument must be Time")?;
                let b = time_arg(&args[1], "time.diff: second argument must be Time")?;
                Ok(Value::Int(a.epoch_millis - b.epoch_millis))
            }
            "isBefore" => {
                check_arity(args, 2, 2, "time.isBefore requires 2 arguments", paren_pos)?;
                let a = time_arg(&args[0], "time.isBefore: first argument must be Time")?;
                let b = time_arg(&args[1], "time.isBefore: second argument must be Time")?;
                Ok(Value::Bool(a.epoch_millis < b.epoch_millis))
            }
            "isAfter" => {
                check_arity(args, 2, 2, "time.isAfter requires 2 arguments", paren_pos)?;
                let a = time_arg(&args[0], "time.isAfter: first argument must be Time")?;
                let b = time_arg(&args[1], "time.isAfter: second argument must be Time")?;
                Ok(Value::Bool(a.epoch_millis > b.epoch_millis))
            }
            "isEqual" => {
                check_arity(args, 2, 2, "time.isEqual requires 2 arguments", paren_pos)?;
                let a = time_arg(&args[0], "time.isEqual: first argument must be Time")?;
                let b = time_arg(&args[1], "time.isEqual: second argument must be Time")?;
                Ok(Value::Bool(a.epoch_millis == b.epoch_millis))
            }
            "toEpochMillis" => {
                check_arity(args, 1, 1, "time.toEpochMillis requires 1 argument", paren_pos)?;
                let time = time_arg(&args[0], "time.toEpochMillis: argument must be Time")?;
                Ok(Value::Int(time.epoch_millis))
            }
            "format" => {
                check_arity(args, 2, 2, "time.format requires 2 arguments", paren_pos)?;
                let time = time_arg(&args[0], "time.format: first argument must be Time")?;
                let pattern = str_arg(&args[1], "time.format: second argument must be string")?;
                let dt = datetime_in(time, args[0].pos, "time.format")?;
                let mut out = String::new();
                write!(out, "{}", dt.format(pattern))
                    .map_err(|_| Error::type_error("time.format: invalid format", args[1].pos))?;
                Ok(Value::Str(out))
            }
            "getYear" => {
                check_arity(args, 1, 1, "time.getYear requires 1 argument", paren_pos)?;
                let time = time_arg(&args[0], "time.getYear: argument must be Time")?;
                let dt = datetime_in(time, args[0].pos, "time.getYear")?;
                Ok(Value::Int(dt.year() as i64))
            }
            "getMonth" => {
                check_arity(args, 1, 1, "time.getMonth requires 1 argument", paren_pos)?;
                let time = time_arg(&args[0], "time.getMonth: argument must be Time")?;
                let dt = datetime_in(time, args[0].pos, "time.getMonth")?;
                Ok(Value::Int(dt.month() as i64))
            }
            "getDay" => {
                check_arity(args, 1, 1, "time.getDay requires 1 argument", paren_pos)?;
                let time = time_arg(&args[0], "time.getDay: argument must be Time")?;
                let dt = datetime_in(time, args[0].pos, "time.getDay")?;
                Ok(Value::Int(dt.day() as i64))
            }
            "startOfDay" => {
                check_arity(args, 1, 1, "time.startOfDay requires 1 argument", paren_pos)?;
                let time = time_arg(&args[0], "time.startOfDay: argument must be Time")?;
                let zone = zone_of(time);
                let dt = datetime_in(time, args[0].pos, "time.startOfDay")?;
                let start = zone
                    .with_ymd_and_hms(dt.year(), dt.month(), dt.day(), 0, 0, 0)
                    .earliest()
                    .ok_or_else(|| {
                        Error::type_error("time.startOfDay: invalid local time", args[0].pos)
                    })?;
                Ok(Value::Time(TimeValue::new(
                    start.timestamp_millis(),
                    zone.name(),
                )))
            }
            "endOfDay" => {
                check_arity(args, 1, 1, "time.endOfDay requires 1 argument", paren_pos)?;
                let time = time_arg(&args[0], "time.endOfDay: argument must be Time")?;
                let zone = zone_of(time);
                let dt = datetime_in(time, args[0].pos, "time.endOfDay")?;
                let end = zone
                    .with_ymd_and_hms(dt.year(), dt.month(), dt.day(), 23, 59, 59)
                    .earliest()
                    .ok_or_else(|| {
                        Error::type_error("time.endOfDay: invalid local time", args[0].pos)
                    })?;
                Ok(Value::Time(TimeValue::new(
                    end.timestamp_millis() + 999,
                    zone.name(),
                )))
            }
            "withZone" => {
                check_arity(args, 2, 2, "time.withZone requires 2 arguments", paren_pos)?;
                let time = time_arg(&args[0], "time.withZone: first argument must be Time")?;
                let zone_name = str_arg(&args[1], "time.withZone: second argument must be string")?;
                let zone: Tz = zone_name.parse().map_err(|_| {
                    Error::type_error("time.withZone: invalid zone name", args[1].pos)
                })?;
                Ok(Value::Time(TimeValue::new(time.epoch_millis, zone.name())))
            }
            _ => Err(unknown_function("time", function, call_pos)),
        }
    }
}
