/*
 * Copyright (c) 2021 gematik GmbH
 * 
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 * 
 *    http://www.apache.org/licenses/LICENSE-2.0
 * 
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use chrono::{DateTime as ChronoDateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use resources::primitives::{Date, DateTime};

use crate::error::Error;

const DATE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
const DATE_FORMAT: &str = "%Y%m%d";

/// Parses an HL7 V3 `TS` value. Seconds precision values are read as UTC,
/// date only values as midnight UTC. Trailing precision is ignored.
pub fn parse_timestamp(value: &str) -> Result<ChronoDateTime<Utc>, Error> {
    let invalid = || Error::InvalidTimestamp(value.to_owned());

    if let Some(date_time) = value.get(..14).filter(|s| is_digits(s)) {
        let date_time =
            NaiveDateTime::parse_from_str(date_time, DATE_TIME_FORMAT).map_err(|_| invalid())?;

        return Ok(Utc.from_utc_datetime(&date_time));
    }

    let date = parse_date(value)?;

    Ok(Utc.from_utc_datetime(&date.and_hms(0, 0, 0)))
}

pub fn parse_date(value: &str) -> Result<NaiveDate, Error> {
    value
        .get(..8)
        .filter(|s| is_digits(s))
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        .ok_or_else(|| Error::InvalidTimestamp(value.to_owned()))
}

pub fn to_fhir_date_time(value: &str) -> Result<DateTime, Error> {
    Ok(parse_timestamp(value)?.into())
}

pub fn to_fhir_date(value: &str) -> Result<Date, Error> {
    Ok(parse_date(value)?.into())
}

pub fn format_timestamp<TZ: TimeZone>(value: &ChronoDateTime<TZ>) -> String
where
    TZ::Offset: std::fmt::Display,
{
    value.with_timezone(&Utc).format(DATE_TIME_FORMAT).to_string()
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_date_time() {
        assert_eq!(
            to_fhir_date_time("20210302151410").unwrap().as_str(),
            "2021-03-02T15:14:10+00:00"
        );
        assert_eq!(
            to_fhir_date_time("20210302").unwrap().as_str(),
            "2021-03-02T00:00:00+00:00"
        );
    }

    #[test]
    fn convert_date() {
        assert_eq!(to_fhir_date("20210302151410").unwrap().as_str(), "2021-03-02");
        assert!(to_fhir_date("2021").is_err());
        assert!(to_fhir_date("2021-03-02").is_err());
    }

    #[test]
    fn format_round_trip() {
        let value = parse_timestamp("20201231235959").unwrap();

        assert_eq!(format_timestamp(&value), "20201231235959");
    }
}
