//! Normalization from raw catalog records to [`ratp_core::ShopRow`].
//!
//! Source keys are cleaned the same way for every record (lowercase, spaces
//! become underscores) and then matched against a fixed alias table. The
//! first alias carrying a usable scalar wins; every alias of the column that
//! is present is consumed so it does not reappear in `extra`.
//!
//! Coordinates are looked up in this order:
//! 1. `geocodage_ban` / `geo_point_2d` as an object `{"lat": .., "lon": ..}`,
//! 2. `coordonnees` / `geo_point_2d` / `geolocation` as `"lat,lon"` or `[lat, lon]`,
//! 3. separate `latitude|lat` and `longitude|lon|lng` fields.
//!
//! A record without a usable location is dropped and listed in
//! [`NormalizedTable::dropped`]; it never becomes a `(0, 0)` point.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use ratp_core::{ShopRow, UNKNOWN};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::Record;

const SHOP_TYPE: &[&str] = &["tco_libelle", "commerce", "type_commerce"];
const NAME: &[&str] = &["dea_nom_commerce", "nom_commerce"];
const CLOSING_DAY: &[&str] = &["dea_jour_fermeture", "jour_fermeture"];
const STREET: &[&str] = &["dea_rue_livraison", "rue"];
const POSTAL_CODE: &[&str] = &["dea_cp_livraison", "code_postal"];
const COMMUNE: &[&str] = &["dea_commune_livraison", "commune"];

const POINT_OBJECTS: &[&str] = &["geocodage_ban", "geo_point_2d"];
const POINT_COMPOSITES: &[&str] = &["coordonnees", "geo_point_2d", "geolocation"];
const LATITUDE: &[&str] = &["latitude", "lat"];
const LONGITUDE: &[&str] = &["longitude", "lon", "lng"];

/// Why a record's location could not be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("no coordinate field present")]
    Missing,

    #[error("malformed coordinates in {field}: {value}")]
    Malformed { field: String, value: String },

    #[error("coordinates out of range: ({latitude}, {longitude})")]
    OutOfRange { latitude: f64, longitude: f64 },
}

/// A source record excluded from the table.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    /// Position of the record in the snapshot.
    pub index: usize,
    pub reason: CoordinateError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    pub rows: Vec<ShopRow>,
    pub dropped: Vec<DroppedRow>,
}

impl NormalizedTable {
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Normalizes every record, keeping input order.
///
/// `rows.len() + dropped.len()` always equals `records.len()`.
#[must_use]
pub fn normalize(records: &[Record]) -> NormalizedTable {
    let mut table = NormalizedTable::default();

    for (index, record) in records.iter().enumerate() {
        match normalize_record(record) {
            Ok(row) => table.rows.push(row),
            Err(reason) => {
                tracing::debug!(index, %reason, "dropping record without usable coordinates");
                table.dropped.push(DroppedRow { index, reason });
            }
        }
    }

    if !table.dropped.is_empty() {
        tracing::warn!(
            dropped = table.dropped.len(),
            kept = table.rows.len(),
            "records dropped during normalization"
        );
    }

    table
}

/// Normalizes one record.
///
/// # Errors
///
/// Returns a [`CoordinateError`] when no usable latitude/longitude pair can
/// be extracted. Every other field falls back to [`UNKNOWN`].
pub fn normalize_record(record: &Record) -> Result<ShopRow, CoordinateError> {
    let mut fields = CleanedFields::new(record);

    let (latitude, longitude) = fields.take_coordinates()?;

    let shop_type = fields.take_text(SHOP_TYPE);
    let name = fields.take_text(NAME);
    let closing_day = fields.take_text(CLOSING_DAY);
    let street = fields.take_text(STREET);
    let postal_code = fields.take_text(POSTAL_CODE);
    let commune = fields.take_text(COMMUNE);

    Ok(ShopRow {
        shop_type,
        name,
        closing_day,
        street,
        postal_code,
        commune,
        latitude,
        longitude,
        extra: fields.into_extra(),
    })
}

/// Record fields keyed by cleaned name, with consumption tracking.
///
/// When two source keys clean to the same name, the one already in clean
/// form owns the slot and the other is kept under its raw spelling, so it
/// still reaches `extra`.
struct CleanedFields<'a> {
    fields: BTreeMap<String, &'a Value>,
    shadowed: Vec<(&'a str, &'a Value)>,
}

impl<'a> CleanedFields<'a> {
    fn new(record: &'a Record) -> Self {
        let mut fields: BTreeMap<String, (&'a str, &'a Value)> = BTreeMap::new();
        let mut shadowed = Vec::new();

        for (key, value) in record {
            match fields.entry(clean_key(key)) {
                Entry::Vacant(slot) => {
                    slot.insert((key.as_str(), value));
                }
                Entry::Occupied(mut slot) => {
                    tracing::debug!(
                        field = %slot.key(),
                        first = slot.get().0,
                        second = key.as_str(),
                        "source keys collide after cleanup"
                    );
                    if key == slot.key() {
                        shadowed.push(slot.insert((key.as_str(), value)));
                    } else {
                        shadowed.push((key.as_str(), value));
                    }
                }
            }
        }

        Self {
            fields: fields
                .into_iter()
                .map(|(cleaned, (_, value))| (cleaned, value))
                .collect(),
            shadowed,
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key).copied()
    }

    /// First usable scalar among `aliases`. Every alias present is consumed,
    /// whatever its value, so none of them reappears in `extra`.
    fn take_text(&mut self, aliases: &[&str]) -> String {
        let mut found = None;
        for alias in aliases {
            let Some(value) = self.fields.remove(*alias) else {
                continue;
            };
            if found.is_none() {
                found = scalar_text(value);
            }
        }
        found.unwrap_or_else(|| UNKNOWN.to_owned())
    }

    fn take_coordinates(&mut self) -> Result<(f64, f64), CoordinateError> {
        let mut first_failure: Option<CoordinateError> = None;
        let mut note = |failure: CoordinateError| {
            if first_failure.is_none() {
                first_failure = Some(failure);
            }
        };

        for key in POINT_OBJECTS {
            if let Some(Value::Object(point)) = self.get(key) {
                match point_from_object(key, point) {
                    Ok(pair) => return self.accept(&[*key], pair),
                    Err(e) => note(e),
                }
            }
        }

        for key in POINT_COMPOSITES {
            match self.get(key) {
                None | Some(Value::Object(_) | Value::Null) => {}
                Some(value) => match point_from_composite(key, value) {
                    Ok(pair) => return self.accept(&[*key], pair),
                    Err(e) => note(e),
                },
            }
        }

        let lat = LATITUDE.iter().find_map(|k| self.get(k).map(|v| (*k, v)));
        let lon = LONGITUDE.iter().find_map(|k| self.get(k).map(|v| (*k, v)));
        match (lat, lon) {
            (Some((lat_key, lat_value)), Some((lon_key, lon_value))) => {
                match (coordinate_number(lat_value), coordinate_number(lon_value)) {
                    (Some(latitude), Some(longitude)) => {
                        return self.accept(&[lat_key, lon_key], (latitude, longitude));
                    }
                    (None, _) => note(malformed(lat_key, lat_value)),
                    (_, None) => note(malformed(lon_key, lon_value)),
                }
            }
            (Some((key, value)), None) | (None, Some((key, value))) => {
                note(malformed(key, value));
            }
            (None, None) => {}
        }

        Err(first_failure.unwrap_or(CoordinateError::Missing))
    }

    fn accept(
        &mut self,
        keys: &[&str],
        (latitude, longitude): (f64, f64),
    ) -> Result<(f64, f64), CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::OutOfRange {
                latitude,
                longitude,
            });
        }
        for key in keys {
            self.fields.remove(*key);
        }
        Ok((latitude, longitude))
    }

    fn into_extra(self) -> Map<String, Value> {
        self.fields
            .into_iter()
            .map(|(key, value)| (key, value.clone()))
            .chain(
                self.shadowed
                    .into_iter()
                    .map(|(key, value)| (key.to_owned(), value.clone())),
            )
            .collect()
    }
}

/// Lowercases and replaces spaces with underscores.
fn clean_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

/// String form of a scalar, or `None` for null, blank, arrays and objects.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coordinate_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn malformed(field: &str, value: &Value) -> CoordinateError {
    CoordinateError::Malformed {
        field: field.to_owned(),
        value: value.to_string(),
    }
}

fn point_from_object(
    key: &str,
    point: &Map<String, Value>,
) -> Result<(f64, f64), CoordinateError> {
    let lat = point.get("lat").and_then(coordinate_number);
    let lon = point
        .get("lon")
        .or_else(|| point.get("lng"))
        .and_then(coordinate_number);
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Err(CoordinateError::Malformed {
            field: key.to_owned(),
            value: Value::Object(point.clone()).to_string(),
        }),
    }
}

fn point_from_composite(key: &str, value: &Value) -> Result<(f64, f64), CoordinateError> {
    let pair = match value {
        Value::String(s) => {
            let mut parts = s.split(',');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(lat), Some(lon), None) => lat
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .zip(lon.trim().parse::<f64>().ok()),
                _ => None,
            }
        }
        Value::Array(items) if items.len() == 2 => {
            coordinate_number(&items[0]).zip(coordinate_number(&items[1]))
        }
        _ => None,
    };

    match pair {
        Some((lat, lon)) if lat.is_finite() && lon.is_finite() => Ok((lat, lon)),
        _ => Err(malformed(key, value)),
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
