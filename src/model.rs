//! Typed views over the records AEMET returns.
//!
//! Only the fields the exporters need are named; every other field is kept in
//! `extra` so that records serialize back to exactly what upstream sent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util::parse_decimal;

/// An entry of the station inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Station identifier, e.g. `"3195"` (Madrid, Retiro).
    pub indicativo: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub provincia: String,
    /// Degrees-minutes-seconds with hemisphere suffix, e.g. `"402443N"`.
    #[serde(default)]
    pub latitud: String,
    #[serde(default)]
    pub longitud: String,
    /// Metres above sea level, as a string.
    #[serde(default)]
    pub altitud: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Station {
    pub fn latitude(&self) -> Option<f64> {
        parse_dms(&self.latitud)
    }

    pub fn longitude(&self) -> Option<f64> {
        parse_dms(&self.longitud)
    }

    pub fn altitude(&self) -> Option<f64> {
        parse_decimal(&self.altitud)
    }
}

/// One day of measurements for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateValue {
    pub fecha: String,
    pub indicativo: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClimateValue {
    pub fn date(&self) -> Option<NaiveDate> {
        parse_fecha(&self.fecha)
    }

    /// Numeric value of a measurement such as `tmed` or `prec`.
    ///
    /// Trace precipitation (`"Ip"`) reads as `0.0`; accumulated or missing
    /// values read as `None`.
    pub fn measurement(&self, name: &str) -> Option<f64> {
        match self.extra.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if s == "Ip" => Some(0.0),
            Value::String(s) => parse_decimal(s),
            _ => None,
        }
    }

    pub fn tmed(&self) -> Option<f64> {
        self.measurement("tmed")
    }

    pub fn prec(&self) -> Option<f64> {
        self.measurement("prec")
    }
}

/// Parses a `fecha` field (`YYYY-MM-DD`).
pub(crate) fn parse_fecha(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parses `DDMMSS[NSEW]` (longitude may use three degree digits).
fn parse_dms(s: &str) -> Option<f64> {
    let s = s.trim();
    let hemi = s.chars().last()?;
    let digits = &s[..s.len() - hemi.len_utf8()];
    if digits.len() < 5 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (deg, rest) = digits.split_at(digits.len() - 4);
    let deg: f64 = deg.parse().ok()?;
    let min: f64 = rest[..2].parse().ok()?;
    let sec: f64 = rest[2..].parse().ok()?;
    let value = deg + min / 60.0 + sec / 3600.0;
    match hemi {
        'N' | 'E' => Some(value),
        'S' | 'W' => Some(-value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn station_roundtrips_unknown_fields() {
        let raw = json!({
            "latitud": "402443N",
            "provincia": "MADRID",
            "altitud": "667",
            "indicativo": "3195",
            "nombre": "MADRID, RETIRO",
            "indsinop": "08222",
            "longitud": "034041W"
        });
        let st: Station = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(st.indicativo, "3195");
        assert_eq!(st.extra.get("indsinop"), Some(&json!("08222")));
        assert_eq!(serde_json::to_value(&st).unwrap(), raw);

        let lat = st.latitude().unwrap();
        assert!((lat - 40.411944).abs() < 1e-4);
        let lon = st.longitude().unwrap();
        assert!((lon + 3.678055).abs() < 1e-4);
        assert_eq!(st.altitude(), Some(667.0));
    }

    #[test]
    fn climate_value_measurements() {
        let v: ClimateValue = serde_json::from_value(json!({
            "fecha": "2025-01-02",
            "indicativo": "3195",
            "tmed": "7,8",
            "prec": "Ip",
            "racha": "Varias",
        }))
        .unwrap();
        assert_eq!(v.date(), NaiveDate::from_ymd_opt(2025, 1, 2));
        assert_eq!(v.tmed(), Some(7.8));
        assert_eq!(v.prec(), Some(0.0));
        assert_eq!(v.measurement("racha"), None);
        assert_eq!(v.measurement("sol"), None);
    }

    #[test]
    fn bad_dms() {
        assert_eq!(parse_dms(""), None);
        assert_eq!(parse_dms("40N"), None);
        assert_eq!(parse_dms("402443X"), None);
    }
}
