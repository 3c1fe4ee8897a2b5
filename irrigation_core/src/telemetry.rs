//! Telemetry records: `KEY:VALUE` pairs separated by commas.
//!
//! Parsing is lenient per token and strict per record: a token that is not
//! `key<sep>number` is skipped, but the record is dropped unless every
//! required key ended up with a value.

use crate::config::TelemetryCfg;

/// One sensor sample. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    soil1: f64,
    soil2: f64,
    temperature: f64,
    humidity: f64,
    light: Option<f64>,
}

impl Reading {
    pub fn new(soil1: f64, soil2: f64, temperature: f64, humidity: f64, light: Option<f64>) -> Self {
        Self {
            soil1,
            soil2,
            temperature,
            humidity,
            light,
        }
    }

    #[inline]
    pub fn soil1(&self) -> f64 {
        self.soil1
    }
    #[inline]
    pub fn soil2(&self) -> f64 {
        self.soil2
    }
    #[inline]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
    #[inline]
    pub fn humidity(&self) -> f64 {
        self.humidity
    }
    #[inline]
    pub fn light(&self) -> Option<f64> {
        self.light
    }

    /// Mean of the two soil probes.
    #[inline]
    pub fn soil_avg(&self) -> f64 {
        0.5 * (self.soil1 + self.soil2)
    }

    /// Disagreement between the two soil probes.
    #[inline]
    pub fn soil_diff(&self) -> f64 {
        (self.soil1 - self.soil2).abs()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryParser {
    cfg: TelemetryCfg,
}

impl TelemetryParser {
    pub fn new(cfg: TelemetryCfg) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &TelemetryCfg {
        &self.cfg
    }

    /// Cheap check run before `parse`: both soil keys must appear somewhere.
    pub fn passes_prefilter(&self, line: &str) -> bool {
        line.contains(self.cfg.soil1_key.as_str()) && line.contains(self.cfg.soil2_key.as_str())
    }

    /// Parse one record, or `None` if a required key is missing.
    pub fn parse(&self, line: &str) -> Option<Reading> {
        let cfg = &self.cfg;
        let mut soil1 = None;
        let mut soil2 = None;
        let mut temperature = None;
        let mut humidity = None;
        let mut light = None;

        for token in line.split(',') {
            let Some((key, value)) = token.split_once(cfg.separator) else {
                continue;
            };
            let Ok(value) = value.trim().parse::<f64>() else {
                continue;
            };
            if !value.is_finite() {
                continue;
            }
            let key = key.trim();
            let slot = if key == cfg.soil1_key {
                &mut soil1
            } else if key == cfg.soil2_key {
                &mut soil2
            } else if key == cfg.temperature_key {
                &mut temperature
            } else if key == cfg.humidity_key {
                &mut humidity
            } else if key == cfg.light_key {
                &mut light
            } else {
                continue;
            };
            *slot = Some(value);
        }

        if cfg.require_light && light.is_none() {
            return None;
        }
        Some(Reading::new(soil1?, soil2?, temperature?, humidity?, light))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_line() {
        let p = TelemetryParser::default();
        let r = p.parse("S1:802.0,S2:822.0,T:21.7,H:69.6,L:202").unwrap();
        assert_eq!(r.soil1(), 802.0);
        assert_eq!(r.soil2(), 822.0);
        assert_eq!(r.temperature(), 21.7);
        assert_eq!(r.humidity(), 69.6);
        assert_eq!(r.light(), Some(202.0));
        assert_eq!(r.soil_avg(), 812.0);
        assert_eq!(r.soil_diff(), 20.0);
    }

    #[test]
    fn tolerates_whitespace_and_unknown_keys() {
        let p = TelemetryParser::default();
        let r = p.parse(" S1 : 10 , S2:20,T:1,RSSI:-70,H: 2 ,junk").unwrap();
        assert_eq!(r.soil_avg(), 15.0);
        assert_eq!(r.light(), None);
    }

    #[test]
    fn unparseable_required_value_drops_record() {
        let p = TelemetryParser::default();
        assert_eq!(p.parse("S1:300,S2:ABC,T:20,H:50,L:100"), None);
    }

    #[test]
    fn unparseable_optional_value_is_skipped() {
        let p = TelemetryParser::default();
        let r = p.parse("S1:300,S2:310,T:20,H:50,L:dark").unwrap();
        assert_eq!(r.light(), None);
    }

    #[test]
    fn non_finite_values_count_as_missing() {
        let p = TelemetryParser::default();
        assert_eq!(p.parse("S1:NaN,S2:1,T:1,H:1"), None);
        assert_eq!(p.parse("S1:inf,S2:1,T:1,H:1"), None);
    }

    #[test]
    fn value_may_contain_separator_after_the_first() {
        let p = TelemetryParser::default();
        // split on the first ':' only, so the value "1:2" is not a number
        assert_eq!(p.parse("S1:1:2,S2:1,T:1,H:1"), None);
    }

    #[test]
    fn light_can_be_required() {
        let p = TelemetryParser::new(TelemetryCfg {
            require_light: true,
            ..TelemetryCfg::default()
        });
        assert_eq!(p.parse("S1:1,S2:1,T:1,H:1"), None);
        assert!(p.parse("S1:1,S2:1,T:1,H:1,L:5").is_some());
    }

    #[test]
    fn equals_variant() {
        let p = TelemetryParser::new(TelemetryCfg {
            separator: '=',
            soil1_key: "SOIL1".into(),
            soil2_key: "SOIL2".into(),
            temperature_key: "TEMP".into(),
            humidity_key: "HUM".into(),
            light_key: "LIGHT".into(),
            ..TelemetryCfg::default()
        });
        let r = p
            .parse("SOIL1=45.2, SOIL2=52.0,TEMP=23.5,HUM=48.0,LIGHT=300")
            .unwrap();
        assert!((r.soil_avg() - 48.6).abs() < 1e-9);
        assert_eq!(r.light(), Some(300.0));
    }

    #[test]
    fn prefilter_needs_both_soil_keys() {
        let p = TelemetryParser::default();
        assert!(p.passes_prefilter("S1:1,S2:2"));
        assert!(!p.passes_prefilter("[ESP32] boot S1 only"));
        assert!(!p.passes_prefilter(""));
    }
}
