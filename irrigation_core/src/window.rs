//! Rolling history of recent readings and the dose features derived from it.
//!
//! Feature names follow the dose model's training columns:
//! `<channel>_pre_<stat>` for the window statistics,
//! `delta_soil_avg_min_vs_pre_mean`, and `*_at_event` snapshots of the
//! reading that triggered watering.

use std::collections::VecDeque;
use std::fmt;

use crate::telemetry::Reading;

/// Channels summarized over the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Soil1,
    Soil2,
    SoilAvg,
    SoilDiff,
    Temperature,
    Humidity,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Soil1,
        Channel::Soil2,
        Channel::SoilAvg,
        Channel::SoilDiff,
        Channel::Temperature,
        Channel::Humidity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Soil1 => "soil1",
            Channel::Soil2 => "soil2",
            Channel::SoilAvg => "soil_avg",
            Channel::SoilDiff => "soil_diff",
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
        }
    }

    #[inline]
    pub fn value(self, r: &Reading) -> f64 {
        match self {
            Channel::Soil1 => r.soil1(),
            Channel::Soil2 => r.soil2(),
            Channel::SoilAvg => r.soil_avg(),
            Channel::SoilDiff => r.soil_diff(),
            Channel::Temperature => r.temperature(),
            Channel::Humidity => r.humidity(),
        }
    }
}

/// Statistic taken over one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Mean,
    Std,
    Min,
    Max,
}

impl Stat {
    pub const ALL: [Stat; 4] = [Stat::Mean, Stat::Std, Stat::Min, Stat::Max];

    pub fn name(self) -> &'static str {
        match self {
            Stat::Mean => "mean",
            Stat::Std => "std",
            Stat::Min => "min",
            Stat::Max => "max",
        }
    }
}

pub const DELTA_FEATURE: &str = "delta_soil_avg_min_vs_pre_mean";
pub const AT_EVENT_FEATURES: [&str; 4] = [
    "soil_avg_at_event",
    "soil_diff_at_event",
    "temp_at_event",
    "humidity_at_event",
];

/// Summary statistics over one channel. `std` is the population deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ChannelStats {
    /// `None` for an empty input.
    #[allow(clippy::float_cmp)]
    pub fn from_values(values: impl Iterator<Item = f64> + Clone) -> Option<Self> {
        let mut n = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.clone() {
            n += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if n == 0 {
            return None;
        }
        // a constant series must come out exact, not off by summation error
        if min == max {
            return Some(Self {
                mean: min,
                std: 0.0,
                min,
                max,
            });
        }
        let mean = sum / n as f64;
        let var = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
        Some(Self {
            mean,
            std: var.sqrt(),
            min,
            max,
        })
    }

    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Mean => self.mean,
            Stat::Std => self.std,
            Stat::Min => self.min,
            Stat::Max => self.max,
        }
    }
}

/// Returned by [`Window::build_features`] during warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientData {
    pub have: usize,
    pub need: usize,
}

impl fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window holds {} of {} readings", self.have, self.need)
    }
}

/// Named feature values in a fixed construction order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    /// Every name `Window::build_features` produces, in order.
    pub fn producible_names() -> Vec<String> {
        let mut names = Vec::with_capacity(Channel::ALL.len() * Stat::ALL.len() + 5);
        for ch in Channel::ALL {
            for stat in Stat::ALL {
                names.push(stat_name(ch, stat));
            }
        }
        names.push(DELTA_FEATURE.to_string());
        names.extend(AT_EVENT_FEATURES.iter().map(|s| (*s).to_string()));
        names
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    fn push(&mut self, name: String, value: f64) {
        self.entries.push((name, value));
    }
}

fn stat_name(ch: Channel, stat: Stat) -> String {
    format!("{}_pre_{}", ch.name(), stat.name())
}

/// Fixed-capacity FIFO of the most recent readings.
#[derive(Debug, Clone)]
pub struct Window {
    buf: VecDeque<Reading>,
    capacity: usize,
}

impl Window {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append the newest reading, evicting the oldest when full.
    pub fn append(&mut self, reading: Reading) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(reading);
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> + Clone {
        self.buf.iter()
    }

    pub fn stats(&self, ch: Channel) -> Option<ChannelStats> {
        ChannelStats::from_values(self.buf.iter().map(move |r| ch.value(r)))
    }

    /// Window statistics plus an at-event snapshot of `at_event`.
    pub fn build_features(&self, at_event: &Reading) -> Result<FeatureVector, InsufficientData> {
        if !self.is_full() {
            return Err(InsufficientData {
                have: self.buf.len(),
                need: self.capacity,
            });
        }

        let mut fv = FeatureVector::default();
        let mut soil_avg = None;
        for ch in Channel::ALL {
            let Some(stats) = self.stats(ch) else {
                return Err(InsufficientData {
                    have: 0,
                    need: self.capacity,
                });
            };
            for stat in Stat::ALL {
                fv.push(stat_name(ch, stat), stats.get(stat));
            }
            if ch == Channel::SoilAvg {
                soil_avg = Some(stats);
            }
        }

        let delta = soil_avg.map_or(0.0, |s| s.min - s.mean);
        fv.push(DELTA_FEATURE.to_string(), delta);

        let snapshot = [
            at_event.soil_avg(),
            at_event.soil_diff(),
            at_event.temperature(),
            at_event.humidity(),
        ];
        for (name, value) in AT_EVENT_FEATURES.iter().zip(snapshot) {
            fv.push((*name).to_string(), value);
        }
        Ok(fv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(soil1: f64, soil2: f64) -> Reading {
        Reading::new(soil1, soil2, 20.0, 50.0, None)
    }

    #[test]
    fn population_std_divides_by_n() {
        let s = ChannelStats::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter())
            .unwrap();
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.std, 2.0);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
    }

    #[test]
    fn each_stat_reads_its_own_field() {
        let s = ChannelStats::from_values([1.0, 3.0].into_iter()).unwrap();
        let got: Vec<f64> = Stat::ALL.iter().map(|&st| s.get(st)).collect();
        assert_eq!(got, vec![2.0, 1.0, 1.0, 3.0]);
        let names: Vec<&str> = Stat::ALL.iter().map(|st| st.name()).collect();
        assert_eq!(names, ["mean", "std", "min", "max"]);
    }

    #[test]
    fn warm_up_reports_counts() {
        let mut w = Window::new(3);
        w.append(r(1.0, 1.0));
        let err = w.build_features(&r(1.0, 1.0)).unwrap_err();
        assert_eq!(err, InsufficientData { have: 1, need: 3 });
        assert_eq!(err.to_string(), "window holds 1 of 3 readings");
    }

    #[test]
    fn features_follow_producible_order() {
        let mut w = Window::new(2);
        w.append(r(10.0, 20.0));
        w.append(r(30.0, 40.0));
        let fv = w.build_features(&r(30.0, 40.0)).unwrap();
        let names: Vec<&str> = fv.iter().map(|(n, _)| n).collect();
        assert_eq!(names, FeatureVector::producible_names());
        assert_eq!(fv.len(), 29);
    }

    #[test]
    fn delta_and_at_event_values() {
        let mut w = Window::new(3);
        w.append(r(100.0, 110.0)); // avg 105
        w.append(r(90.0, 100.0)); // avg 95
        w.append(r(110.0, 120.0)); // avg 115
        let trigger = Reading::new(110.0, 120.0, 23.5, 61.0, Some(300.0));
        let fv = w.build_features(&trigger).unwrap();
        assert_eq!(fv.get("soil_avg_pre_mean"), Some(105.0));
        assert_eq!(fv.get("soil_avg_pre_min"), Some(95.0));
        assert_eq!(fv.get(DELTA_FEATURE), Some(-10.0));
        assert_eq!(fv.get("soil_diff_pre_std"), Some(0.0));
        assert_eq!(fv.get("soil_avg_at_event"), Some(115.0));
        assert_eq!(fv.get("soil_diff_at_event"), Some(10.0));
        assert_eq!(fv.get("temp_at_event"), Some(23.5));
        assert_eq!(fv.get("humidity_at_event"), Some(61.0));
        assert_eq!(fv.get("light_at_event"), None);
    }

    #[test]
    fn eviction_keeps_newest() {
        let mut w = Window::new(2);
        for i in 0..5 {
            w.append(r(f64::from(i), 0.0));
        }
        let kept: Vec<f64> = w.iter().map(Reading::soil1).collect();
        assert_eq!(kept, vec![3.0, 4.0]);
        assert!(w.is_full());
    }
}
