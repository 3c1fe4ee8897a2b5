//! Simulated irrigation bed.
//!
//! Each sample the soil dries a little (raw capacitive readings rise); a
//! `WATER_ON` command wets it in proportion to the commanded seconds. Lines
//! are handed out in chunks smaller than a record so the framer always has
//! a partial tail to carry.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use irrigation_traits::{BoxError, Connection, Connector};

use crate::error::HwError;

#[derive(Debug, Clone)]
pub struct FieldParams {
    /// Starting raw reading of both soil channels.
    pub soil_start: f64,
    /// Raw units added per sample while not watering.
    pub dry_rate: f64,
    /// Raw units removed per commanded second of watering.
    pub wet_per_second: f64,
    /// Seconds assumed when the command carries `SEC:0`.
    pub default_seconds: u32,
    /// Offset between the two probes.
    pub probe_skew: f64,
    /// Bytes returned per read at most.
    pub chunk_size: usize,
    /// Pause before a new sample is produced.
    pub sample_interval: Duration,
    /// Fail every Nth read to exercise reconnects.
    pub disconnect_every: Option<u64>,
    pub seed: u32,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            soil_start: 470.0,
            dry_rate: 6.0,
            wet_per_second: 4.0,
            default_seconds: 8,
            probe_skew: 12.0,
            chunk_size: 16,
            sample_interval: Duration::ZERO,
            disconnect_every: None,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug)]
struct FieldState {
    params: FieldParams,
    soil: f64,
    rng: u32,
    reads: u64,
    samples: u64,
    pending: VecDeque<u8>,
    commands: Vec<String>,
}

impl FieldState {
    fn next_noise(&mut self) -> f64 {
        // xorshift32, deterministic per seed
        let mut x = self.rng.max(1);
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (f64::from(x) / f64::from(u32::MAX)) * 2.0 - 1.0
    }

    fn next_line(&mut self) -> String {
        self.samples += 1;
        self.soil += self.params.dry_rate;
        let n1 = self.next_noise();
        let n2 = self.next_noise();
        let s1 = self.soil + n1 * 2.0;
        let s2 = self.soil + self.params.probe_skew + n2 * 2.0;
        let t = 21.0 + self.next_noise();
        let h = 60.0 + 5.0 * self.next_noise();
        let l = 200.0 + 20.0 * self.next_noise();
        format!("S1:{s1:.1},S2:{s2:.1},T:{t:.1},H:{h:.1},L:{l:.0}\r\n")
    }

    fn apply_command(&mut self, text: &str) {
        let text = text.trim();
        self.commands.push(text.to_string());
        let Some(body) = text.strip_prefix("CMD:") else {
            tracing::warn!(command = text, "simulator ignored malformed command");
            return;
        };
        let mut parts = body.split(';');
        let action = parts.next().unwrap_or_default();
        let seconds = parts
            .next()
            .and_then(|p| p.strip_prefix("SEC:"))
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);
        if action == "WATER_ON" {
            let secs = if seconds == 0 {
                self.params.default_seconds
            } else {
                seconds
            };
            self.soil = (self.soil - self.params.wet_per_second * f64::from(secs)).max(0.0);
        }
    }
}

/// Connector handing out connections onto one shared simulated bed.
#[derive(Clone)]
pub struct SimulatedField {
    state: Arc<Mutex<FieldState>>,
}

impl SimulatedField {
    pub fn new(params: FieldParams) -> Self {
        let soil = params.soil_start;
        let rng = params.seed;
        Self {
            state: Arc::new(Mutex::new(FieldState {
                params,
                soil,
                rng,
                reads: 0,
                samples: 0,
                pending: VecDeque::new(),
                commands: Vec::new(),
            })),
        }
    }

    /// Commands received so far, newline stripped.
    pub fn commands(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.commands.clone())
            .unwrap_or_default()
    }

    /// Current soil level (average of both probes without noise).
    pub fn soil(&self) -> f64 {
        self.state.lock().map(|s| s.soil).unwrap_or(f64::NAN)
    }

    pub fn samples(&self) -> u64 {
        self.state.lock().map(|s| s.samples).unwrap_or(0)
    }
}

impl Default for SimulatedField {
    fn default() -> Self {
        Self::new(FieldParams::default())
    }
}

impl Connector for SimulatedField {
    fn open(&mut self) -> Result<Box<dyn Connection + Send>, BoxError> {
        Ok(Box::new(SimConnection {
            state: Arc::clone(&self.state),
        }))
    }

    fn describe(&self) -> String {
        "simulated-field".to_string()
    }
}

struct SimConnection {
    state: Arc<Mutex<FieldState>>,
}

impl Connection for SimConnection {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, BoxError> {
        let mut st = self
            .state
            .lock()
            .map_err(|_| HwError::Serial("simulator state poisoned".into()))?;
        st.reads += 1;
        if let Some(every) = st.params.disconnect_every
            && every > 0
            && st.reads % every == 0
        {
            return Err(Box::new(HwError::Disconnected(
                "simulated link drop".into(),
            )));
        }
        if st.pending.is_empty() {
            let interval = st.params.sample_interval;
            if !interval.is_zero() {
                drop(st);
                std::thread::sleep(interval);
                st = self
                    .state
                    .lock()
                    .map_err(|_| HwError::Serial("simulator state poisoned".into()))?;
            }
            let line = st.next_line();
            st.pending.extend(line.bytes());
        }
        let n = st.pending.len().min(st.params.chunk_size.max(1)).min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(st.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        let mut st = self
            .state
            .lock()
            .map_err(|_| HwError::Serial("simulator state poisoned".into()))?;
        let text = String::from_utf8_lossy(bytes);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            st.apply_command(line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_line(conn: &mut Box<dyn Connection + Send>) -> String {
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        while !out.ends_with(b"\n") {
            let n = conn.read(&mut buf, Duration::ZERO).unwrap();
            out.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn soil_dries_between_samples_and_watering_lowers_it() {
        let mut field = SimulatedField::new(FieldParams {
            dry_rate: 10.0,
            wet_per_second: 5.0,
            ..FieldParams::default()
        });
        let mut conn = field.open().unwrap();
        let _ = read_line(&mut conn);
        let after_one = field.soil();
        assert!((after_one - 480.0).abs() < 1e-9);

        conn.write_all(b"CMD:WATER_ON;SEC:8\n").unwrap();
        assert!((field.soil() - 440.0).abs() < 1e-9);
        assert_eq!(field.commands(), vec!["CMD:WATER_ON;SEC:8".to_string()]);
    }

    #[test]
    fn reads_are_smaller_than_a_record() {
        let mut field = SimulatedField::new(FieldParams {
            chunk_size: 7,
            ..FieldParams::default()
        });
        let mut conn = field.open().unwrap();
        let mut buf = [0u8; 64];
        let n = conn.read(&mut buf, Duration::ZERO).unwrap();
        assert_eq!(n, 7);
        assert!(buf.starts_with(b"S1:"));
    }

    #[test]
    fn water_off_leaves_soil_alone() {
        let mut field = SimulatedField::default();
        let mut conn = field.open().unwrap();
        let before = field.soil();
        conn.write_all(b"CMD:WATER_OFF;SEC:0\n").unwrap();
        assert_eq!(field.soil(), before);
    }

    #[test]
    fn disconnect_every_fails_periodically() {
        let mut field = SimulatedField::new(FieldParams {
            disconnect_every: Some(3),
            ..FieldParams::default()
        });
        let mut conn = field.open().unwrap();
        let mut buf = [0u8; 64];
        assert!(conn.read(&mut buf, Duration::ZERO).is_ok());
        assert!(conn.read(&mut buf, Duration::ZERO).is_ok());
        let err = conn.read(&mut buf, Duration::ZERO).unwrap_err();
        assert!(err.downcast_ref::<HwError>().is_some());
    }
}
