use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use irrigation_core::{
    Controller, FeatureVector, FixedEstimator, LineFramer, Reading, TelemetryCfg, TelemetryParser,
    Window,
};

// Deterministic drifting soil trace with xorshift noise
fn synth_readings(n: usize, seed: u32) -> Vec<Reading> {
    let mut state = seed.max(1);
    let mut noise = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / f64::from(u32::MAX) * 2.0 - 1.0
    };
    (0..n)
        .map(|i| {
            let base = 480.0 + (i as f64 / 20.0).sin() * 60.0;
            Reading::new(
                base + noise() * 3.0,
                base + 10.0 + noise() * 3.0,
                21.0 + noise(),
                60.0 + noise() * 4.0,
                Some(200.0),
            )
        })
        .collect()
}

fn telemetry_stream(readings: &[Reading]) -> Vec<u8> {
    let mut out = Vec::new();
    for r in readings {
        out.extend_from_slice(
            format!(
                "S1:{:.1},S2:{:.1},T:{:.1},H:{:.1},L:200\r\n",
                r.soil1(),
                r.soil2(),
                r.temperature(),
                r.humidity()
            )
            .as_bytes(),
        );
    }
    out
}

fn bench_features(c: &mut Criterion) {
    let readings = synth_readings(64, 0xC0FFEE);
    for cap in [10usize, 60] {
        let mut w = Window::new(cap);
        for r in readings.iter().cycle().take(cap) {
            w.append(*r);
        }
        let at_event = readings[0];
        c.bench_function(&format!("build_features_window_{cap}"), |b| {
            b.iter(|| {
                let fv: FeatureVector = w.build_features(black_box(&at_event)).unwrap();
                black_box(fv.len())
            })
        });
    }
}

fn bench_line_path(c: &mut Criterion) {
    let stream = telemetry_stream(&synth_readings(500, 7));
    let parser = TelemetryParser::new(TelemetryCfg::default());
    c.bench_function("frame_and_parse_500_lines_16b_chunks", |b| {
        b.iter_batched(
            || LineFramer::new(4096),
            |mut framer| {
                let mut n = 0usize;
                for chunk in stream.chunks(16) {
                    for line in framer.feed(chunk).flatten() {
                        n += usize::from(parser.parse(&line).is_some());
                    }
                }
                black_box(n)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_controller(c: &mut Criterion) {
    let stream = telemetry_stream(&synth_readings(500, 11));
    let text = String::from_utf8_lossy(&stream).into_owned();
    c.bench_function("controller_500_records", |b| {
        b.iter_batched(
            || {
                Controller::builder()
                    .thresholds(521.0, 480.0)
                    .estimator(FixedEstimator::new(FeatureVector::producible_names(), 12.0))
                    .try_build()
                    .unwrap()
            },
            |mut ctl| {
                let mut on = 0usize;
                for line in text.lines() {
                    if let Some(cycle) = ctl.process_line(line) {
                        on += usize::from(cycle.command.seconds() > 0);
                    }
                }
                black_box(on)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_features, bench_line_path, bench_controller);
criterion_main!(benches);
