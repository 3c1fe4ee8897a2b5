#![no_main]
use libfuzzer_sys::{arbitrary, fuzz_target};

use irrigation_core::{Controller, LineFramer};

#[derive(Debug, arbitrary::Arbitrary)]
struct Input {
    max_line: u8,
    chunks: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let Ok(mut controller) = Controller::builder()
        .thresholds(521.0, 480.0)
        .window_capacity(4)
        .try_build()
    else {
        return;
    };
    let limit = usize::from(input.max_line).max(1);
    let mut framer = LineFramer::new(limit);
    for chunk in &input.chunks {
        for item in framer.feed(chunk) {
            match item {
                Ok(line) => {
                    if let Some(cycle) = controller.process_line(&line) {
                        let wire = cycle.command.to_line();
                        assert!(wire.starts_with("CMD:WATER_"));
                        assert!(wire.ends_with('\n'));
                    }
                }
                Err(_) => {}
            }
        }
        assert!(controller.window().len() <= 4);
        assert!(framer.pending_len() <= limit);
    }
});
