use std::{fmt::Write, panic};

use wasm_bindgen::prelude::wasm_bindgen;

#[wasm_bindgen]
extern "C" {
    type Error;

    #[wasm_bindgen(constructor)]
    fn new() -> Error;

    #[wasm_bindgen(structural, method, getter)]
    fn stack(error: &Error) -> String;

    #[wasm_bindgen(static_method_of = Error, setter, js_name = stackTraceLimit)]
    fn stack_trace_limit(size: f32);
}

pub fn setup_panic_hook() {
    panic::set_hook(Box::new(panic_hook));
}

/// Wasm has no native backtraces, so the JS `Error` stack is logged instead.
fn panic_hook(info: &panic::PanicHookInfo) {
    let mut report = String::new();
    let _ = writeln!(report, "{}", info);

    Error::stack_trace_limit(1000_f32);

    let stack = Error::new().stack();

    let frames: Vec<&str> = if stack.contains("__rust_end_short_backtrace") {
        stack
            .lines()
            .skip_while(|line| !line.contains("__rust_end_short_backtrace"))
            .skip(1)
            .collect()
    } else {
        // First line is just "Error".
        stack.lines().skip(1).collect()
    };

    for frame in frames {
        let _ = writeln!(report, "{}", frame);
    }

    log::error!("{}", report);
}
