mod common;

use std::io;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use minipy::interpreter::Interpreter;

fn bench_interpreter(c: &mut Criterion) {
    for (label, source) in common::workloads() {
        let program = common::load_program(&label, &source);

        c.bench_function(&format!("interpreter_run_{label}"), |b| {
            b.iter(|| {
                let mut interpreter = Interpreter::new(io::sink());
                interpreter.interpret(black_box(&program)).expect("run");
                black_box(interpreter.scopes().depth());
            })
        });

        c.bench_function(&format!("interpreter_run_buffered_{label}"), |b| {
            b.iter(|| {
                let mut interpreter = Interpreter::new(Vec::with_capacity(64));
                interpreter.interpret(black_box(&program)).expect("run");
                black_box(interpreter.into_output());
            })
        });

        c.bench_function(&format!("interpreter_end_to_end_{label}"), |b| {
            b.iter(|| {
                let out = minipy::run_to_string(black_box(&source)).expect("run");
                black_box(out);
            })
        });
    }
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
