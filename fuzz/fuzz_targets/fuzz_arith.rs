#![no_main]

use arbitrary::Arbitrary;
use larray::{BinaryOp, Context, LargeArray, TypedArray, UnaryOp};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Add,
    Diff,
    Mult,
    Div,
    Pow,
    Sqrt,
    Log,
    Exp,
    Signum,
}

#[derive(Arbitrary, Debug)]
struct Input {
    op: Op,
    pairs: Vec<(i32, f64)>,
}

fn run(ctx: &Context, op: &Op, a: &LargeArray, b: &LargeArray) -> Option<Vec<u64>> {
    let out = match op {
        Op::Add => ctx.binary(BinaryOp::Add, a, b, None),
        Op::Diff => ctx.binary(BinaryOp::Diff, a, b, None),
        Op::Mult => ctx.binary(BinaryOp::Mult, a, b, None),
        Op::Div => ctx.binary(BinaryOp::Div, a, b, None),
        Op::Pow => ctx.binary(BinaryOp::Pow, a, b, None),
        Op::Sqrt => ctx.unary(UnaryOp::Sqrt, b, None),
        Op::Log => ctx.unary(UnaryOp::Log, b, None),
        Op::Exp => ctx.unary(UnaryOp::Exp, b, None),
        Op::Signum => ctx.unary(UnaryOp::Signum, a, None),
    }
    .ok()?;
    Some((0..out.len()).map(|i| out.get_f64(i).unwrap().to_bits()).collect())
}

fuzz_target!(|input: Input| {
    if input.pairs.is_empty() {
        return;
    }
    let ints: Vec<i32> = input.pairs.iter().map(|p| p.0).collect();
    let reals: Vec<f64> = input.pairs.iter().map(|p| p.1).collect();
    let a: LargeArray = TypedArray::from_vec(ints).unwrap().into();
    let b: LargeArray = TypedArray::from_vec(reals).unwrap().into();

    let single = Context::new().with_threads(1);
    let multi = Context::new().with_threads(3).with_concurrency_threshold(1);
    assert_eq!(run(&single, &input.op, &a, &b), run(&multi, &input.op, &a, &b));
});
