use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use slr_core::parser::ParseStatus;
use slr_core::Parser;

const EXPRESSION_GRAMMAR: &str = "E T F
+ * ( ) i
E:E+T|T
T:T*F|F
F:(E)|i
E
";

fn parse_expression_of_varying_length(c: &mut Criterion) {
    let parser = EXPRESSION_GRAMMAR.parse::<Parser>().unwrap();
    let mut group = c.benchmark_group("expression parsing");

    for terms in [8, 64, 512] {
        let input = (0..terms)
            .map(|n| if n % 2 == 0 { "(i*i)" } else { "i" })
            .collect::<Vec<_>>()
            .join("+");

        group.bench_with_input(BenchmarkId::from_parameter(terms), &input, |b, input| {
            b.iter(|| assert_eq!(ParseStatus::Accepted, parser.parse(input.as_str())));
        });
    }

    group.finish();
}

criterion_group!(benches, parse_expression_of_varying_length);
criterion_main!(benches);
