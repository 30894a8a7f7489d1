use criterion::{criterion_group, criterion_main, Criterion};
use tabstat::{AnalysisOptions, Column, RegressionOptions, SplitOptions, Table};

fn table(rows: usize, features: usize) -> Table {
    let mut columns = (0..features)
        .map(|j| {
            let values = (0..rows).map(|_| Some(rand::random::<f64>())).collect();
            Column::numeric(format!("x{}", j), values)
        })
        .collect::<Vec<_>>();
    let target = (0..rows)
        .map(|i| {
            let t = columns
                .iter()
                .enumerate()
                .map(|(j, c)| c.as_numeric().unwrap()[i].unwrap() * (j + 1) as f64)
                .sum::<f64>();
            Some(t + rand::random::<f64>() / 10.0)
        })
        .collect();
    columns.push(Column::numeric("y", target));
    Table::new(columns).unwrap()
}

fn fit(c: &mut Criterion) {
    let table = table(10_000, 8);
    let split = SplitOptions::default().split(&table, "y").unwrap();

    c.bench_function("fit, features=8, n=10000", |b| {
        b.iter(|| RegressionOptions::default().fit(&split).unwrap())
    });
}

fn analyze(c: &mut Criterion) {
    let table = table(10_000, 8);

    c.bench_function("analyze, features=8, n=10000", |b| {
        b.iter(|| AnalysisOptions::new().run(&table, "y").unwrap())
    });
    c.bench_function("analyze parallel, features=8, n=10000", |b| {
        b.iter(|| AnalysisOptions::new().parallel(true).run(&table, "y").unwrap())
    });
}

criterion_group!(benches, fit, analyze);
criterion_main!(benches);
