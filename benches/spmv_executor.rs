use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use halo_spmv::{Comm, DistributedMatrix, Executor, ExecutorOptions, LocalComm, inspect};

fn tridiagonal(n: usize) -> Vec<(usize, usize, f64)> {
    let mut t = Vec::with_capacity(3 * n);
    for i in 0..n {
        if i > 0 {
            t.push((i, i - 1, -1.0));
        }
        t.push((i, i, 2.0));
        if i + 1 < n {
            t.push((i, i + 1, -1.0));
        }
    }
    t
}

fn bench_single_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("spmv single rank");
    for n in [10_000usize, 100_000] {
        let t = tridiagonal(n);
        let mut comms = LocalComm::universe(1);
        let comm = comms.remove(0);
        let mut a = DistributedMatrix::from_sorted_triplets(n, n, 0, 1, &t).unwrap();
        let setup = inspect(&comm, &mut a).unwrap();
        let opts = ExecutorOptions::default();
        let mut ex = Executor::new(&a, &setup.plan, &opts).unwrap();
        let x = vec![1.0; n];
        let mut y = vec![0.0; n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| ex.spmv(&comm, black_box(&x), black_box(&mut y)).unwrap())
        });
    }
    group.finish();
}

fn bench_halo_exchange(c: &mut Criterion) {
    let n = 100_000;
    let t = tridiagonal(n);
    c.bench_function("spmv 4 in-process ranks x100", |b| {
        b.iter(|| {
            LocalComm::run(4, |comm| {
                let mut a = DistributedMatrix::from_sorted_triplets(n, n, comm.rank(), 4, &t).unwrap();
                let setup = inspect(&comm, &mut a).unwrap();
                let opts = ExecutorOptions::default().with_threads(1);
                let mut ex = Executor::new(&a, &setup.plan, &opts).unwrap();
                let x = vec![1.0; a.local_rows()];
                let mut y = vec![0.0; a.local_rows()];
                for _ in 0..100 {
                    ex.spmv(&comm, &x, &mut y).unwrap();
                }
                black_box(y[0])
            })
        })
    });
}

criterion_group!(benches, bench_single_rank, bench_halo_exchange);
criterion_main!(benches);
