//! Loading a Matrix Market file collectively and multiplying with it.

use halo_spmv::io::read_distributed;
use halo_spmv::{Comm, Executor, ExecutorOptions, LocalComm, SpmvError, inspect};
use std::path::PathBuf;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("halo_spmv_{}_{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

// 5x5 symmetric tridiagonal, lower triangle only
const LAPLACE_5: &str = "%%MatrixMarket matrix coordinate real symmetric
% 1-D Laplacian
5 5 9
1 1 2.0
2 1 -1.0
2 2 2.0
3 2 -1.0
3 3 2.0
4 3 -1.0
4 4 2.0
5 4 -1.0
5 5 2.0
";

#[test]
fn every_rank_gets_its_row_block() {
    let path = write_temp("blocks.mtx", LAPLACE_5);
    let out = LocalComm::run(2, |comm| {
        let a = read_distributed(&path, &comm).unwrap();
        (a.global_rows(), a.rows_offset(), a.local_rows(), a.nnz())
    });
    std::fs::remove_file(&path).unwrap();
    assert_eq!(out[0], (5, 0, 3, 8));
    assert_eq!(out[1], (5, 3, 2, 5));
}

#[test]
fn loaded_matrix_multiplies_correctly() {
    let path = write_temp("spmv.mtx", LAPLACE_5);
    let out = LocalComm::run(3, |comm| {
        let mut a = read_distributed(&path, &comm).unwrap();
        let setup = inspect(&comm, &mut a).unwrap();
        let opts = ExecutorOptions::default().with_threads(1);
        let mut ex = Executor::new(&a, &setup.plan, &opts).unwrap();
        let x: Vec<f64> = a.owned_rows().map(|g| (g + 1) as f64).collect();
        let mut y = vec![0.0; a.local_rows()];
        ex.spmv(&comm, &x, &mut y).unwrap();
        y
    });
    std::fs::remove_file(&path).unwrap();
    // x = [1..5]: every row cancels except the last, which has no right neighbour
    assert_eq!(out.concat(), vec![0.0, 0.0, 0.0, 0.0, 6.0]);
}

#[test]
fn missing_file_fails_on_every_rank() {
    let path = std::env::temp_dir().join("halo_spmv_does_not_exist.mtx");
    let out = LocalComm::run(3, |comm| read_distributed(&path, &comm).map(|_| comm.rank()));
    assert!(matches!(out[0], Err(SpmvError::Io(_))));
    for r in &out[1..] {
        assert!(matches!(r, Err(SpmvError::RootReadFailed)));
    }
}
