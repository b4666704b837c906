//! Times repeated distributed y = A x on a Matrix Market file.
//!
//! Without the `mpi` feature the ranks are threads of this process
//! (`--ranks`); with it, launch under `mpirun -n <ranks>`.

use anyhow::{Context, Result};
use clap::Parser;
use halo_spmv::parallel::or_abort;
use halo_spmv::{Comm, Executor, ExecutorOptions, inspect, io::read_distributed};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "spmv_bench", version, about = "Distributed SpMV benchmark")]
struct Cli {
    /// Matrix Market coordinate file
    matrix: PathBuf,

    /// Timed multiplications
    #[arg(short, long, default_value_t = 1000)]
    iterations: usize,

    /// Untimed multiplications before the timed loop
    #[arg(long, default_value_t = 1)]
    warmup: usize,

    /// Worker threads per rank (defaults to the number of CPUs)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Minimum rows per work item
    #[arg(long, default_value_t = 64)]
    row_chunk: usize,

    /// In-process ranks (ignored under MPI)
    #[arg(short, long, default_value_t = 1)]
    ranks: usize,

    /// Value every entry of x is set to
    #[arg(long, default_value_t = 1.0)]
    x_value: f64,
}

struct Report {
    ranks: usize,
    nnz: f64,
    inspect_secs: f64,
    total_secs: f64,
}

fn run<C: Comm>(comm: &C, cli: &Cli) -> Result<Option<Report>> {
    let mut mat = match read_distributed(&cli.matrix, comm) {
        Ok(m) => m,
        Err(e) if comm.rank() == 0 => {
            return Err(e).with_context(|| format!("loading {}", cli.matrix.display()));
        }
        // rank 0 reports the failure
        Err(_) => return Ok(None),
    };
    mat.log_summary(comm.rank());

    let mut opts = ExecutorOptions::default().with_row_chunk(cli.row_chunk);
    if let Some(t) = cli.threads {
        opts = opts.with_threads(t);
    }

    comm.barrier();
    let start = Instant::now();
    let setup = or_abort(comm, inspect(comm, &mut mat));
    comm.barrier();
    let inspect_secs = start.elapsed().as_secs_f64();

    let mut executor = or_abort(comm, Executor::new(&mat, &setup.plan, &opts));
    let x = vec![cli.x_value; mat.local_rows()];
    let mut y = vec![0.0; mat.local_rows()];

    for _ in 0..cli.warmup {
        or_abort(comm, executor.spmv(comm, &x, &mut y));
    }

    comm.barrier();
    let start = Instant::now();
    for _ in 0..cli.iterations {
        or_abort(comm, executor.spmv(comm, &x, &mut y));
    }
    comm.barrier();
    let total_secs = start.elapsed().as_secs_f64();

    let nnz = comm.all_reduce_sum(mat.nnz() as f64);
    if comm.rank() != 0 {
        return Ok(None);
    }
    Ok(Some(Report {
        ranks: comm.size(),
        nnz,
        inspect_secs,
        total_secs,
    }))
}

fn print_report(cli: &Cli, r: &Report) {
    let iters = cli.iterations.max(1) as f64;
    let gflops = if r.total_secs > 0.0 {
        2.0 * r.nnz * cli.iterations as f64 / r.total_secs / 1e9
    } else {
        0.0
    };
    println!("matrix:      {}", cli.matrix.display());
    println!("ranks:       {}", r.ranks);
    println!("nnz:         {}", r.nnz as u64);
    println!("inspect:     {:.3} ms", r.inspect_secs * 1e3);
    println!("iterations:  {}", cli.iterations);
    println!("total:       {:.3} s", r.total_secs);
    println!("per spmv:    {:.4} ms", r.total_secs * 1e3 / iters);
    println!("GFLOP/s:     {gflops:.3}");
}

#[cfg(feature = "mpi")]
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let comm = halo_spmv::parallel::MpiComm::new()?;
    if let Some(report) = run(&comm, &cli)? {
        print_report(&cli, &report);
    }
    Ok(())
}

#[cfg(not(feature = "mpi"))]
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    if cli.ranks == 0 {
        anyhow::bail!("--ranks must be at least 1");
    }
    let results = halo_spmv::LocalComm::run(cli.ranks, |comm| run(&comm, &cli));
    for result in results {
        if let Some(report) = result? {
            print_report(&cli, &report);
        }
    }
    Ok(())
}
