//! Matrix Market coordinate files.
//!
//! Supports `real`, `integer` and `pattern` fields with `general` or
//! `symmetric` symmetry. Indices in the file are 1-based; everything returned
//! here is 0-based and sorted by `(row, col)`.
//!
//! [`read_distributed`] is the loader used by the benchmark: rank 0 parses the
//! file and broadcasts the triplets, every rank keeps its own row block.

use crate::error::SpmvError;
use crate::matrix::DistributedMatrix;
use crate::parallel::Comm;
use std::io::BufRead;
use std::path::Path;

/// A whole matrix as sorted coordinate triplets.
#[derive(Clone, Debug, PartialEq)]
pub struct TripletMatrix {
    pub rows: usize,
    pub cols: usize,
    /// `(row, col, value)`, sorted by row then column.
    pub entries: Vec<(usize, usize, f64)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Real,
    Pattern,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
}

fn parse_err(line: usize, msg: impl Into<String>) -> SpmvError {
    SpmvError::Parse {
        line,
        msg: msg.into(),
    }
}

fn parse_banner(line_no: usize, line: &str) -> Result<(Field, Symmetry), SpmvError> {
    let words: Vec<String> = line.split_whitespace().map(str::to_ascii_lowercase).collect();
    if words.len() < 5 || words[1] != "matrix" || words[2] != "coordinate" {
        return Err(parse_err(line_no, "only `matrix coordinate` files are supported"));
    }
    let field = match words[3].as_str() {
        "real" | "double" | "integer" => Field::Real,
        "pattern" => Field::Pattern,
        other => return Err(parse_err(line_no, format!("unsupported field `{other}`"))),
    };
    let symmetry = match words[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        other => return Err(parse_err(line_no, format!("unsupported symmetry `{other}`"))),
    };
    Ok((field, symmetry))
}

fn parse_usize(line: usize, tok: Option<&str>, what: &str) -> Result<usize, SpmvError> {
    let tok = tok.ok_or_else(|| parse_err(line, format!("missing {what}")))?;
    tok.parse()
        .map_err(|_| parse_err(line, format!("bad {what} `{tok}`")))
}

/// Parses a Matrix Market coordinate stream.
pub fn parse<R: BufRead>(reader: R) -> Result<TripletMatrix, SpmvError> {
    let mut field = Field::Real;
    let mut symmetry = Symmetry::General;
    let mut header: Option<(usize, usize, usize)> = None;
    let mut entries = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.starts_with("%%MatrixMarket") {
            if i == 0 {
                (field, symmetry) = parse_banner(line_no, trimmed)?;
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let mut toks = trimmed.split_whitespace();
        let Some((rows, cols, _)) = header else {
            let r = parse_usize(line_no, toks.next(), "row count")?;
            let c = parse_usize(line_no, toks.next(), "column count")?;
            let nnz = parse_usize(line_no, toks.next(), "entry count")?;
            header = Some((r, c, nnz));
            entries.reserve(nnz);
            continue;
        };
        let r = parse_usize(line_no, toks.next(), "row index")?;
        let c = parse_usize(line_no, toks.next(), "column index")?;
        if r == 0 || c == 0 || r > rows || c > cols {
            return Err(parse_err(
                line_no,
                format!("entry ({r}, {c}) outside a {rows}x{cols} matrix"),
            ));
        }
        let v = match field {
            Field::Pattern => 1.0,
            Field::Real => {
                let tok = toks
                    .next()
                    .ok_or_else(|| parse_err(line_no, "missing value"))?;
                tok.parse::<f64>()
                    .map_err(|_| parse_err(line_no, format!("bad value `{tok}`")))?
            }
        };
        let (r, c) = (r - 1, c - 1);
        entries.push((r, c, v));
        if symmetry == Symmetry::Symmetric && r != c {
            entries.push((c, r, v));
        }
    }

    let Some((rows, cols, nnz)) = header else {
        return Err(parse_err(0, "missing size line"));
    };
    let stored = match symmetry {
        Symmetry::General => entries.len(),
        Symmetry::Symmetric => entries.iter().filter(|e| e.0 >= e.1).count(),
    };
    if stored != nnz {
        return Err(parse_err(
            0,
            format!("size line declares {nnz} entries, found {stored}"),
        ));
    }
    entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    Ok(TripletMatrix {
        rows,
        cols,
        entries,
    })
}

/// Reads a Matrix Market file from disk.
pub fn read_file(path: impl AsRef<Path>) -> Result<TripletMatrix, SpmvError> {
    let file = std::fs::File::open(path.as_ref())?;
    parse(std::io::BufReader::new(file))
}

/// Loads `path` on rank 0 and hands every rank its row block.
///
/// Collective over `comm`. If rank 0 cannot read the file it returns the
/// underlying error and every other rank returns [`SpmvError::RootReadFailed`];
/// no rank is left waiting.
pub fn read_distributed<C: Comm>(
    path: impl AsRef<Path>,
    comm: &C,
) -> Result<DistributedMatrix<f64>, SpmvError> {
    let root = 0;
    let mut loaded = None;
    // [ok, rows, cols, nnz]
    let mut header = vec![0u64; 4];
    if comm.rank() == root {
        log::info!("[io] reading {}", path.as_ref().display());
        match read_file(path.as_ref()) {
            Ok(m) => {
                header = vec![1, m.rows as u64, m.cols as u64, m.entries.len() as u64];
                log::info!("[io] broadcasting {} entries", m.entries.len());
                loaded = Some(m);
            }
            Err(e) => {
                log::error!("could not load {}: {e}", path.as_ref().display());
                comm.broadcast(&mut header, root);
                return Err(e);
            }
        }
    }
    comm.broadcast(&mut header, root);
    if header[0] == 0 {
        return Err(SpmvError::RootReadFailed);
    }
    let (rows, cols) = (header[1] as usize, header[2] as usize);

    let (mut row_idx, mut col_idx, mut vals) = match &loaded {
        Some(m) => (
            m.entries.iter().map(|e| e.0 as u64).collect::<Vec<_>>(),
            m.entries.iter().map(|e| e.1 as u64).collect::<Vec<_>>(),
            m.entries.iter().map(|e| e.2).collect::<Vec<_>>(),
        ),
        None => (Vec::new(), Vec::new(), Vec::new()),
    };
    comm.broadcast(&mut row_idx, root);
    comm.broadcast(&mut col_idx, root);
    comm.broadcast(&mut vals, root);

    let triplets: Vec<(usize, usize, f64)> = row_idx
        .iter()
        .zip(&col_idx)
        .zip(&vals)
        .map(|((&r, &c), &v)| (r as usize, c as usize, v))
        .collect();
    DistributedMatrix::from_sorted_triplets(rows, cols, comm.rank(), comm.size(), &triplets)
}
