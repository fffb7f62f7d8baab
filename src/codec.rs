//! Plain-text weights format.
//!
//! ```text
//! <input> <hidden> <output>
//! <hidden rows of input + 1 tab separated values>
//! <output rows of hidden + 1 tab separated values>
//! ```
//!
//! Values are written with the shortest representation that parses back to the
//! same `f64`, so `deserialize(serialize(w)) == w` holds bit for bit.

use std::path::Path;

use crate::{Cluster, Error, Result, WeightSet};

pub fn serialize(weights: &WeightSet) -> String {
    let mut out = format!("{} {} {}\n", weights.input(), weights.hidden(), weights.output());
    write_cluster(&mut out, weights.initial_cluster());
    write_cluster(&mut out, weights.final_cluster());
    out
}

fn write_cluster(out: &mut String, cluster: &Cluster) {
    for row in cluster.iter_rows() {
        let values: Vec<String> = row.iter().map(f64::to_string).collect();
        out.push_str(&values.join("\t"));
        out.push('\n');
    }
}

/// Strict inverse of [`serialize`]. Nothing is returned unless every line
/// parsed.
pub fn deserialize(text: &str) -> Result<WeightSet> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

    let (line, header) = lines.next().ok_or_else(|| Error::format(1, "missing header line"))?;
    let dims = parse_header(line, header)?;
    let (input, hidden, output) = (dims[0], dims[1], dims[2]);

    let initial = read_cluster(&mut lines, hidden, input.saturating_add(1), line + 1, "initial")?;
    let last = read_cluster(&mut lines, output, hidden.saturating_add(1), (line + 1).saturating_add(hidden), "final")?;

    if let Some((line, _)) = lines.find(|(_, l)| !l.trim().is_empty()) {
        return Err(Error::format(line, "unexpected content after the final cluster"));
    }

    WeightSet::new(input, hidden, output, initial, last)
}

fn parse_header(line: usize, header: &str) -> Result<[usize; 3]> {
    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(Error::format(
            line,
            format!("expected header `<input> <hidden> <output>`, found {} values", tokens.len()),
        ));
    }
    let mut dims = [0usize; 3];
    for (dim, token) in dims.iter_mut().zip(tokens) {
        *dim = token
            .parse()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| Error::format(line, format!("`{}` is not a positive integer", token)))?;
    }
    Ok(dims)
}

fn read_cluster<'a, I>(lines: &mut I, rows: usize, cols: usize, first_line: usize, name: &str) -> Result<Cluster>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut data = Vec::new();
    for r in 0..rows {
        let (line, text) = lines.next().ok_or_else(|| {
            Error::format(
                first_line + r,
                format!("unexpected end of input: {} cluster has {} of {} rows", name, r, rows),
            )
        })?;
        data.push(parse_row(line, text, cols)?);
    }
    Cluster::from_rows(data, cols)
}

pub(crate) fn parse_row(line: usize, text: &str, cols: usize) -> Result<Vec<f64>> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != cols {
        return Err(Error::format(line, format!("expected {} values, got {}", cols, tokens.len())));
    }
    tokens
        .into_iter()
        .enumerate()
        .map(|(c, token)| {
            token
                .parse::<f64>()
                .map_err(|_| Error::format(line, format!("column {}: `{}` is not a number", c + 1, token)))
        })
        .collect()
}

pub fn load(path: &Path) -> Result<WeightSet> {
    deserialize(&std::fs::read_to_string(path)?)
}

pub fn save(path: &Path, weights: &WeightSet) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serialize(weights))?;
    Ok(())
}
