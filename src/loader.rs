use std::path::Path;

use crate::{codec::parse_row, Error, Result, TrainPair, TrainingData};

/// Parses the training set format:
///
/// ```text
/// <samples>
/// <inputs> <outputs>
/// <samples rows of inputs + outputs values>
/// ```
pub fn parse_train_data(text: &str) -> Result<TrainingData> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

    let samples = match lines.next() {
        Some((line, l)) => l
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| Error::format(line, format!("invalid sample count `{}`", l.trim())))?,
        None => return Err(Error::format(1, "missing sample count")),
    };

    let (inputs, outputs) = match lines.next() {
        Some((line, l)) => {
            let dims: Vec<usize> = l.split_whitespace().filter_map(|t| t.parse().ok()).collect();
            match (l.split_whitespace().count(), dims.as_slice()) {
                (2, &[i, o]) if i > 0 && o > 0 => (i, o),
                _ => return Err(Error::format(line, "expected `<inputs> <outputs>` with two positive integers")),
            }
        }
        None => return Err(Error::format(2, "missing `<inputs> <outputs>` line")),
    };

    let width = inputs + outputs;
    let mut pairs = Vec::new();
    for s in 0..samples {
        let (line, l) = lines
            .next()
            .ok_or_else(|| Error::format(3 + s, format!("expected {} samples, found only {}", samples, s)))?;
        let mut values = parse_row(line, l, width)?;
        let output = values.split_off(inputs);
        pairs.push(TrainPair::new(values, output));
    }

    TrainingData::new(inputs, outputs, pairs)
}

pub fn load_train_data(path: &Path) -> Result<TrainingData> {
    parse_train_data(&std::fs::read_to_string(path)?)
}

/// Parses prediction inputs: one sample per non-blank line, all of the same
/// width.
pub fn parse_input_rows(text: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (i, l) in text.lines().enumerate() {
        if l.trim().is_empty() {
            continue;
        }
        let width = rows.first().map(Vec::len).unwrap_or_else(|| l.split_whitespace().count());
        rows.push(parse_row(i + 1, l, width)?);
    }
    if rows.is_empty() {
        return Err(Error::format(1, "the data file contains no input rows"));
    }
    Ok(rows)
}

pub fn load_input_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    parse_input_rows(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XOR: &str = "4\n2 1\n0 0 0\n0 1 1\n1 0 1\n1 1 0\n";

    #[test]
    fn parses_training_set() {
        let data = parse_train_data(XOR).unwrap();
        assert_eq!((data.samples(), data.inputs(), data.outputs()), (4, 2, 1));
        assert_eq!(data.input(2), &[1., 0.]);
        assert_eq!(data.output(2), &[1.]);
    }

    #[test]
    fn reports_line_of_a_short_row() {
        let err = parse_train_data("2\n2 1\n0 0 0\n0 1\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 4, .. }));
    }

    #[test]
    fn reports_missing_samples() {
        let err = parse_train_data("3\n2 1\n0 0 0\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 4, .. }));
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(parse_train_data("zero\n2 1\n"), Err(Error::Format { line: 1, .. })));
        assert!(matches!(parse_train_data("0\n2 1\n"), Err(Error::Format { line: 1, .. })));
        assert!(matches!(parse_train_data("1\n2\n0 0 0\n"), Err(Error::Format { line: 2, .. })));
        assert!(matches!(parse_train_data("1\n2 1 3\n0 0 0\n"), Err(Error::Format { line: 2, .. })));
    }

    #[test]
    fn input_rows_skip_blank_lines_and_keep_width() {
        let rows = parse_input_rows("0 1\n\n1 1\n").unwrap();
        assert_eq!(rows, vec![vec![0., 1.], vec![1., 1.]]);
        assert!(matches!(parse_input_rows("0 1\n1\n"), Err(Error::Format { line: 2, .. })));
        assert!(parse_input_rows("\n \n").is_err());
    }
}
