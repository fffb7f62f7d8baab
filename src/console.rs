use colored::Colorize;

pub fn info(message: &str) {
    println!("{}", message.cyan());
}

pub fn success(message: &str) {
    println!("{}", message.green());
}

pub fn warning(message: &str) {
    println!("{}", message.yellow());
}

/// Errors go to stderr, prefixed with `[ERROR] ` when `label` is set.
pub fn error(message: &str, label: bool) {
    let line = if label { format!("[ERROR] {}", message) } else { message.to_string() };
    eprintln!("{}", line.red());
}

fn format_row(values: &[f64]) -> Vec<String> {
    values.iter().map(|v| format!("{:.3}", v)).collect()
}

fn column_widths(rows: &[Vec<String>]) -> Vec<usize> {
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    (0..cols).map(|c| rows.iter().map(|r| r[c].len()).max().unwrap_or(0)).collect()
}

fn join_padded(row: &[String], widths: &[usize]) -> String {
    row.iter()
        .zip(widths)
        .map(|(v, w)| format!("{:>w$}", v, w = w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders the `# | Inputs | Raw Outputs [| Binarized Output]` table.
pub fn prediction_table(inputs: &[Vec<f64>], outputs: &[Vec<f64>], binarized: Option<&[Vec<f64>]>) -> String {
    let inputs: Vec<Vec<String>> = inputs.iter().map(|r| format_row(r)).collect();
    let outputs: Vec<Vec<String>> = outputs.iter().map(|r| format_row(r)).collect();
    let binarized: Option<Vec<String>> = binarized.map(|rows| {
        rows.iter()
            .map(|r| r.iter().map(|v| format!("{}", *v as u8)).collect::<Vec<_>>().join(" "))
            .collect()
    });

    let input_widths = column_widths(&inputs);
    let output_widths = column_widths(&outputs);
    let input_cells: Vec<String> = inputs.iter().map(|r| join_padded(r, &input_widths)).collect();
    let output_cells: Vec<String> = outputs.iter().map(|r| join_padded(r, &output_widths)).collect();

    let input_width = input_cells.iter().map(String::len).max().unwrap_or(0).max("Inputs".len());
    let output_width = output_cells.iter().map(String::len).max().unwrap_or(0).max("Raw Outputs".len());

    let mut header = format!("  #  | {:<iw$} | {:<ow$}", "Inputs", "Raw Outputs", iw = input_width, ow = output_width);
    let mut separator = format!("-----+{}+{}", "-".repeat(input_width + 2), "-".repeat(output_width + 2));
    if binarized.is_some() {
        header.push_str(" | Binarized Output");
        separator.push_str("+-----------------");
    }

    let mut table = format!("{}\n{}\n", header.trim_end(), separator);
    for (i, (input, output)) in input_cells.iter().zip(&output_cells).enumerate() {
        let mut line = format!("{:>4} | {:<iw$} | {:<ow$}", i + 1, input, output, iw = input_width, ow = output_width);
        if let Some(binarized) = &binarized {
            line.push_str(" | ");
            line.push_str(&binarized[i]);
        }
        table.push_str(line.trim_end());
        table.push('\n');
    }
    table
}
