#[cfg(feature = "profiling")]
use super::{
    data::profiling_data, CONFIGURATION_LABEL, EARLY_STOP_LABEL, NAMED_COUNTS_HEADERS,
    NAMED_SPANS_HEADERS,
};
#[cfg(feature = "profiling")]
use humantime::format_duration;

/// Prints the span table, the count table and the early stop summary.
#[cfg(feature = "profiling")]
pub fn print_profiling_data() {
    print_named_spans();
    print_named_counts();
    print_early_stop_summary();
}

#[cfg(not(feature = "profiling"))]
pub fn print_profiling_data() {}

#[cfg(feature = "profiling")]
fn print_named_counts() {
    let rows = profiling_data().get_named_counts_table();
    if rows.is_empty() {
        return;
    }
    let mut table = vec![header_row(NAMED_COUNTS_HEADERS)];
    table.extend(rows.into_iter().map(|(label, count, rate)| {
        vec![label, format_with_commas(count), format_with_commas_f64(rate)]
    }));
    println!();
    print_formatted_table(&table);
}

#[cfg(feature = "profiling")]
fn print_named_spans() {
    let rows = profiling_data().get_named_spans_table();
    if rows.is_empty() {
        return;
    }
    let mut table = vec![header_row(NAMED_SPANS_HEADERS)];
    table.extend(
        rows.into_iter()
            .map(|(label, count, duration, percent_runtime)| {
                vec![
                    label,
                    format_with_commas(count),
                    format_duration(duration).to_string(),
                    format!("{percent_runtime:.2}%"),
                ]
            }),
    );
    println!();
    print_formatted_table(&table);
}

#[cfg(feature = "profiling")]
fn print_early_stop_summary() {
    let (early_stops, configurations) = {
        let container = profiling_data();
        (
            container.get_named_count(EARLY_STOP_LABEL).unwrap_or(0),
            container.get_named_count(CONFIGURATION_LABEL),
        )
    };
    if let Some(configurations) = configurations {
        #[allow(clippy::cast_precision_loss)]
        let rate = early_stops as f64 / configurations as f64 * 100.0;
        println!();
        println!(
            "Early stops: {rate:.2}% ({} of {} configurations)\n",
            format_with_commas(early_stops),
            format_with_commas(configurations)
        );
    }
}

#[cfg(feature = "profiling")]
fn header_row(headers: &[&str]) -> Vec<String> {
    headers.iter().map(|header| (*header).to_string()).collect()
}

/// Prints a table whose first row is the header. The first column is left-aligned, the rest
/// right-aligned.
pub fn print_formatted_table(rows: &[Vec<String>]) {
    if rows.len() < 2 {
        return;
    }

    let num_cols = rows[0].len();
    let mut col_widths = vec![0; num_cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.len());
        }
    }

    let print_row = |row: &[String]| {
        for (i, cell) in row.iter().enumerate() {
            if i == 0 {
                print!("{:<width$} ", cell, width = col_widths[i] + 1);
            } else {
                print!("{:>width$} ", cell, width = col_widths[i] + 1);
            }
        }
        println!();
    };

    print_row(&rows[0]);
    let total_width: usize = col_widths.iter().map(|w| *w + 1).sum::<usize>() + 2;
    println!("{}", "-".repeat(total_width));
    for row in &rows[1..] {
        print_row(row);
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        result.push(c);
        let digits_left = len - i - 1;
        if digits_left > 0 && digits_left % 3 == 0 {
            result.push(',');
        }
    }
    result
}

#[must_use]
pub fn format_with_commas(value: usize) -> String {
    group_thousands(&value.to_string())
}

/// Formats with two decimal places and thousands separators.
#[must_use]
pub fn format_with_commas_f64(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));
    let mut result = group_thousands(int_part);
    if !frac_part.is_empty() {
        result.push('.');
        result.push_str(frac_part);
    }
    if value.is_sign_negative() && value != 0.0 {
        result.insert(0, '-');
    }
    result
}
