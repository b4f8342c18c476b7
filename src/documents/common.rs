//! Common utilities for document generation.
//!
//! Brazilian Portuguese formatting for dates and money, plus filename
//! sanitising shared by the generators and the download route.

use chrono::{Datelike, Local, NaiveDate};

pub const MESES: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Date written out in Portuguese, e.g. "5 de março de 2025" or, with
/// `zero_pad`, "05 de março de 2025".
pub fn format_date_extenso(date: NaiveDate, zero_pad: bool) -> String {
    let month = MESES[(date.month0() as usize).min(MESES.len() - 1)];
    if zero_pad {
        format!("{:02} de {} de {}", date.day(), month, date.year())
    } else {
        format!("{} de {} de {}", date.day(), month, date.year())
    }
}

/// Brazilian number format with two decimals: `1234.5` → `"1.234,50"`.
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let integer = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{grouped},{fraction:02}")
}

/// `format_brl` with the currency symbol: `"R$ 1.234,50"`.
pub fn format_brl_prefixed(value: f64) -> String {
    format!("R$ {}", format_brl(value))
}

/// Whole-number percentage, e.g. `"50%"`.
pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", value)
}
