//! Plain terminal output routed through `tracing` under [`PRINT_TARGET`],
//! so the formatter prints it without a status symbol.

use std::fmt::Display;

use colored::*;
use tracing::info;

use crate::terminal::colors;

/// Width of headers, separators and centered lines.
pub const LINE_WIDTH: usize = 64;

/// Log target of plain terminal output.
pub const PRINT_TARGET: &str = "carto::print";

/// Key column of [`aligned_line`].
const KEY_WIDTH: usize = 12;

/// Values that keep their own style and fall back to a default color.
pub trait Styled {
    fn styled_or(self, fallback: Color) -> ColoredString;
}

impl Styled for &str {
    fn styled_or(self, fallback: Color) -> ColoredString {
        self.color(fallback)
    }
}

impl Styled for String {
    fn styled_or(self, fallback: Color) -> ColoredString {
        self.as_str().color(fallback)
    }
}

impl Styled for ColoredString {
    fn styled_or(self, _fallback: Color) -> ColoredString {
        self
    }
}

fn emit(line: impl Display) {
    info!(target: PRINT_TARGET, "{line}");
}

fn rule(fill: &str) -> ColoredString {
    fill.repeat(LINE_WIDTH).color(colors::SEPARATOR)
}

/// Dotted filler between a key and its colon.
fn leader(key: &str, width: usize) -> ColoredString {
    let dots = ".".repeat((width + 1).saturating_sub(key.chars().count()));
    format!("{dots}:").color(colors::SEPARATOR)
}

/// `──── ⟦ TITLE ⟧ ────` spanning [`LINE_WIDTH`].
pub fn header(title: &str) {
    let label = format!("⟦ {} ⟧", title.to_uppercase());
    let pad = LINE_WIDTH.saturating_sub(label.chars().count());
    let (left, right) = (pad / 2, pad - pad / 2);

    emit(format_args!(
        "{}{}{}",
        "─".repeat(left).color(colors::SEPARATOR),
        label.color(colors::ACCENT),
        "─".repeat(right).color(colors::SEPARATOR)
    ));
}

pub fn fat_separator() {
    emit(rule("═"));
}

pub fn end_of_program() {
    emit(rule("═"));
}

pub fn print_status(msg: impl AsRef<str>) {
    emit(format_args!(
        "{} {}",
        ">".color(colors::SEPARATOR),
        msg.as_ref().color(colors::TEXT_DEFAULT)
    ));
}

/// `> Key.......: value`
pub fn aligned_line<V>(key: &str, value: V)
where
    V: Display + Styled,
{
    print_status(format!(
        "{}{} {}",
        key.color(colors::PRIMARY),
        leader(key, KEY_WIDTH),
        value.styled_or(colors::TEXT_DEFAULT)
    ));
}

/// `[idx] name`, the root of a [`as_tree_one_level`] block.
pub fn tree_head(idx: usize, name: &str) {
    emit(format_args!(
        "{}{}{} {}",
        "[".color(colors::SEPARATOR),
        idx.to_string().color(colors::ACCENT),
        "]".color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    ));
}

/// Prints key/value pairs as branches, keys padded to the longest one.
pub fn as_tree_one_level(details: Vec<(String, ColoredString)>) {
    let width = details
        .iter()
        .map(|(key, _)| key.chars().count())
        .max()
        .unwrap_or(0);
    let last = details.len().saturating_sub(1);

    for (i, (key, value)) in details.into_iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        emit(format_args!(
            " {} {}{} {}",
            branch.color(colors::SEPARATOR),
            key.color(colors::TEXT_DEFAULT),
            leader(&key, width),
            value
        ));
    }
}

/// Centers `plain` rendered as `styled`. Width is measured on `plain`
/// because `styled` carries escape sequences.
pub fn centerln(plain: &str, styled: &str) {
    let indent = " ".repeat(LINE_WIDTH.saturating_sub(plain.chars().count()) / 2);
    emit(format_args!("{indent}{styled}"));
}
