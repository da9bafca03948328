use std::fmt::Display;

use colored::*;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;
pub const PRINT_TARGET: &str = "netsweep::print";

/// Width of the dotted key column used by [`aligned_line`] and [`as_tree_one_level`].
const KEY_WIDTH: usize = 10;

#[macro_export]
macro_rules! nprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

pub trait WithDefaultColor {
    fn with_default(self, default_color: Color) -> ColoredString;
}

impl WithDefaultColor for &str {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for String {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for ColoredString {
    fn with_default(self, _default_color: Color) -> ColoredString {
        self
    }
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn header(msg: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }

    let formatted: String = format!("⟦ {} ⟧", msg.to_uppercase());
    let msg_len: usize = UnicodeWidthStr::width(formatted.as_str());

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line = format!(
        "{}{}{}",
        "─".repeat(left).color(colors::SEPARATOR),
        formatted.color(colors::PRIMARY),
        "─".repeat(right).color(colors::SEPARATOR)
    );
    print(&line);
}

pub fn fat_separator() {
    print(&"═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
}

fn dotted_key(key: &str, key_color: Color) -> String {
    let dots = ".".repeat(KEY_WIDTH.saturating_sub(UnicodeWidthStr::width(key)));
    format!(
        "{}{}{}",
        key.color(key_color),
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    )
}

pub fn aligned_line<V>(key: &str, value: V)
where
    V: Display + WithDefaultColor,
{
    let key = dotted_key(key, colors::PRIMARY);
    let value: ColoredString = value.with_default(colors::TEXT_DEFAULT);
    print_status(format!("{key} {value}"));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    print(&format!("{} {}", prefix, msg.as_ref()));
}

pub fn tree_head(idx: usize, name: &str) {
    let idx_str: String = format!("[{}]", idx.to_string().color(colors::ACCENT));
    let output: String = format!(
        "{} {}",
        idx_str.color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    );
    print(&output);
}

pub fn tree_lines(key_value_pair: &[(String, ColoredString)]) -> Vec<String> {
    key_value_pair
        .iter()
        .enumerate()
        .map(|(i, (key, value))| {
            let branch = if i + 1 == key_value_pair.len() { "└─" } else { "├─" };
            format!(
                " {} {} {}",
                branch.color(colors::SEPARATOR),
                dotted_key(key, colors::TEXT_DEFAULT),
                value
            )
        })
        .collect()
}

pub fn as_tree_one_level(key_value_pair: Vec<(String, ColoredString)>) {
    for line in tree_lines(&key_value_pair) {
        print(&line);
    }
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{}{}", space, msg));
}

pub fn no_results() {
    centerln(&"no live hosts found".red().bold().to_string());
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
