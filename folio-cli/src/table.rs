//! Table rendering for the `table` output format.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

/// Width used when stdout is not a terminal.
const PIPED_WIDTH: u16 = 120;

/// An empty table for command listings.
///
/// Wide schema listings wrap cells rather than lines: the table is fitted to
/// the terminal, or to [`PIPED_WIDTH`] columns when output is piped.
pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(terminal_width());
    table
}

fn terminal_width() -> u16 {
    crossterm::terminal::size().map_or(PIPED_WIDTH, |(columns, _)| columns)
}

/// Clip free-form text such as region titles and type descriptions to `max`
/// characters so one long description cannot widen a whole column.
pub fn truncate_str(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some(_) => {
            let keep: String = s.chars().take(max.saturating_sub(3)).collect();
            format!("{keep}...")
        }
    }
}
