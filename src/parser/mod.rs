// A1-notation parsers used by the CLI and the layout projection

pub mod cell_ref;
pub mod edit;
pub mod lexer;

// Public API re-exports
pub use cell_ref::{encode_cell, encode_range, parse_cell_ref, parse_merge_range, MAX_COLUMN, MAX_ROW};
pub use edit::{parse_edit_command, EditCommand};
