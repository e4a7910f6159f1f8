// Cell reference parser: "B3", "AA10", "A1:C2"

use super::lexer::ws;
use crate::data::{CellRef, MergeRange};
use anyhow::{anyhow, Result};
use nom::{
    character::complete::{alpha1, char, digit1},
    combinator::{eof, map_res},
    sequence::{pair, separated_pair},
    IResult,
};

/// Largest column index a worksheet can address (XFD)
pub const MAX_COLUMN: usize = 16_383;

/// Largest 1-based row number a worksheet can address
pub const MAX_ROW: usize = 1_048_576;

fn letters_to_index(letters: &str) -> Result<usize> {
    let mut index: usize = 0;
    for c in letters.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| anyhow!("Column '{}' out of range", letters))?;
    }
    let index = index - 1;
    if index > MAX_COLUMN {
        return Err(anyhow!("Column '{}' out of range", letters));
    }
    Ok(index)
}

fn row_to_index(digits: &str) -> Result<usize> {
    let row: usize = digits
        .parse()
        .map_err(|_| anyhow!("Row '{}' out of range", digits))?;
    if row == 0 {
        return Err(anyhow!("Row numbers start at 1"));
    }
    if row > MAX_ROW {
        return Err(anyhow!("Row '{}' out of range", digits));
    }
    Ok(row - 1)
}

/// Parse a column in letter form (case-insensitive)
fn column_letters(input: &str) -> IResult<&str, usize> {
    map_res(alpha1, letters_to_index)(input)
}

/// Parse a 1-based row number into a 0-based index
fn row_number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, row_to_index)(input)
}

/// Parse an A1-style cell reference
pub fn cell_ref(input: &str) -> IResult<&str, CellRef> {
    let (input, (col, row)) = pair(column_letters, row_number)(input)?;
    Ok((input, CellRef::new(row, col)))
}

/// Parse a merge range: A1:C2
pub fn merge_range(input: &str) -> IResult<&str, MergeRange> {
    let (input, (start, end)) = separated_pair(cell_ref, ws(char(':')), cell_ref)(input)?;
    Ok((input, MergeRange::new(start, end)))
}

/// Parse a complete cell reference string
pub fn parse_cell_ref(input: &str) -> Result<CellRef> {
    let (_, (cell, _)) = pair(ws(cell_ref), eof)(input)
        .map_err(|e| anyhow!("Invalid cell reference '{}': {:?}", input, e))?;
    Ok(cell)
}

/// Parse a complete merge range string
pub fn parse_merge_range(input: &str) -> Result<MergeRange> {
    let (_, (range, _)) = pair(ws(merge_range), eof)(input)
        .map_err(|e| anyhow!("Invalid merge range '{}': {:?}", input, e))?;
    Ok(range)
}

/// Encode a column index as letters: 0 -> A, 26 -> AA
pub fn encode_column(col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub fn encode_cell(cell: CellRef) -> String {
    format!("{}{}", encode_column(cell.col), cell.row + 1)
}

pub fn encode_range(range: &MergeRange) -> String {
    format!("{}:{}", encode_cell(range.start), encode_cell(range.end))
}
