// Edit command parser: "B4=42", "A1=Robot-X"

use super::cell_ref::cell_ref;
use crate::data::CellRef;
use anyhow::{anyhow, Result};
use nom::{
    character::complete::{char, multispace0},
    combinator::rest,
    sequence::{delimited, preceded},
    IResult,
};

/// A single cell commit requested on the command line
#[derive(Debug, Clone, PartialEq)]
pub struct EditCommand {
    pub cell: CellRef,
    pub value: String,
}

fn edit_command(input: &str) -> IResult<&str, EditCommand> {
    let (input, cell) = delimited(multispace0, cell_ref, multispace0)(input)?;
    // Everything after '=' is the new cell text, kept verbatim
    let (input, value) = preceded(char('='), rest)(input)?;
    Ok((
        input,
        EditCommand {
            cell,
            value: value.to_string(),
        },
    ))
}

pub fn parse_edit_command(input: &str) -> Result<EditCommand> {
    let (_, command) = edit_command(input)
        .map_err(|e| anyhow!("Invalid edit '{}' (expected CELL=VALUE): {:?}", input, e))?;
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_edit() {
        let cmd = parse_edit_command("B4=42").unwrap();
        assert_eq!(cmd.cell, CellRef::new(3, 1));
        assert_eq!(cmd.value, "42");
    }

    #[test]
    fn test_value_kept_verbatim() {
        let cmd = parse_edit_command("A1 = Robot-X ").unwrap();
        assert_eq!(cmd.cell, CellRef::new(0, 0));
        assert_eq!(cmd.value, " Robot-X ");
    }

    #[test]
    fn test_empty_value_allowed() {
        let cmd = parse_edit_command("C2=").unwrap();
        assert_eq!(cmd.value, "");
    }

    #[test]
    fn test_missing_equals() {
        assert!(parse_edit_command("C2").is_err());
        assert!(parse_edit_command("=5").is_err());
    }

    #[test]
    fn test_row_past_sheet_limit() {
        assert!(parse_edit_command("A1048576=1").is_ok());
        assert!(parse_edit_command("A99999999999=1").is_err());
    }
}
