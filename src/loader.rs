/*!
  Reads program text into a memory image. The text is a list of signed decimal integers
  separated by commas. Whitespace, including line breaks, may surround any value.

  ```text
  1,9,10,3,
  2,3,11,0,
  99,30,40,50
  ```
*/

use std::fs::read_to_string;
use std::path::Path;

use nom::{
  character::complete::{
    char as one_char,
    digit1,
    multispace0
  },
  combinator::{all_consuming, map_res, opt, recognize},
  error::ErrorKind,
  multi::separated_nonempty_list,
  sequence::{delimited, pair, terminated},
  IResult
};
use thiserror::Error;

use crate::Value;

#[derive(Error, Debug)]
pub enum LoadError {
  #[error("malformed program text at offset {offset}")]
  Syntax {
    offset: usize
  },

  #[error("could not read program: {0}")]
  Io(#[from] std::io::Error),
}

fn value_p(input: &str) -> IResult<&str, Value, (&str, ErrorKind)> {
  delimited(
    multispace0,
    map_res(recognize(pair(opt(one_char('-')), digit1)), |text: &str| text.parse::<Value>()),
    multispace0
  )(input)
}

fn program_p(input: &str) -> IResult<&str, Vec<Value>, (&str, ErrorKind)> {
  all_consuming(
    terminated(
      separated_nonempty_list(one_char(','), value_p),
      // A trailing comma is tolerated.
      opt(pair(one_char(','), multispace0))
    )
  )(input)
}

/// Parses program text into the initial memory image.
pub fn parse_program(text: &str) -> Result<Vec<Value>, LoadError> {
  match program_p(text) {
    Ok((_rest, image)) => Ok(image),
    Err(nom::Err::Error((rest, _kind))) | Err(nom::Err::Failure((rest, _kind))) => {
      Err(LoadError::Syntax { offset: text.len() - rest.len() })
    }
    Err(nom::Err::Incomplete(_)) => Err(LoadError::Syntax { offset: text.len() })
  }
}

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Value>, LoadError> {
  let text = read_to_string(path)?;
  parse_program(&text)
}
