use crate::error::SourceError;
use serde::{Deserialize, Serialize};

/// A `#pragma parameter` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderParameter {
    pub name: String,
    pub description: String,
    pub initial: f32,
    pub minimum: f32,
    pub maximum: f32,
    pub step: f32,
}

/// Returns what follows `directive` when the line starts with it as a whole word.
pub(crate) fn directive<'a>(line: &'a str, directive: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(directive)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        _ => None,
    }
}

/// Extracts the path from `"path"` after an `#include`.
pub(crate) fn quoted(rest: &str) -> Option<&str> {
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    let path = &rest[..end];
    (!path.is_empty()).then_some(path)
}

/// Parses the arguments of `#pragma parameter NAME "DESC" INITIAL MIN MAX [STEP]`.
pub(crate) fn parse_parameter(line: &str, args: &str) -> Result<ShaderParameter, SourceError> {
    let invalid = || SourceError::InvalidParameterPragma(line.trim().to_owned());

    let args = args.trim_start();
    let name_end = args.find(char::is_whitespace).ok_or_else(invalid)?;
    let name = &args[..name_end];

    let rest = args[name_end..].trim_start();
    let rest = rest.strip_prefix('"').ok_or_else(invalid)?;
    let description_end = rest.find('"').ok_or_else(invalid)?;
    let description = &rest[..description_end];

    let numbers = rest[description_end + 1..]
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    let (initial, minimum, maximum, step) = match numbers.as_slice() {
        [initial, minimum, maximum] => {
            (*initial, *minimum, *maximum, 0.1 * (*maximum - *minimum))
        }
        [initial, minimum, maximum, step] => (*initial, *minimum, *maximum, *step),
        _ => return Err(invalid()),
    };

    Ok(ShaderParameter {
        name: name.to_owned(),
        description: description.to_owned(),
        initial,
        minimum,
        maximum,
        step,
    })
}
