//! A `nom` parser for the chemical formula grammar: atoms with optional
//! signed counts (`H-2`), fixed mass numbers (`C[13]`), parenthesised groups
//! with multipliers (`(H2O)2`), and the dissociated-proton symbol `H+`

use nom::{
    IResult,
    branch::alt,
    character::complete::{char, digit1, one_of, satisfy, u32 as nom_u32},
    combinator::{all_consuming, map_opt, opt, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, pair},
};

use crate::{Composition, Element, ElementSpec, GlycanError, Result};

pub(crate) fn parse(input: &str) -> Result<Composition> {
    match all_consuming(formula)(input) {
        Ok((_, composition)) => Ok(composition),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(GlycanError::formula(input, e.input.len()).into())
        }
        Err(nom::Err::Incomplete(_)) => Err(GlycanError::formula(input, 0).into()),
    }
}

fn formula(i: &str) -> IResult<&str, Composition> {
    let (i, parts) = many0(alt((group, atom)))(i)?;
    Ok((i, parts.into_iter().sum()))
}

/// A parenthesised sub-formula with an optional (signed) multiplier
fn group(i: &str) -> IResult<&str, Composition> {
    let (i, inner) = delimited(char('('), formula, char(')'))(i)?;
    let (i, multiplier) = opt(count)(i)?;
    Ok((i, inner * multiplier.unwrap_or(1)))
}

fn atom(i: &str) -> IResult<&str, Composition> {
    let start = i;
    let (i, element) = element(i)?;
    let (i, mass_number) = opt(delimited(char('['), nom_u32, char(']')))(i)?;
    let (i, count) = opt(count)(i)?;

    let spec = match mass_number {
        Some(n) => ElementSpec::with_isotope(element, n)
            .map_err(|_| nom::Err::Error(Error::new(start, ErrorKind::MapOpt)))?,
        None => ElementSpec::of(element),
    };
    let composition = [(spec, count.unwrap_or(1))].into_iter().collect();
    Ok((i, composition))
}

// An uppercase letter followed by lowercase letters or `+` — the latter only
// ever matches the proton symbol `H+`
fn element(i: &str) -> IResult<&str, Element> {
    map_opt(
        recognize(pair(
            satisfy(|c| c.is_ascii_uppercase()),
            many0(satisfy(|c: char| c.is_ascii_lowercase() || c == '+')),
        )),
        Element::from_symbol,
    )(i)
}

fn count(i: &str) -> IResult<&str, i32> {
    map_opt(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse().ok()
    })(i)
}
