//! core-expression: the `name(arg, …)` call grammar used by configuration
//! strings (trigger events and outcomes).
//!
//! ```text
//! expr       := identifier '(' [arg (',' arg)*] ')'
//! arg        := duration | integer | identifier
//! duration   := integer suffix         ; suffix ∈ {h, min, s, ms, us, ns}
//! identifier := [A-Za-z_] [A-Za-z0-9_]*
//! integer    := [-]? digit+
//! ```
//!
//! Parsed arguments collapse into a two-variant union of string and signed
//! integer; a duration literal becomes its nanosecond count. Dispatch sites
//! convert each argument to the declared parameter type through
//! [`FromArgument`], whose errors name the function and the 1-based
//! argument position.

use std::time::Duration;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, terminated},
    IResult,
};
use thiserror::Error;

use core_types::parse_duration;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("unable to parse function expression \"{text}\"")]
    Parse { text: String },
    #[error("unknown function {function} in expression")]
    UnknownFunction { function: String },
    #[error("invalid number of arguments to function {function} (expected {expected} but was {actual})")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid argument {index} in call to {function}: {message}")]
    Argument {
        function: String,
        /// 1-based position.
        index: usize,
        message: String,
    },
}

/// One parsed argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    String(String),
    /// Plain integers, and durations as their nanosecond count.
    Number(i64),
}

/// A parsed call expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub function: String,
    pub arguments: Vec<Argument>,
}

impl Call {
    pub fn expect_arity(&self, expected: usize) -> Result<(), ExpressionError> {
        if self.arguments.len() != expected {
            return Err(ExpressionError::Arity {
                function: self.function.clone(),
                expected,
                actual: self.arguments.len(),
            });
        }
        Ok(())
    }

    /// Converts the argument at `index` (0-based) to the declared type.
    pub fn argument<T: FromArgument>(&self, index: usize) -> Result<T, ExpressionError> {
        T::from_argument(&self.function, index, &self.arguments[index])
    }

    pub fn argument_error(&self, index: usize, message: impl Into<String>) -> ExpressionError {
        argument_error(&self.function, index, message)
    }
}

fn argument_error(function: &str, index: usize, message: impl Into<String>) -> ExpressionError {
    ExpressionError::Argument {
        function: function.into(),
        index: index + 1,
        message: message.into(),
    }
}

/// Conversion of a single parsed argument to a typed parameter.
pub trait FromArgument: Sized {
    fn from_argument(
        function: &str,
        index: usize,
        argument: &Argument,
    ) -> Result<Self, ExpressionError>;
}

impl FromArgument for String {
    fn from_argument(
        function: &str,
        index: usize,
        argument: &Argument,
    ) -> Result<Self, ExpressionError> {
        match argument {
            Argument::String(value) => Ok(value.clone()),
            Argument::Number(_) => Err(argument_error(function, index, "expected string, got number")),
        }
    }
}

macro_rules! integer_from_argument {
    ($($ty:ty),*) => {
        $(impl FromArgument for $ty {
            fn from_argument(
                function: &str,
                index: usize,
                argument: &Argument,
            ) -> Result<Self, ExpressionError> {
                match argument {
                    Argument::Number(value) => (*value).try_into().map_err(|_| {
                        argument_error(function, index, "number out of range")
                    }),
                    Argument::String(_) => {
                        Err(argument_error(function, index, "expected number, got string"))
                    }
                }
            }
        })*
    };
}

integer_from_argument!(i64, i32, u32, u64, usize);

impl FromArgument for Duration {
    fn from_argument(
        function: &str,
        index: usize,
        argument: &Argument,
    ) -> Result<Self, ExpressionError> {
        match argument {
            Argument::Number(nanos) => u64::try_from(*nanos)
                .map(Duration::from_nanos)
                .map_err(|_| argument_error(function, index, "negative duration")),
            Argument::String(text) => parse_duration(text)
                .map_err(|error| argument_error(function, index, error.to_string())),
        }
    }
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse)(input)
}

fn duration_literal(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(pair(
            digit1,
            alt((tag("min"), tag("ms"), tag("us"), tag("ns"), tag("h"), tag("s"))),
        )),
        |text: &str| {
            parse_duration(text)
                .map_err(|_| ())
                .and_then(|duration| i64::try_from(duration.as_nanos()).map_err(|_| ()))
        },
    )(input)
}

fn argument(input: &str) -> IResult<&str, Argument> {
    alt((
        map(duration_literal, Argument::Number),
        map(integer, Argument::Number),
        map(identifier, |name| Argument::String(name.to_owned())),
    ))(input)
}

fn call(input: &str) -> IResult<&str, Call> {
    let (input, function) = ws(identifier)(input)?;
    let (input, arguments) = delimited(
        char('('),
        separated_list0(char(','), ws(argument)),
        char(')'),
    )(input)?;
    Ok((
        input,
        Call {
            function: function.to_owned(),
            arguments,
        },
    ))
}

/// Parses a full call expression; trailing input is an error.
pub fn parse_call(text: &str) -> Result<Call, ExpressionError> {
    all_consuming(terminated(call, multispace0))(text)
        .map(|(_, call)| call)
        .map_err(|_| ExpressionError::Parse { text: text.into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_call_without_arguments() {
        let call = parse_call("refresh()").unwrap();
        assert_eq!(call.function, "refresh");
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn parses_identifier_arguments() {
        let call = parse_call("change(on)").unwrap();
        assert_eq!(call.function, "change");
        assert_eq!(call.arguments, vec![Argument::String("on".into())]);
    }

    #[test]
    fn parses_integer_arguments_including_negative() {
        let call = parse_call("set(-5)").unwrap();
        assert_eq!(call.arguments, vec![Argument::Number(-5)]);
    }

    #[test]
    fn parses_duration_arguments_to_nanosecond_counts() {
        let call = parse_call("startTimer(1, 500ms)").unwrap();
        assert_eq!(
            call.arguments,
            vec![Argument::Number(1), Argument::Number(500_000_000)]
        );
    }

    #[test]
    fn tolerates_whitespace_between_tokens() {
        let call = parse_call("  startTimer ( 1 , 500ms )  ").unwrap();
        assert_eq!(call.function, "startTimer");
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn rejects_malformed_expressions() {
        for text in ["", "change", "change(", "change)", "change(on", "1change()", "change(on) x"] {
            assert!(matches!(
                parse_call(text),
                Err(ExpressionError::Parse { .. })
            ), "{text:?} should not parse");
        }
    }

    #[test]
    fn arity_mismatch_names_function_and_counts() {
        let call = parse_call("timeout(1, 2)").unwrap();
        let error = call.expect_arity(1).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid number of arguments to function timeout (expected 1 but was 2)"
        );
    }

    #[test]
    fn conversions_dispatch_on_the_parsed_variant() {
        let call = parse_call("startTimer(3, 250ms)").unwrap();
        let timer: u32 = call.argument(0).unwrap();
        let timeout: Duration = call.argument(1).unwrap();
        assert_eq!(timer, 3);
        assert_eq!(timeout, Duration::from_millis(250));
    }

    #[test]
    fn conversion_errors_are_one_based() {
        let call = parse_call("startTimer(first, 250ms)").unwrap();
        let error = call.argument::<u32>(0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid argument 1 in call to startTimer: expected number, got string"
        );
    }

    #[test]
    fn string_conversion_rejects_numbers() {
        let call = parse_call("change(50)").unwrap();
        assert!(call.argument::<String>(0).is_err());
        assert_eq!(call.argument::<i64>(0).unwrap(), 50);
    }
}
