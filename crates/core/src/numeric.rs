//! Numeric literal arithmetic.
//!
//! The aggregates accumulate through these functions. Operands are promoted
//! along integer → decimal → float → double as in XPath numeric promotion.

use crate::error::{Error, Result};
use crate::term::{vocab, Literal, Term};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use core::cmp::Ordering;

/// A numeric value parsed from an RDF literal.
///
/// Integers and decimals are exact; floats and doubles are IEEE 754.
#[derive(Clone, Debug, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Decimal(BigDecimal),
    Float(f64),
    Double(f64),
}

impl Numeric {
    /// Parses a numeric literal. Non-numeric datatypes are evaluation errors.
    pub fn from_literal(lit: &Literal) -> Result<Self> {
        let lexical = lit.value().trim();
        let datatype = lit.datatype();
        let invalid = || Error::evaluation(format!("invalid lexical form {:?} for {}", lexical, datatype));
        if datatype == vocab::XSD_INTEGER || vocab::XSD_INTEGER_DERIVED.contains(&datatype) {
            lexical.parse::<i64>().map(Numeric::Integer).map_err(|_| invalid())
        } else if datatype == vocab::XSD_DECIMAL {
            lexical.parse::<BigDecimal>().map(Numeric::Decimal).map_err(|_| invalid())
        } else if datatype == vocab::XSD_FLOAT {
            parse_floating(lexical).map(Numeric::Float).ok_or_else(invalid)
        } else if datatype == vocab::XSD_DOUBLE {
            parse_floating(lexical).map(Numeric::Double).ok_or_else(invalid)
        } else {
            Err(Error::evaluation(format!("{} is not a numeric datatype", datatype)))
        }
    }

    /// Parses a numeric term.
    pub fn from_term(term: &Term) -> Result<Self> {
        match term {
            Term::Literal(lit) => Self::from_literal(lit),
            other => Err(Error::evaluation(format!("{} is not a numeric literal", other))),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Numeric::Integer(_) => 0,
            Numeric::Decimal(_) => 1,
            Numeric::Float(_) => 2,
            Numeric::Double(_) => 3,
        }
    }

    /// Returns the value as an f64, rounding decimals.
    pub fn as_f64(&self) -> f64 {
        match self {
            Numeric::Integer(v) => *v as f64,
            Numeric::Decimal(v) => v.to_f64().unwrap_or(f64::NAN),
            Numeric::Float(v) | Numeric::Double(v) => *v,
        }
    }

    /// The exact value of an integer or decimal.
    fn exact(&self) -> Option<BigDecimal> {
        match self {
            Numeric::Integer(v) => Some(BigDecimal::from(*v)),
            Numeric::Decimal(v) => Some(v.clone()),
            Numeric::Float(_) | Numeric::Double(_) => None,
        }
    }

    /// Wraps a floating result at the wider of the two operand types.
    fn floating(&self, other: &Numeric, value: f64) -> Self {
        if self.rank().max(other.rank()) == 2 {
            Numeric::Float(value)
        } else {
            Numeric::Double(value)
        }
    }

    pub fn add(&self, other: &Numeric) -> Result<Numeric> {
        if let (Numeric::Integer(a), Numeric::Integer(b)) = (self, other) {
            return a
                .checked_add(*b)
                .map(Numeric::Integer)
                .ok_or_else(|| Error::evaluation("integer overflow"));
        }
        if let (Some(a), Some(b)) = (self.exact(), other.exact()) {
            return Ok(Numeric::Decimal(a + b));
        }
        Ok(self.floating(other, self.as_f64() + other.as_f64()))
    }

    pub fn sub(&self, other: &Numeric) -> Result<Numeric> {
        if let (Numeric::Integer(a), Numeric::Integer(b)) = (self, other) {
            return a
                .checked_sub(*b)
                .map(Numeric::Integer)
                .ok_or_else(|| Error::evaluation("integer overflow"));
        }
        if let (Some(a), Some(b)) = (self.exact(), other.exact()) {
            return Ok(Numeric::Decimal(a - b));
        }
        Ok(self.floating(other, self.as_f64() - other.as_f64()))
    }

    /// Divides two numerics. Integer division yields a decimal.
    pub fn div(&self, other: &Numeric) -> Result<Numeric> {
        if let (Some(a), Some(b)) = (self.exact(), other.exact()) {
            if b.is_zero() {
                return Err(Error::evaluation("division by zero"));
            }
            return Ok(Numeric::Decimal(a / b));
        }
        Ok(self.floating(other, self.as_f64() / other.as_f64()))
    }

    /// Converts back into a typed literal term.
    pub fn to_term(&self) -> Term {
        match self {
            Numeric::Integer(v) => Term::integer(*v),
            Numeric::Decimal(v) => Term::typed(format_decimal(v), vocab::XSD_DECIMAL),
            Numeric::Float(v) => Term::typed(format_floating(*v), vocab::XSD_FLOAT),
            Numeric::Double(v) => Term::typed(format_floating(*v), vocab::XSD_DOUBLE),
        }
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if let (Numeric::Integer(a), Numeric::Integer(b)) = (self, other) {
            return Some(a.cmp(b));
        }
        match (self.exact(), other.exact()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

fn parse_floating(lexical: &str) -> Option<f64> {
    match lexical {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

/// Canonical decimal form: no exponent, no trailing zeros, at least one
/// fractional digit.
fn format_decimal(value: &BigDecimal) -> String {
    let (digits, scale) = value.normalized().as_bigint_and_exponent();
    let text = digits.to_string();
    let (sign, magnitude) = match text.strip_prefix('-') {
        Some(magnitude) => ("-", magnitude),
        None => ("", text.as_str()),
    };
    if scale <= 0 {
        return format!("{}{}{}.0", sign, magnitude, "0".repeat(scale.unsigned_abs() as usize));
    }
    let scale = scale as usize;
    let padded = if magnitude.len() <= scale {
        format!("{}{}", "0".repeat(scale + 1 - magnitude.len()), magnitude)
    } else {
        magnitude.to_string()
    };
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    format!("{}{}.{}", sign, whole, fraction)
}

fn format_floating(value: f64) -> String {
    if value.is_nan() {
        "NaN".into()
    } else if value.is_infinite() {
        if value > 0.0 { "INF".into() } else { "-INF".into() }
    } else {
        format!("{:E}", value)
    }
}
