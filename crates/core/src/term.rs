//! RDF term definitions.
//!
//! This module defines the `Term` enum, the unit value bound to query variables
//! and stored in quad positions, together with the SPARQL term ordering used by
//! MIN/MAX and ORDER BY.

use crate::numeric::Numeric;
use core::cmp::Ordering;
use core::fmt;

/// Well-known datatype IRIs.
pub mod vocab {
    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

    /// Datatypes derived from `xsd:integer`.
    pub const XSD_INTEGER_DERIVED: &[&str] = &[
        "http://www.w3.org/2001/XMLSchema#int",
        "http://www.w3.org/2001/XMLSchema#long",
        "http://www.w3.org/2001/XMLSchema#short",
        "http://www.w3.org/2001/XMLSchema#byte",
        "http://www.w3.org/2001/XMLSchema#nonNegativeInteger",
        "http://www.w3.org/2001/XMLSchema#nonPositiveInteger",
        "http://www.w3.org/2001/XMLSchema#negativeInteger",
        "http://www.w3.org/2001/XMLSchema#positiveInteger",
        "http://www.w3.org/2001/XMLSchema#unsignedLong",
        "http://www.w3.org/2001/XMLSchema#unsignedInt",
        "http://www.w3.org/2001/XMLSchema#unsignedShort",
        "http://www.w3.org/2001/XMLSchema#unsignedByte",
    ];
}

/// An RDF literal: lexical form, datatype IRI and optional language tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    value: String,
    datatype: String,
    language: Option<String>,
}

impl Literal {
    /// Creates a plain `xsd:string` literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: vocab::XSD_STRING.into(),
            language: None,
        }
    }

    /// Creates a typed literal.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    /// Creates a language-tagged string. Tags are lowercased.
    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: vocab::RDF_LANG_STRING.into(),
            language: Some(language.into().to_ascii_lowercase()),
        }
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[inline]
    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    #[inline]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// An RDF term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    /// An IRI.
    NamedNode(String),
    /// A blank node label.
    BlankNode(String),
    /// A literal.
    Literal(Literal),
    /// The default graph, only valid in the graph position of a quad.
    DefaultGraph,
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::NamedNode(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Term::Literal(Literal::string(value))
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal::typed(value, datatype))
    }

    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal::lang(value, language))
    }

    /// Creates an `xsd:integer` literal.
    pub fn integer(value: i64) -> Self {
        Term::typed(value.to_string(), vocab::XSD_INTEGER)
    }

    /// Returns the literal if this term is one.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Returns the lexical value: IRI, blank label or literal lexical form.
    pub fn lexical(&self) -> &str {
        match self {
            Term::NamedNode(iri) => iri,
            Term::BlankNode(label) => label,
            Term::Literal(lit) => lit.value(),
            Term::DefaultGraph => "",
        }
    }

    #[inline]
    pub fn is_default_graph(&self) -> bool {
        matches!(self, Term::DefaultGraph)
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Term::DefaultGraph => 0,
            Term::BlankNode(_) => 1,
            Term::NamedNode(_) => 2,
            Term::Literal(_) => 3,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::NamedNode(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", lit.value.replace('\\', "\\\\").replace('"', "\\\""))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{}", lang)
                } else if lit.datatype != vocab::XSD_STRING {
                    write!(f, "^^<{}>", lit.datatype)
                } else {
                    Ok(())
                }
            }
            Term::DefaultGraph => f.write_str("DEFAULT"),
        }
    }
}

/// SPARQL ordering of terms: blank nodes, then IRIs, then literals.
///
/// Numeric literals compare by value and precede other literals. Ties are broken on the lexical form,
/// the datatype and the language tag so that the order is total and agrees
/// with term equality.
pub fn compare_terms(a: &Term, b: &Term) -> Ordering {
    let rank = a.kind_rank().cmp(&b.kind_rank());
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Term::Literal(la), Term::Literal(lb)) => {
            match (Numeric::from_literal(la), Numeric::from_literal(lb)) {
                (Ok(na), Ok(nb)) => {
                    let by_value = na.partial_cmp(&nb).unwrap_or(Ordering::Equal);
                    if by_value != Ordering::Equal {
                        return by_value;
                    }
                }
                // Numbers sort before other literals.
                (Ok(_), Err(_)) => return Ordering::Less,
                (Err(_), Ok(_)) => return Ordering::Greater,
                (Err(_), Err(_)) => {}
            }
            la.value
                .cmp(&lb.value)
                .then_with(|| la.datatype.cmp(&lb.datatype))
                .then_with(|| la.language.cmp(&lb.language))
        }
        _ => a.lexical().cmp(b.lexical()),
    }
}

/// A term wrapper ordered by [`compare_terms`], usable as a `BTreeMap` key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderedTerm(pub Term);

impl PartialOrd for OrderedTerm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedTerm {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_terms(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_display() {
        assert_eq!(Term::iri("http://ex.org/a").to_string(), "<http://ex.org/a>");
        assert_eq!(Term::blank("b0").to_string(), "_:b0");
        assert_eq!(Term::string("hi").to_string(), "\"hi\"");
        assert_eq!(Term::lang("hi", "EN").to_string(), "\"hi\"@en");
        assert_eq!(
            Term::integer(3).to_string(),
            "\"3\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn test_numeric_ordering() {
        let nine = Term::integer(9);
        let ten = Term::integer(10);
        assert_eq!(compare_terms(&nine, &ten), Ordering::Less);
        let ten_decimal = Term::typed("10.0", vocab::XSD_DECIMAL);
        assert_ne!(compare_terms(&ten, &ten_decimal), Ordering::Equal);
    }

    #[test]
    fn test_numbers_precede_strings() {
        let five = Term::string("5");
        assert_eq!(compare_terms(&Term::integer(10), &five), Ordering::Less);
        assert_eq!(compare_terms(&five, &Term::integer(9)), Ordering::Greater);
    }

    #[test]
    fn test_kind_ordering() {
        let blank = Term::blank("a");
        let iri = Term::iri("http://ex.org/");
        let lit = Term::string("a");
        assert_eq!(compare_terms(&blank, &iri), Ordering::Less);
        assert_eq!(compare_terms(&iri, &lit), Ordering::Less);
        assert!(OrderedTerm(lit.clone()) > OrderedTerm(iri));
    }
}
