//! Symbolic expressions representing dimension sizes.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

/// A named dimension.
///
/// Two symbols are equal if they have the same name.
#[derive(Clone, PartialEq)]
pub struct Symbol {
    pub name: String,

    // True if this value is assumed to be >= 0.
    pub positive: bool,
}

/// Symbolic integer expression used for the size of a tensor dimension.
///
/// Expressions can be known integer values, named symbols (eg. a dynamic
/// batch size) or composite expressions such as the product of two
/// dimensions.
#[derive(Clone)]
pub enum IndexExpr {
    /// Dimension with a known size.
    Value(i64),
    /// Named symbolic size.
    Var(Arc<Symbol>),
    /// Sum of two sizes.
    Add(Arc<IndexExpr>, Arc<IndexExpr>),
    /// Difference of two sizes.
    Sub(Arc<IndexExpr>, Arc<IndexExpr>),
    /// Product of two sizes.
    Mul(Arc<IndexExpr>, Arc<IndexExpr>),
    /// Flooring division of the first expression by the second.
    Div(Arc<IndexExpr>, Arc<IndexExpr>),
}

impl IndexExpr {
    /// Create a named symbol, with no assumptions about the value.
    pub fn var(name: &str) -> Self {
        IndexExpr::Var(
            Symbol {
                name: name.to_string(),
                positive: false,
            }
            .into(),
        )
    }

    /// Create a named symbol representing a size (ie. `>= 0`).
    pub fn pos_var(name: &str) -> Self {
        IndexExpr::Var(
            Symbol {
                name: name.to_string(),
                positive: true,
            }
            .into(),
        )
    }

    /// Return the value of this expression if it is a known constant.
    pub fn as_value(&self) -> Option<i64> {
        match self {
            Self::Value(x) => Some(*x),
            _ => None,
        }
    }

    /// Return true if the value of this expression is known to be >= 0.
    pub fn is_positive(&self) -> bool {
        match self {
            Self::Value(x) => *x >= 0,
            Self::Var(sym) => sym.positive,
            Self::Add(lhs, rhs) | Self::Mul(lhs, rhs) | Self::Div(lhs, rhs) => {
                lhs.is_positive() && rhs.is_positive()
            }
            Self::Sub(..) => false,
        }
    }

    fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Name of the symbol, if this is a symbol.
    fn name(&self) -> Option<&str> {
        match self {
            Self::Var(sym) => Some(&sym.name),
            _ => None,
        }
    }

    /// Simplify an expression.
    ///
    /// Constants are folded (`4 * 5` becomes `20`), identities are removed
    /// (`x + 0`, `x * 1`, `x / 1`, `x - x`) and factors common to both sides
    /// of a division are cancelled.
    pub fn simplify(&self) -> IndexExpr {
        match self {
            Self::Value(_) | Self::Var(_) => self.clone(),
            Self::Add(..) => {
                let mut terms = Vec::new();
                collect_terms(&mut terms, self, &|term| match term {
                    Self::Add(lhs, rhs) => Some((lhs, rhs)),
                    _ => None,
                });
                fold_terms(terms, 0, i64::checked_add, |sum, x| sum + x)
            }
            Self::Mul(..) => {
                let mut terms = Vec::new();
                collect_terms(&mut terms, self, &|term| match term {
                    Self::Mul(lhs, rhs) => Some((lhs, rhs)),
                    _ => None,
                });
                if terms.iter().any(|t| t.as_value() == Some(0)) {
                    return IndexExpr::Value(0);
                }
                fold_terms(terms, 1, i64::checked_mul, |prod, x| prod * x)
            }
            Self::Sub(lhs, rhs) => match (lhs.simplify(), rhs.simplify()) {
                (lhs, IndexExpr::Value(0)) => lhs,
                (IndexExpr::Value(x), IndexExpr::Value(y)) if x.checked_sub(y).is_some() => {
                    IndexExpr::Value(x - y)
                }
                (lhs, rhs) if lhs == rhs => IndexExpr::Value(0),
                (lhs, rhs) => lhs - rhs,
            },
            Self::Div(lhs, rhs) => {
                let (lhs, rhs) = remove_common_factors(lhs.simplify(), rhs.simplify());
                match (lhs, rhs) {
                    (lhs, IndexExpr::Value(1)) => lhs,
                    (IndexExpr::Value(x), IndexExpr::Value(y)) => match div_floor(x, y) {
                        Some(q) => IndexExpr::Value(q),
                        None => IndexExpr::Value(x) / IndexExpr::Value(y),
                    },
                    (lhs, rhs) => lhs / rhs,
                }
            }
        }
    }

    /// Return the precedence of the operator.
    ///
    /// This is used to add parentheses when formatting an expression tree.
    fn precedence(&self) -> u8 {
        match self {
            Self::Value(_) | Self::Var(_) => 3,
            Self::Mul(..) | Self::Div(..) => 2,
            Self::Add(..) | Self::Sub(..) => 1,
        }
    }

    /// Return true if `operand` must be parenthesized when formatted as an
    /// operand of this expression.
    ///
    /// Operators are left-associative, so an equal-precedence right operand
    /// needs parentheses unless both operators are `+` or both are `*`.
    fn needs_parens(&self, operand: &IndexExpr, is_rhs: bool) -> bool {
        match operand.precedence().cmp(&self.precedence()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => {
                is_rhs
                    && !matches!(
                        (self, operand),
                        (Self::Add(..), Self::Add(..)) | (Self::Mul(..), Self::Mul(..))
                    )
            }
        }
    }
}

/// Flatten nested applications of one associative operator into `terms`,
/// simplifying each leaf.
fn collect_terms(
    terms: &mut Vec<IndexExpr>,
    term: &IndexExpr,
    extract_lhs_rhs: &impl Fn(&IndexExpr) -> Option<(&Arc<IndexExpr>, &Arc<IndexExpr>)>,
) {
    if let Some((lhs, rhs)) = extract_lhs_rhs(term) {
        collect_terms(terms, lhs, extract_lhs_rhs);
        collect_terms(terms, rhs, extract_lhs_rhs);
    } else {
        terms.push(term.simplify());
    }
}

/// Combine the constant terms of an associative, commutative operation and
/// rebuild the expression with the folded constant first.
///
/// If folding the constants overflows, they are kept as separate terms.
fn fold_terms(
    mut terms: Vec<IndexExpr>,
    identity: i64,
    fold: impl Fn(i64, i64) -> Option<i64>,
    reduce: impl Fn(IndexExpr, IndexExpr) -> IndexExpr,
) -> IndexExpr {
    terms.sort_by(cmp_values_first);

    let constant = terms
        .iter()
        .filter_map(IndexExpr::as_value)
        .try_fold(identity, &fold);
    let kept: Vec<IndexExpr> = match constant {
        Some(_) => terms.into_iter().filter(|t| !t.is_value()).collect(),
        None => terms
            .into_iter()
            .filter(|t| t.as_value() != Some(identity))
            .collect(),
    };

    let mut result: Option<IndexExpr> = None;
    if let Some(constant) = constant.filter(|c| *c != identity) {
        result = Some(IndexExpr::Value(constant));
    }
    for term in kept {
        result = Some(match result {
            Some(acc) => reduce(acc, term),
            None => term,
        });
    }
    result.unwrap_or(IndexExpr::Value(identity))
}

/// Sort terms in an order that makes simplification easier, by making terms
/// which can be combined adjacent.
fn cmp_values_first(a: &IndexExpr, b: &IndexExpr) -> Ordering {
    match (a.is_value(), b.is_value()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => match (a.name(), b.name()) {
            (Some(a_name), Some(b_name)) => a_name.cmp(b_name),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        },
    }
}

/// Remove common factors from `lhs` and `rhs`.
fn remove_common_factors(lhs: IndexExpr, rhs: IndexExpr) -> (IndexExpr, IndexExpr) {
    fn factors(terms: &mut Vec<IndexExpr>, term: &IndexExpr) {
        if let IndexExpr::Mul(lhs, rhs) = term {
            factors(terms, lhs);
            factors(terms, rhs);
        } else {
            terms.push(term.clone());
        }
    }

    let mut lhs_terms = Vec::new();
    factors(&mut lhs_terms, &lhs);

    let mut rhs_terms = Vec::new();
    factors(&mut rhs_terms, &rhs);

    let mut i = 0;
    while i < lhs_terms.len() {
        // Cancelling a zero divisor would hide a division by zero.
        let k = rhs_terms
            .iter()
            .position(|t| *t == lhs_terms[i] && t.as_value() != Some(0));
        if let Some(k) = k {
            lhs_terms.remove(i);
            rhs_terms.remove(k);
        } else {
            i += 1;
        }
    }

    let product = |terms: Vec<IndexExpr>| {
        terms
            .into_iter()
            .reduce(|prod, x| prod * x)
            .unwrap_or(IndexExpr::Value(1))
    };
    (product(lhs_terms), product(rhs_terms))
}

/// Integer division which rounds towards negative infinity.
///
/// Returns `None` if `rhs` is zero or the result overflows.
fn div_floor(lhs: i64, rhs: i64) -> Option<i64> {
    let d = lhs.checked_div(rhs)?;
    if lhs.checked_rem(rhs)? != 0 && ((lhs < 0) != (rhs < 0)) {
        d.checked_sub(1)
    } else {
        Some(d)
    }
}

impl PartialEq<IndexExpr> for IndexExpr {
    fn eq(&self, other: &IndexExpr) -> bool {
        let commutative_eq = |self_lhs, self_rhs, other_lhs, other_rhs| {
            (self_lhs == other_lhs && self_rhs == other_rhs)
                || (self_lhs == other_rhs && self_rhs == other_lhs)
        };

        match (self, other) {
            (Self::Value(x), Self::Value(y)) => x == y,
            (Self::Var(x), Self::Var(y)) => x.name == y.name,
            (Self::Add(a, b), Self::Add(c, d)) | (Self::Mul(a, b), Self::Mul(c, d)) => {
                commutative_eq(a, b, c, d)
            }
            (Self::Sub(a, b), Self::Sub(c, d)) | (Self::Div(a, b), Self::Div(c, d)) => {
                a == c && b == d
            }
            _ => false,
        }
    }
}

impl Add<IndexExpr> for IndexExpr {
    type Output = IndexExpr;

    fn add(self, rhs: IndexExpr) -> Self {
        Self::Add(self.into(), rhs.into())
    }
}

impl Sub<IndexExpr> for IndexExpr {
    type Output = IndexExpr;

    fn sub(self, rhs: IndexExpr) -> Self {
        Self::Sub(self.into(), rhs.into())
    }
}

impl Mul<IndexExpr> for IndexExpr {
    type Output = IndexExpr;

    fn mul(self, rhs: IndexExpr) -> Self {
        Self::Mul(self.into(), rhs.into())
    }
}

impl Div<IndexExpr> for IndexExpr {
    type Output = IndexExpr;

    fn div(self, rhs: IndexExpr) -> Self {
        Self::Div(self.into(), rhs.into())
    }
}

/// Create a symbol with a given name and an assumption that the value is
/// positive (`>= 0`), since symbols mostly stand for dimension sizes.
impl<'a> From<&'a str> for IndexExpr {
    fn from(name: &'a str) -> Self {
        IndexExpr::pos_var(name)
    }
}

impl From<i64> for IndexExpr {
    fn from(val: i64) -> Self {
        IndexExpr::Value(val)
    }
}

impl From<i32> for IndexExpr {
    fn from(val: i32) -> Self {
        IndexExpr::Value(val as i64)
    }
}

/// Create a known size. Sizes above `i64::MAX` saturate to `i64::MAX`.
impl From<usize> for IndexExpr {
    fn from(val: usize) -> Self {
        IndexExpr::Value(i64::try_from(val).unwrap_or(i64::MAX))
    }
}

impl fmt::Debug for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let add_parens = |f: &mut fmt::Formatter<'_>, expr: &IndexExpr, is_rhs: bool| {
            if self.needs_parens(expr, is_rhs) {
                write!(f, "({:?})", expr)
            } else {
                write!(f, "{:?}", expr)
            }
        };
        let write_binop = |f: &mut fmt::Formatter<'_>, op, lhs, rhs| {
            add_parens(f, lhs, false)?;
            write!(f, " {op} ")?;
            add_parens(f, rhs, true)
        };
        match self {
            Self::Value(val) => write!(f, "{}", val),
            Self::Var(sym) => write!(f, "\"{}\"", sym.name),
            Self::Add(lhs, rhs) => write_binop(f, '+', lhs, rhs),
            Self::Sub(lhs, rhs) => write_binop(f, '-', lhs, rhs),
            Self::Mul(lhs, rhs) => write_binop(f, '*', lhs, rhs),
            Self::Div(lhs, rhs) => write_binop(f, '/', lhs, rhs),
        }
    }
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let add_parens = |f: &mut fmt::Formatter<'_>, expr: &IndexExpr, is_rhs: bool| {
            if self.needs_parens(expr, is_rhs) {
                write!(f, "({})", expr)
            } else {
                write!(f, "{}", expr)
            }
        };
        let write_binop = |f: &mut fmt::Formatter<'_>, op, lhs, rhs| {
            add_parens(f, lhs, false)?;
            write!(f, " {op} ")?;
            add_parens(f, rhs, true)
        };
        match self {
            Self::Value(val) => write!(f, "{}", val),
            Self::Var(sym) => write!(f, "{}", sym.name),
            Self::Add(lhs, rhs) => write_binop(f, '+', lhs, rhs),
            Self::Sub(lhs, rhs) => write_binop(f, '-', lhs, rhs),
            Self::Mul(lhs, rhs) => write_binop(f, '*', lhs, rhs),
            Self::Div(lhs, rhs) => write_binop(f, '/', lhs, rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use relay_testing::TestCases;

    use super::IndexExpr;

    #[test]
    fn test_simplify_mul() {
        let n = IndexExpr::from("n");
        let m = IndexExpr::from("m");

        // Constant folding
        let expr = IndexExpr::from(4) * IndexExpr::from(5);
        assert_eq!(expr.simplify(), IndexExpr::from(20));

        // x * 1 => x
        let expr = n.clone() * IndexExpr::from(1);
        assert_eq!(expr.simplify(), n);

        // x * 0 => 0
        let expr = n.clone() * IndexExpr::from(0);
        assert_eq!(expr.simplify(), IndexExpr::from(0));

        // Symbolic product is kept
        let expr = n.clone() * m.clone();
        assert_eq!(expr.simplify(), n.clone() * m.clone());

        // C * X * D => CD * X
        let expr = (IndexExpr::from(3) * n.clone()) * IndexExpr::from(4);
        assert_eq!(expr.simplify(), IndexExpr::from(12) * n.clone());
    }

    #[test]
    fn test_simplify_add() {
        let x = IndexExpr::from("x");

        let expr = x.clone() + IndexExpr::from(0);
        assert_eq!(expr.simplify(), x);

        // C + X + D => S + X
        let expr = (x.clone() + IndexExpr::from(3)) + IndexExpr::from(4);
        assert_eq!(expr.simplify(), IndexExpr::from(7) + x.clone());
    }

    #[test]
    fn test_simplify_sub() {
        let x = IndexExpr::from("x");

        assert_eq!((x.clone() - IndexExpr::from(0)).simplify(), x);
        assert_eq!((x.clone() - x.clone()).simplify(), IndexExpr::from(0));
        assert_eq!(
            (IndexExpr::from(7) - IndexExpr::from(2)).simplify(),
            IndexExpr::from(5)
        );
    }

    #[test]
    fn test_simplify_div() {
        #[derive(Debug)]
        struct Case {
            expr: IndexExpr,
            expected: IndexExpr,
        }

        let x = IndexExpr::from("x");
        let y = IndexExpr::from("y");
        let zero = IndexExpr::from(0);

        let cases = [
            Case {
                expr: IndexExpr::from(5) / IndexExpr::from(2),
                expected: IndexExpr::from(2),
            },
            Case {
                expr: IndexExpr::from(-5) / IndexExpr::from(2),
                expected: IndexExpr::from(-3),
            },
            // Zero divisor is left alone.
            Case {
                expr: IndexExpr::from(5) / zero.clone(),
                expected: IndexExpr::from(5) / zero.clone(),
            },
            Case {
                expr: x.clone() / IndexExpr::from(1),
                expected: x.clone(),
            },
            Case {
                expr: x.clone() / x.clone(),
                expected: IndexExpr::from(1),
            },
            Case {
                expr: (x.clone() * y.clone()) / x.clone(),
                expected: y.clone(),
            },
        ];

        cases.test_each(|case| {
            assert_eq!(case.expr.simplify(), case.expected);
        });
    }

    #[test]
    fn test_commutative_eq() {
        let n = IndexExpr::from("n");
        let m = IndexExpr::from("m");
        assert_eq!(n.clone() * m.clone(), m.clone() * n.clone());
        assert_ne!(n.clone() - m.clone(), m.clone() - n.clone());
    }

    #[test]
    fn test_is_positive() {
        assert!(IndexExpr::from("batch").is_positive());
        assert!(!IndexExpr::var("offset").is_positive());
        assert!((IndexExpr::from("n") * IndexExpr::from(3)).is_positive());
    }

    #[test]
    fn test_simplify_overflow() {
        #[derive(Debug)]
        struct Case {
            expr: IndexExpr,
            expected: IndexExpr,
        }

        let big = IndexExpr::from(1i64 << 32);
        let max = IndexExpr::from(i64::MAX);
        let min = IndexExpr::from(i64::MIN);
        let x = IndexExpr::from("x");

        let cases = [
            Case {
                expr: big.clone() * big.clone(),
                expected: big.clone() * big.clone(),
            },
            // Identity terms are still removed when folding overflows.
            Case {
                expr: (big.clone() * IndexExpr::from(1)) * big.clone(),
                expected: big.clone() * big.clone(),
            },
            Case {
                expr: (max.clone() + IndexExpr::from(1)) + x.clone(),
                expected: (max.clone() + IndexExpr::from(1)) + x.clone(),
            },
            Case {
                expr: min.clone() - IndexExpr::from(1),
                expected: min.clone() - IndexExpr::from(1),
            },
            Case {
                expr: min.clone() / IndexExpr::from(-1),
                expected: min.clone() / IndexExpr::from(-1),
            },
            Case {
                expr: min.clone() / IndexExpr::from(2),
                expected: IndexExpr::from(i64::MIN / 2),
            },
        ];

        cases.test_each(|case| {
            assert_eq!(case.expr.simplify(), case.expected);
        });
    }

    #[test]
    fn test_from_usize_saturates() {
        assert_eq!(IndexExpr::from(7usize), IndexExpr::from(7i64));
        assert_eq!(IndexExpr::from(usize::MAX).as_value(), Some(i64::MAX));
    }

    #[test]
    fn test_display() {
        #[derive(Debug)]
        struct Case {
            expr: IndexExpr,
            expected: &'static str,
        }

        let a = IndexExpr::from("a");
        let b = IndexExpr::from("b");
        let c = IndexExpr::from("c");

        let cases = [
            Case {
                expr: (IndexExpr::from(1) + IndexExpr::from("foo")) * IndexExpr::from(3),
                expected: "(1 + foo) * 3",
            },
            Case {
                expr: a.clone() - (b.clone() + c.clone()),
                expected: "a - (b + c)",
            },
            Case {
                expr: a.clone() - (b.clone() - c.clone()),
                expected: "a - (b - c)",
            },
            Case {
                expr: (a.clone() - b.clone()) - c.clone(),
                expected: "a - b - c",
            },
            Case {
                expr: (a.clone() - b.clone()) + c.clone(),
                expected: "a - b + c",
            },
            Case {
                expr: a.clone() + (b.clone() + c.clone()),
                expected: "a + b + c",
            },
            Case {
                expr: a.clone() / (b.clone() * c.clone()),
                expected: "a / (b * c)",
            },
            Case {
                expr: a.clone() * (b.clone() / c.clone()),
                expected: "a * (b / c)",
            },
            Case {
                expr: (a.clone() / b.clone()) * c.clone(),
                expected: "a / b * c",
            },
            Case {
                expr: a.clone() * (b.clone() * c.clone()),
                expected: "a * b * c",
            },
        ];

        cases.test_each(|case| {
            assert_eq!(case.expr.to_string(), case.expected);
        });

        let expr = (IndexExpr::from(1) + IndexExpr::from("foo")) * IndexExpr::from(3);
        assert_eq!(format!("{:?}", expr), "(1 + \"foo\") * 3");
        assert_eq!(
            format!("{:?}", a.clone() - (b.clone() + c.clone())),
            "\"a\" - (\"b\" + \"c\")"
        );
    }
}
