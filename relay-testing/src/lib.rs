//! Internal testing utilities for the relay crates.

use std::any::Any;
use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

/// Table-driven test helper.
///
/// Declare a `Debug` struct, conventionally named `Case`, holding the inputs
/// and expected outputs of one test. Collect the cases into an array or
/// `Vec` named `cases` and call `cases.test_each` with the body of the test.
///
/// Every case is run even if an earlier one fails. Once all cases have run,
/// `test_each` panics if any of them panicked, listing the position, debug
/// representation and panic message of each failure.
///
/// ```
/// use relay_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     dims: [i64; 2],
///     expected: i64,
/// }
///
/// let cases = [
///     Case { dims: [4, 5], expected: 20 },
///     Case { dims: [1, 7], expected: 7 },
/// ];
///
/// cases.test_each(|case| {
///     assert_eq!(case.dims[0] * case.dims[1], case.expected);
/// });
/// ```
///
/// Cases and anything the test closure captures must be unwind safe. Wrap
/// values with interior mutability in
/// [`AssertUnwindSafe`](std::panic::AssertUnwindSafe), or build them inside
/// the closure.
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Run `test` with a reference to each case.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Run `test` with each case passed by value.
    ///
    /// Each case is formatted before the test runs, so that it can be
    /// reported if the test panics.
    fn test_each_value(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe;
}

/// A case which panicked.
struct Failure {
    index: usize,
    case: String,
    message: String,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

fn report(failures: Vec<Failure>, total: usize) {
    if failures.is_empty() {
        return;
    }
    let mut summary = format!("{} of {} test cases failed:", failures.len(), total);
    for Failure {
        index,
        case,
        message,
    } in failures
    {
        summary.push_str(&format!("\n  [{}] {}\n      {}", index, case, message));
    }
    panic!("{}", summary);
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let mut failures = Vec::new();
        let mut total = 0;
        for (index, case) in self.into_iter().enumerate() {
            total += 1;
            if let Err(payload) = std::panic::catch_unwind(|| test(&case)) {
                failures.push(Failure {
                    index,
                    case: format!("{:?}", case),
                    message: panic_message(payload.as_ref()),
                });
            }
        }
        report(failures, total);
    }

    fn test_each_value(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe,
    {
        let mut failures = Vec::new();
        let mut total = 0;
        for (index, case) in self.into_iter().enumerate() {
            total += 1;
            let case_dbg = format!("{:?}", case);
            let test = &test;
            if let Err(payload) = std::panic::catch_unwind(move || test(case)) {
                failures.push(Failure {
                    index,
                    case: case_dbg,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
        report(failures, total);
    }
}

#[cfg(test)]
mod tests {
    use std::panic::catch_unwind;

    use super::TestCases;

    #[derive(Debug)]
    struct Case {
        value: i32,
    }

    #[test]
    fn test_each_passes() {
        let cases = [Case { value: 1 }, Case { value: 2 }];
        cases.test_each(|case| assert!(case.value > 0));
    }

    #[test]
    fn test_each_reports_failures() {
        let result = catch_unwind(|| {
            let cases = [Case { value: 1 }, Case { value: -2 }, Case { value: -3 }];
            cases.test_each(|case| assert!(case.value > 0, "negative value"));
        });
        let payload = result.err().expect("should fail");
        let msg = payload
            .downcast_ref::<String>()
            .expect("message should be a String");
        assert!(msg.starts_with("2 of 3 test cases failed"));
        assert!(msg.contains("[1] Case { value: -2 }"));
        assert!(msg.contains("negative value"));
    }

    #[test]
    fn test_each_value_passes_ownership() {
        let cases = vec![vec![1, 2], vec![3]];
        cases.test_each_value(|case| {
            let owned: Vec<i32> = case;
            assert!(!owned.is_empty());
        });
    }

    #[test]
    fn test_each_value_reports_failures() {
        let result = catch_unwind(|| {
            [String::from("ok"), String::from("bad")].test_each_value(|s| assert_eq!(s, "ok"));
        });
        let payload = result.err().expect("should fail");
        let msg = payload.downcast_ref::<String>().unwrap();
        assert!(msg.contains("[1] \"bad\""));
    }
}
