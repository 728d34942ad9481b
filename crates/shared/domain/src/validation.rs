//! Bridges `validator` rules into [`DomainError`].

use validator::{Validate, ValidationErrors};

use crate::error::{DomainError, DomainResult};

/// Run the input's validation rules, folding every failure into one message.
pub fn validate<T: Validate>(input: &T) -> DomainResult<()> {
    input
        .validate()
        .map_err(|errors| DomainError::validation(describe(&errors)))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("'{}' is invalid", field),
            })
        })
        .collect();

    // HashMap order is arbitrary
    messages.sort();
    messages.join("; ")
}
