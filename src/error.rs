// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BillingError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Time entry {0} is already billed")]
    AlreadyBilled(i64),

    #[error("Time entry {0} not found")]
    UnknownEntry(i64),

    #[error("Invoice draft has no time entries and no line items")]
    EmptyDraft,
}

impl BillingError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        BillingError::Validation {
            field,
            reason: reason.into(),
        }
    }
}
