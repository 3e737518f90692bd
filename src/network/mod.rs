// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Outbound request model
//!
//! Every navigation, form submission, script fetch and socket frame the
//! page produces is normalised into a [`Request`] with a dedup key.

mod field_eq;
mod request;

pub use field_eq::{contains_ignoring, unique_ignoring, FieldEq};
pub use request::{
    same_resource, strip_fragment, Request, RequestField, RequestKind, Trigger, WireRequest,
    WireTrigger,
};
