// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-page crawler agent
//!
//! Fires interaction events on a loaded document, captures the requests
//! the page makes in response and reports everything to a controller.
//!
//! - Element addressing across frames
//! - Mutation tracking reduced to subtree roots
//! - Fire-once ledger with causal trigger attribution
//! - Tick-budgeted waits for script loads and socket sends

mod address;
mod agent;
mod bridge;
mod dispatch;
mod input;
mod ledger;
mod mutation;
mod pending;

pub use address::{
    address_in, address_of, local_address, resolve, FrameHost, CHILD_COMBINATOR,
    FRAME_DELIMITER, FRAME_MARKER,
};
pub use agent::{stringify_element, FireOutcome, Probe};
pub use bridge::{
    BridgeMessage, ChannelController, Controller, ControllerResponse, LoggingController,
    ProbeEvent, RecordingController,
};
pub use dispatch::{DispatchReport, EventDispatcher, Interception};
pub use input::{fillable_controls, InputFiller, FILLABLE_CONTROLS};
pub use ledger::{Admission, RecordField, TriggerContext, TriggerLedger, TriggeredEventRecord, NON_TRIGGERABLE};
pub use mutation::{root_nodes, MutationTracker};
pub use pending::{jsonp_source, PendingKind, PendingTracker};
