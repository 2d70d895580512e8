//! Foundation types for the PBFT consensus engine.
//!
//! This crate provides the types shared by every layer of the consensus
//! implementation:
//!
//! - **Primitives**: [`Address`], [`Digest`]
//! - **Consensus coordinates**: [`View`], [`Subject`]
//! - **Proposals**: [`Proposal`], [`ProposalHeader`], [`Request`]
//! - **Membership**: [`Validator`], [`ValidatorSet`]
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod address;
mod digest;
mod proposal;
mod validator;
mod view;

pub use address::{Address, AddressError};
pub use digest::Digest;
pub use proposal::{Proposal, ProposalHeader, Request};
pub use validator::{PublicKey, Validator, ValidatorSet};
pub use view::{Subject, View};
