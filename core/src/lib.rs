//! Synchronous client core for the HubSpot CRM API.
//!
//! # Overview
//! A [`Connection`] turns a path template, a [`Params`] mapping and
//! [`CallOptions`] into an authenticated request, runs it through a
//! [`Transport`], and classifies the response. Resource wrappers
//! ([`Deal`], [`Ticket`], [`Task`], [`TicketProperties`]) are thin layers that
//! build JSON payloads on top of it.
//!
//! # Design
//! - [`Config`] is immutable and shared; a connection carries no per-call state.
//! - URL generation never mutates the caller's path or parameters.
//! - Query keys are encoded through an ordered rule table ([`QueryRule`]).
//! - The transport is a trait so requests can be recorded in tests;
//!   [`UreqTransport`] does the real blocking round trip.

pub mod association;
pub mod config;
pub mod connection;
pub mod deal;
pub mod error;
pub mod http;
pub mod params;
pub mod properties;
pub mod task;
pub mod ticket;
pub mod ticket_properties;
pub mod transport;
pub mod types;
pub mod url;

#[cfg(test)]
mod testing;

pub use association::{build_association_param, ObjectType};
pub use config::Config;
pub use connection::{handle_response, CallOptions, Connection, Reply};
pub use deal::DealSearch;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Timeouts};
pub use params::{ParamValue, Params};
pub use ticket::TicketAssociations;
pub use ticket_properties::TicketProperties;
pub use transport::{Transport, UreqTransport};
pub use types::{Deal, DealPage, DealSearchPage, Task, Ticket};
pub use url::{generate_url, QueryRule, UrlOptions};
