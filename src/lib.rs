//! Transmark core library.
//!
//! Application code marks human-readable strings with the [`t!`], [`dt!`],
//! [`pt!`] and [`dpt!`] macros. Two pipelines share one notion of message
//! identity ([`identity::MessageId`]):
//!
//! - **extraction** walks source trees ([`scan`]), accumulates records per
//!   unit ([`registry`]), merges them order-independently ([`extract`]) and
//!   persists the catalog ([`catalog`]);
//! - **resolution** picks a locale ([`locale`]), asks an optional
//!   [`backend::Backend`] for a template and renders it with a
//!   [`format::Formatter`] ([`resolver`], [`message`]). Without a backend the
//!   source text is rendered.
//!
//! The [`cli`] and [`runner`] modules provide the `transmark` command.

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod extract;
pub mod format;
pub mod identity;
pub mod locale;
pub mod locale_resolution;
pub mod message;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod scan;

pub use error::ConfigureError;
pub use identity::MessageId;
pub use locale::Locale;
pub use message::Message;
pub use record::MessageRecord;
pub use resolver::{ResolveError, Resolver};
