//! The application-facing entry point: [`Message`] and the marking macros.
//!
//! Application code marks strings with [`t!`](crate::t), [`dt!`](crate::dt),
//! [`pt!`](crate::pt) or [`dpt!`](crate::dpt). Each macro builds its
//! [`MessageRecord`] once per call site, attaches the named arguments and
//! resolves the message through [`Resolver::installed`] in the current
//! locale. The same invocations are found statically by [`crate::scan`], so
//! the identity used at runtime is the one written to the catalog.
//!
//! ```
//! use transmark::t;
//!
//! let user = "Ana";
//! let text = t!("Hello {name}!", name = user)?;
//! # let _ = text;
//! # Ok::<(), transmark::resolver::ResolveError>(())
//! ```

use std::borrow::Cow;

use crate::format::{Value, Variables};
use crate::locale::Locale;
use crate::record::MessageRecord;
use crate::resolver::{ResolveError, Resolver};

/// A marked message together with its arguments.
#[derive(Debug, Clone)]
pub struct Message {
    record: Cow<'static, MessageRecord>,
    variables: Variables,
}

impl Message {
    /// Wrap an owned record.
    #[must_use]
    pub fn new(record: MessageRecord) -> Self {
        Self {
            record: Cow::Owned(record),
            variables: Variables::new(),
        }
    }

    /// Wrap a record that lives for the whole program, such as one cached
    /// in a `static`.
    #[must_use]
    pub fn from_static(record: &'static MessageRecord) -> Self {
        Self {
            record: Cow::Borrowed(record),
            variables: Variables::new(),
        }
    }

    /// The underlying record.
    #[must_use]
    pub fn record(&self) -> &MessageRecord {
        &self.record
    }

    /// Arguments attached so far.
    #[must_use]
    pub const fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Attach a named argument.
    #[must_use]
    pub fn with_arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name, value);
        self
    }

    /// Render with the installed collaborators in the current locale.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn render(&self) -> Result<String, ResolveError> {
        self.render_with(&Resolver::installed(), None)
    }

    /// Render with the installed collaborators in `locale`.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn render_in(&self, locale: &Locale) -> Result<String, ResolveError> {
        self.render_with(&Resolver::installed(), Some(locale))
    }

    /// Render through an explicit resolver.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn render_with(
        &self,
        resolver: &Resolver,
        locale: Option<&Locale>,
    ) -> Result<String, ResolveError> {
        resolver.resolve(&self.record, &self.variables, locale)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __transmark_mark {
    ($domain:expr, $context:expr, $text:expr $(, $name:ident = $value:expr)* $(,)?) => {{
        static RECORD: ::std::sync::OnceLock<$crate::record::MessageRecord> =
            ::std::sync::OnceLock::new();
        let record = RECORD.get_or_init(|| {
            $crate::record::MessageRecord::new($text)
                .with_domain($domain)
                .with_context($context)
                $(.with_variable(::core::stringify!($name)))*
        });
        $crate::message::Message::from_static(record)
            $(.with_arg(::core::stringify!($name), $value))*
            .render()
    }};
}

/// Mark and resolve a message in the default domain.
///
/// Returns `Result<String, ResolveError>`. Named arguments supply the
/// template's placeholders.
///
/// ```
/// use transmark::t;
///
/// let greeting = t!("Hello {name}!", name = "Ana")?;
/// # let _ = greeting;
/// # Ok::<(), transmark::resolver::ResolveError>(())
/// ```
#[macro_export]
macro_rules! t {
    ($text:literal $(, $name:ident = $value:expr)* $(,)?) => {
        $crate::__transmark_mark!($crate::record::DEFAULT_DOMAIN, "", $text $(, $name = $value)*)
    };
}

/// Mark and resolve a message in an explicit domain.
///
/// ```
/// use transmark::dt;
///
/// let label = dt!("mail", "Inbox")?;
/// # let _ = label;
/// # Ok::<(), transmark::resolver::ResolveError>(())
/// ```
#[macro_export]
macro_rules! dt {
    ($domain:literal, $text:literal $(, $name:ident = $value:expr)* $(,)?) => {
        $crate::__transmark_mark!($domain, "", $text $(, $name = $value)*)
    };
}

/// Mark and resolve a message with a disambiguating context.
#[macro_export]
macro_rules! pt {
    ($context:literal, $text:literal $(, $name:ident = $value:expr)* $(,)?) => {
        $crate::__transmark_mark!($crate::record::DEFAULT_DOMAIN, $context, $text $(, $name = $value)*)
    };
}

/// Mark and resolve a message with both a domain and a context.
#[macro_export]
macro_rules! dpt {
    ($domain:literal, $context:literal, $text:literal $(, $name:ident = $value:expr)* $(,)?) => {
        $crate::__transmark_mark!($domain, $context, $text $(, $name = $value)*)
    };
}
