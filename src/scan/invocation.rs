//! Recognition of marking-macro invocations in a token stream.

use thiserror::Error;

use super::lexer::{Token, TokenKind};
use crate::record::is_valid_domain;

/// Marking macros and the positional literals each one takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MarkMacro {
    T,
    Dt,
    Pt,
    Dpt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Domain,
    Context,
    Text,
}

impl Slot {
    const fn describe(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Context => "context",
            Self::Text => "message text",
        }
    }
}

impl MarkMacro {
    fn from_ident(name: &str) -> Option<Self> {
        match name {
            "t" => Some(Self::T),
            "dt" => Some(Self::Dt),
            "pt" => Some(Self::Pt),
            "dpt" => Some(Self::Dpt),
            _ => None,
        }
    }

    const fn slots(self) -> &'static [Slot] {
        match self {
            Self::T => &[Slot::Text],
            Self::Dt => &[Slot::Domain, Slot::Text],
            Self::Pt => &[Slot::Context, Slot::Text],
            Self::Dpt => &[Slot::Domain, Slot::Context, Slot::Text],
        }
    }
}

/// One statically discovered call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Invocation {
    /// Byte offset of the macro name.
    pub(super) offset: usize,
    pub(super) text: String,
    pub(super) domain: Option<String>,
    pub(super) context: Option<String>,
    pub(super) variables: Vec<String>,
}

/// A marking macro whose arguments cannot be read statically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub(super) struct InvocationError {
    pub(super) offset: usize,
    pub(super) reason: String,
}

/// Find every marking-macro invocation in `tokens`.
///
/// Invocations whose arguments are `macro_rules!` metavariables are skipped:
/// they are forwarding definitions, not call sites.
pub(super) fn find_invocations(tokens: &[Token]) -> Result<Vec<Invocation>, InvocationError> {
    let code: Vec<&Token> = tokens
        .iter()
        .filter(|token| !matches!(token.kind, TokenKind::LineComment(_)))
        .collect();
    let mut found = Vec::new();
    let mut idx = 0usize;
    while let Some(token) = code.get(idx) {
        let Some(mark) = macro_at(&code, idx) else {
            idx += 1;
            continue;
        };
        // Resume right after the macro name so nested call sites are found too.
        let args = collect_args(&code, idx + 3, token.offset)?;
        idx += 1;
        if args.iter().any(|arg| is_metavariable(arg)) {
            continue;
        }
        found.push(parse_invocation(mark, token.offset, &args)?);
    }
    Ok(found)
}

fn macro_at(code: &[&Token], idx: usize) -> Option<MarkMacro> {
    let TokenKind::Ident(name) = &code.get(idx)?.kind else {
        return None;
    };
    let mark = MarkMacro::from_ident(name)?;
    let bang = matches!(code.get(idx + 1)?.kind, TokenKind::Punct('!'));
    let open = matches!(
        code.get(idx + 2)?.kind,
        TokenKind::Punct('(' | '[' | '{')
    );
    (bang && open).then_some(mark)
}

/// Split the macro body into top-level comma-separated arguments.
///
/// `start` is the index just past the opening delimiter.
fn collect_args<'tok>(
    code: &[&'tok Token],
    start: usize,
    macro_offset: usize,
) -> Result<Vec<Vec<&'tok Token>>, InvocationError> {
    let mut args: Vec<Vec<&Token>> = vec![Vec::new()];
    let mut depth = 0usize;
    let mut idx = start;
    loop {
        let Some(token) = code.get(idx) else {
            return Err(InvocationError {
                offset: macro_offset,
                reason: "unterminated macro invocation".to_owned(),
            });
        };
        idx += 1;
        match token.kind {
            TokenKind::Punct('(' | '[' | '{') => depth += 1,
            TokenKind::Punct(')' | ']' | '}') if depth == 0 => break,
            TokenKind::Punct(')' | ']' | '}') => depth -= 1,
            TokenKind::Punct(',') if depth == 0 => {
                args.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(current) = args.last_mut() {
            current.push(token);
        }
    }
    if args.last().is_some_and(Vec::is_empty) {
        args.pop();
    }
    Ok(args)
}

fn is_metavariable(arg: &[&Token]) -> bool {
    matches!(arg.first(), Some(token) if token.kind == TokenKind::Punct('$'))
}

fn parse_invocation(
    mark: MarkMacro,
    offset: usize,
    args: &[Vec<&Token>],
) -> Result<Invocation, InvocationError> {
    let fail = |reason: String| InvocationError { offset, reason };
    let slots = mark.slots();
    let mut invocation = Invocation {
        offset,
        text: String::new(),
        domain: None,
        context: None,
        variables: Vec::new(),
    };
    for (position, slot) in slots.iter().enumerate() {
        let Some(arg) = args.get(position) else {
            return Err(fail(format!("missing {} argument", slot.describe())));
        };
        let value = string_literal(arg)
            .ok_or_else(|| fail(format!("{} must be a string literal", slot.describe())))?;
        match slot {
            Slot::Domain if !value.is_empty() && !is_valid_domain(&value) => {
                return Err(fail(format!("domain '{value}' cannot name a catalog file")));
            }
            Slot::Domain => invocation.domain = Some(value),
            Slot::Context => invocation.context = Some(value),
            Slot::Text => invocation.text = value,
        }
    }
    for arg in args.iter().skip(slots.len()) {
        let name = named_argument(arg)
            .ok_or_else(|| fail("expected `name = value` after the message text".to_owned()))?;
        if !invocation.variables.contains(&name) {
            invocation.variables.push(name);
        }
    }
    Ok(invocation)
}

fn string_literal(arg: &[&Token]) -> Option<String> {
    match arg {
        [token] => match &token.kind {
            TokenKind::Str(value) => Some(value.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn named_argument(arg: &[&Token]) -> Option<String> {
    match arg {
        [name, eq, value, ..] => match (&name.kind, &eq.kind, &value.kind) {
            (TokenKind::Ident(ident), TokenKind::Punct('='), kind)
                if *kind != TokenKind::Punct('=') =>
            {
                Some(ident.clone())
            }
            _ => None,
        },
        _ => None,
    }
}
