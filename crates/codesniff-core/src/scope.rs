//! Scope-aware dispatch: call a handler only for tokens inside (or
//! outside) particular constructs.

use crate::file::SourceFile;
use crate::rule::{PropertyValue, SetupError, Sniff, SniffContext, SniffError};
use crate::token::TokenKind;
use crate::tokenizer::TokenizerFamily;

/// Callbacks for a [`ScopedSniff`].
pub trait ScopeHandler: Send {
    /// Called once for every enclosing construct of a scope kind, outermost
    /// first. `scope` is the position of that construct's owner token.
    ///
    /// # Errors
    ///
    /// A failure aborts the current file.
    fn process_within_scope(
        &mut self,
        ctx: &mut SniffContext<'_>,
        pos: usize,
        scope: usize,
    ) -> Result<(), SniffError>;

    /// Called when no enclosing construct matched and the adapter was built
    /// with `invoke_outside`.
    ///
    /// # Errors
    ///
    /// A failure aborts the current file.
    fn process_outside_scope(&mut self, _ctx: &mut SniffContext<'_>, _pos: usize) -> Result<(), SniffError> {
        Ok(())
    }

    /// Resets per-file state.
    fn begin_file(&mut self, _file: &SourceFile) {}

    /// Families the handler runs on.
    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php]
    }

    /// One-line description for generated docs.
    fn description(&self) -> &'static str {
        ""
    }

    /// Applies a rule-set property.
    ///
    /// # Errors
    ///
    /// Unknown names and unusable values.
    fn set_property(&mut self, name: &str, _value: &PropertyValue) -> Result<(), SniffError> {
        Err(SniffError::UnknownProperty { name: name.to_string() })
    }
}

/// A sniff that listens for `listen_kinds` and routes each hit through the
/// token's enclosing constructs of `scope_kinds`.
#[derive(Debug)]
pub struct ScopedSniff<H> {
    scope_kinds: Vec<TokenKind>,
    listen_kinds: Vec<TokenKind>,
    invoke_outside: bool,
    handler: H,
}

impl<H: ScopeHandler> ScopedSniff<H> {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Either set is empty, or the two share a kind.
    pub fn new(
        scope_kinds: &[TokenKind],
        listen_kinds: &[TokenKind],
        invoke_outside: bool,
        handler: H,
    ) -> Result<Self, SetupError> {
        if scope_kinds.is_empty() {
            return Err(SetupError::EmptyScopeKinds);
        }
        if listen_kinds.is_empty() {
            return Err(SetupError::EmptyListenKinds);
        }
        let shared: Vec<TokenKind> = listen_kinds
            .iter()
            .filter(|k| scope_kinds.contains(k))
            .copied()
            .collect();
        if !shared.is_empty() {
            return Err(SetupError::OverlappingKinds { kinds: shared });
        }
        Ok(Self {
            scope_kinds: scope_kinds.to_vec(),
            listen_kinds: listen_kinds.to_vec(),
            invoke_outside,
            handler,
        })
    }

    /// Kinds whose scopes qualify.
    #[must_use]
    pub fn scope_kinds(&self) -> &[TokenKind] {
        &self.scope_kinds
    }

    /// The wrapped handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The wrapped handler, mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

impl<H: ScopeHandler> Sniff for ScopedSniff<H> {
    fn register(&self) -> Vec<TokenKind> {
        self.listen_kinds.clone()
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        self.handler.supported_families()
    }

    fn description(&self) -> &'static str {
        self.handler.description()
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), SniffError> {
        self.handler.set_property(name, value)
    }

    fn begin_file(&mut self, file: &SourceFile) {
        self.handler.begin_file(file);
    }

    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let Some(token) = ctx.tokens().get(pos) else {
            return Ok(());
        };
        let mut matched = false;
        for condition in &token.conditions {
            if self.scope_kinds.contains(&condition.kind) {
                matched = true;
                self.handler.process_within_scope(ctx, pos, condition.owner)?;
            }
        }
        if !matched && self.invoke_outside {
            self.handler.process_outside_scope(ctx, pos)?;
        }
        Ok(())
    }
}
