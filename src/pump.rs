//! The single-step pull protocol and the pump that drives it.
//!
//! A [`Source`] produces one [`Token`] per step; a [`Sink`] consumes one per
//! step. The [`pump`] loop advances a bound source/sink pair in lockstep
//! until both report completion on the same step. This protocol is the sole
//! coupling between every producer/consumer pair in the crate: any wire
//! codec can be paired with any other codec or with the object machines
//! without either side knowing the other's concrete type.
//!
//! ## Contract
//!
//! - A source writes exactly one token into the slot per successful step and
//!   reports [`Step::Done`] on the step that emits the final token.
//! - A sink consumes the slot's token per step and reports [`Step::Done`] on
//!   the step that completes its value. The sink receives the slot mutably
//!   and may take owned payloads (strings, bytes) out of it.
//! - A source and sink bound to the same logical value must finish on the
//!   same step; anything else is a fatal [`Error::PumpDesync`].
//!
//! Suspension is the caller's choice: simply stop calling `step` and resume
//! later. All progress lives in the implementor's own state, never in the
//! native call stack.

use crate::error::{Error, Result};
use crate::token::Token;

/// Progress report from one protocol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More tokens remain.
    Pending,
    /// The whole value has now been emitted/consumed.
    Done,
}

impl Step {
    #[inline]
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Step::Done)
    }
}

/// A pull-based token producer.
pub trait Source {
    /// Write exactly one token into `slot`.
    ///
    /// Returns [`Step::Done`] on the step that emits the final token of the
    /// value. Calling `step` again after `Done` is a contract violation and
    /// yields an error.
    fn step(&mut self, slot: &mut Token) -> Result<Step>;
}

/// A push-based token consumer.
pub trait Sink {
    /// Consume the token currently in `slot`.
    ///
    /// The sink may `std::mem::take` owned payloads out of the slot. Returns
    /// [`Step::Done`] on the step that completes the value.
    fn step(&mut self, slot: &mut Token) -> Result<Step>;
}

/// Advance a source/sink pair in lockstep until both complete.
///
/// Any error aborts immediately; partial output already written by the sink
/// is not rolled back and must be discarded by the caller.
///
/// # Examples
///
/// ```rust
/// use tokenwire::{pump, Token, TokenBuffer};
///
/// let mut replay = TokenBuffer::from_tokens(vec![
///     Token::ArrOpen { len: Some(1) },
///     Token::Uint(9),
///     Token::ArrClose,
/// ]);
/// let mut record = TokenBuffer::new();
/// pump(&mut replay, &mut record).unwrap();
/// assert_eq!(record.tokens().len(), 3);
/// ```
pub fn pump<S, K>(source: &mut S, sink: &mut K) -> Result<()>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    let mut slot = Token::Null;
    loop {
        let produced = source.step(&mut slot)?;
        let consumed = sink.step(&mut slot)?;
        match (produced, consumed) {
            (Step::Done, Step::Done) => return Ok(()),
            (Step::Done, Step::Pending) => {
                return Err(Error::PumpDesync("source finished before sink"))
            }
            (Step::Pending, Step::Done) => {
                return Err(Error::PumpDesync("sink finished before source"))
            }
            (Step::Pending, Step::Pending) => {}
        }
    }
}

/// An in-memory token stream: records as a [`Sink`], replays as a [`Source`].
///
/// The natural fixture for token-sequence equivalence tests, and a staging
/// buffer when a whole stream must be captured before being re-emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    complete: bool,
}

impl TokenBuffer {
    /// An empty buffer, ready to record.
    #[must_use]
    pub fn new() -> Self {
        TokenBuffer::default()
    }

    /// A buffer pre-loaded with a token sequence, ready to replay.
    ///
    /// The sequence is trusted to be well-formed; replay does not re-check
    /// nesting.
    #[must_use]
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        TokenBuffer {
            tokens,
            cursor: 0,
            depth: 0,
            complete: true,
        }
    }

    /// The recorded tokens.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Consumes the buffer, returning the recorded tokens.
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Resets the replay cursor to the start of the recorded stream.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl Sink for TokenBuffer {
    fn step(&mut self, slot: &mut Token) -> Result<Step> {
        let token = std::mem::take(slot);
        match &token {
            t if t.is_open() => self.depth += 1,
            t if t.is_close() => {
                self.depth = self.depth.checked_sub(1).ok_or_else(|| {
                    Error::malformed("a value or nothing at depth zero", t.kind())
                })?;
            }
            _ => {}
        }
        self.tokens.push(token);
        if self.depth == 0 {
            self.complete = true;
            Ok(Step::Done)
        } else {
            Ok(Step::Pending)
        }
    }
}

impl Source for TokenBuffer {
    fn step(&mut self, slot: &mut Token) -> Result<Step> {
        let token = self
            .tokens
            .get(self.cursor)
            .cloned()
            .ok_or(Error::PumpDesync("replay stepped past its final token"))?;
        self.cursor += 1;
        *slot = token;
        if self.cursor == self.tokens.len() {
            Ok(Step::Done)
        } else {
            Ok(Step::Pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_replay() {
        let stream = vec![
            Token::MapOpen { len: Some(1) },
            Token::String("k".to_string()),
            Token::Uint(1),
            Token::MapClose,
        ];
        let mut replay = TokenBuffer::from_tokens(stream.clone());
        let mut record = TokenBuffer::new();
        pump(&mut replay, &mut record).unwrap();
        assert_eq!(record.tokens(), &stream[..]);
    }

    #[test]
    fn scalar_completes_in_one_step() {
        let mut replay = TokenBuffer::from_tokens(vec![Token::Bool(true)]);
        let mut record = TokenBuffer::new();
        pump(&mut replay, &mut record).unwrap();
        assert_eq!(record.tokens(), &[Token::Bool(true)]);
    }

    #[test]
    fn stray_close_is_malformed() {
        let mut sink = TokenBuffer::new();
        let mut slot = Token::MapClose;
        let err = Sink::step(&mut sink, &mut slot).unwrap_err();
        assert!(matches!(err, Error::MalformedStream { .. }));
    }

    #[test]
    fn desync_is_fatal() {
        // Source claims done after the open token; sink still expects more.
        let mut short = TokenBuffer::from_tokens(vec![Token::ArrOpen { len: Some(1) }]);
        let mut record = TokenBuffer::new();
        let err = pump(&mut short, &mut record).unwrap_err();
        assert!(matches!(err, Error::PumpDesync(_)));
    }
}
