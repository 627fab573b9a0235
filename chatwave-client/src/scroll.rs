//! Scroll position bookkeeping around backfill prepends.
//!
//! Units are whatever the embedding UI measures in (pixels, lines); the math
//! only assumes they are consistent. Offsets grow downward from the top of
//! the content.

/// Distance from the top within which a scroll should trigger backfill.
pub const BACKFILL_THRESHOLD: f64 = 48.0;

/// Distance from the bottom within which the view counts as pinned.
pub const PIN_THRESHOLD: f64 = 32.0;

/// Content height and scroll offset captured just before a prepend.
///
/// Consumed by [`ConversationSession::apply_backfill`], which returns the
/// restored offset together with the prepend it belongs to.
///
/// [`ConversationSession::apply_backfill`]: crate::session::ConversationSession::apply_backfill
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    /// Total content height before the prepend.
    pub height: f64,
    /// Scroll offset from the top before the prepend.
    pub offset: f64,
}

/// Whether the viewport is close enough to the top to fetch older history.
#[must_use]
pub fn near_top(offset: f64) -> bool {
    offset <= BACKFILL_THRESHOLD
}

/// Whether the viewport is pinned to the newest messages, so an incoming
/// message should keep it at the bottom.
#[must_use]
pub fn pinned_to_bottom(offset: f64, viewport_height: f64, content_height: f64) -> bool {
    offset + viewport_height >= content_height - PIN_THRESHOLD
}
