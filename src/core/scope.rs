//! Scoped substitutions on the game context.
//!
//! Each guard borrows the context mutably, changes one piece of shared
//! state and restores it on drop, including on early `?` returns. Guards
//! deref to [`GameContext`] so work continues through them.

use std::ops::{Deref, DerefMut};

use super::context::GameContext;
use super::player::PlayerId;
use crate::stats::StatSourceFrame;

/// Makes `player` the active player for the guard's lifetime.
pub struct ActivePlayerScope<'a> {
    ctx: &'a mut GameContext,
    previous: PlayerId,
}

impl<'a> ActivePlayerScope<'a> {
    pub fn new(ctx: &'a mut GameContext, player: PlayerId) -> Self {
        let previous = ctx.active_player();
        ctx.set_active_player(player);
        Self { ctx, previous }
    }
}

impl Drop for ActivePlayerScope<'_> {
    fn drop(&mut self) {
        self.ctx.set_active_player(self.previous);
    }
}

/// Pushes stat-source frames, popping back to the entry depth on drop.
pub struct FrameScope<'a> {
    ctx: &'a mut GameContext,
    depth: usize,
}

impl<'a> FrameScope<'a> {
    pub fn new(ctx: &'a mut GameContext, frames: impl IntoIterator<Item = StatSourceFrame>) -> Self {
        let depth = ctx.stat_sources().depth();
        for frame in frames {
            ctx.stat_sources_mut().push_frame(frame);
        }
        Self { ctx, depth }
    }
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        self.ctx.stat_sources_mut().truncate_frames(self.depth);
    }
}

/// Starts a fresh recent-gains buffer. On drop the outer buffer is
/// restored with the captured gains appended.
pub struct GainCaptureScope<'a> {
    ctx: &'a mut GameContext,
    outer: Vec<crate::ledger::ResourceGain>,
}

impl<'a> GainCaptureScope<'a> {
    pub fn new(ctx: &'a mut GameContext) -> Self {
        let outer = ctx.take_recent_gains();
        Self { ctx, outer }
    }
}

impl Drop for GainCaptureScope<'_> {
    fn drop(&mut self) {
        let captured = self.ctx.take_recent_gains();
        let mut restored = std::mem::take(&mut self.outer);
        restored.extend(captured);
        self.ctx.replace_recent_gains(restored);
    }
}

macro_rules! deref_to_context {
    ($($scope:ident),*) => {
        $(
            impl Deref for $scope<'_> {
                type Target = GameContext;

                fn deref(&self) -> &GameContext {
                    &*self.ctx
                }
            }

            impl DerefMut for $scope<'_> {
                fn deref_mut(&mut self) -> &mut GameContext {
                    &mut *self.ctx
                }
            }
        )*
    };
}

deref_to_context!(ActivePlayerScope, FrameScope, GainCaptureScope);
