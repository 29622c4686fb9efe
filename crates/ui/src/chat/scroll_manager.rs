use gpui::{Bounds, Pixels, point, px};
use gpui_component::VirtualListScrollHandle;

/// Distance from the tail within which follow mode resumes.
const FOLLOW_RESUME_THRESHOLD: Pixels = px(24.);
/// Ignores floating-point scroll jitter.
const SCROLL_DELTA_EPSILON: f32 = 1.0;

/// What the list last showed, used to detect when the tail must be revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ContentMark {
    revision: u64,
    busy: bool,
}

/// Reveals the newest entry whenever the conversation changes, and keeps the
/// list pinned to it between changes until the user scrolls away.
pub struct ScrollManager {
    scroll_handle: VirtualListScrollHandle,
    mark: ContentMark,
    pending_scroll_to_bottom: bool,
    follow_bottom: bool,
    last_scroll_offset: Pixels,
    last_max_offset: Pixels,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            scroll_handle: VirtualListScrollHandle::new(),
            mark: ContentMark::default(),
            pending_scroll_to_bottom: false,
            follow_bottom: true,
            last_scroll_offset: Pixels::ZERO,
            last_max_offset: Pixels::ZERO,
        }
    }

    pub fn handle(&self) -> &VirtualListScrollHandle {
        &self.scroll_handle
    }

    pub fn bounds(&self) -> Bounds<Pixels> {
        self.scroll_handle.bounds()
    }

    #[cfg(test)]
    fn has_pending_scroll(&self) -> bool {
        self.pending_scroll_to_bottom
    }

    /// Records the store revision and busy signal being shown. Returns whether
    /// either changed, in which case a scroll to the tail is queued. Follow mode
    /// only governs re-renders between content changes.
    pub fn observe_content(&mut self, revision: u64, busy: bool) -> bool {
        let next = ContentMark { revision, busy };
        if next == self.mark {
            return false;
        }

        self.mark = next;
        self.pending_scroll_to_bottom = true;
        true
    }

    pub fn update_follow_state(&mut self) {
        let offset = self.scroll_handle.offset().y;
        let max_offset = self.scroll_handle.max_offset().height;
        let offset_delta = f32::from(offset) - f32::from(self.last_scroll_offset);
        let content_size_changed =
            (f32::from(max_offset) - f32::from(self.last_max_offset)).abs() > SCROLL_DELTA_EPSILON;
        let user_scrolled_up = offset_delta > SCROLL_DELTA_EPSILON && !content_size_changed;
        let user_scrolled_down = offset_delta < -SCROLL_DELTA_EPSILON && !content_size_changed;

        if self.pending_scroll_to_bottom || (content_size_changed && self.was_near_bottom()) {
            self.follow_bottom = true;
        } else if self.follow_bottom {
            if user_scrolled_up {
                self.follow_bottom = false;
            }
        } else if user_scrolled_down && self.is_near_bottom() {
            self.follow_bottom = true;
        }

        self.last_scroll_offset = offset;
        self.last_max_offset = max_offset;
    }

    pub fn apply_pending_scroll(&mut self) -> bool {
        let should_scroll = self.follow_bottom || self.pending_scroll_to_bottom;

        if should_scroll {
            let max_offset = self.scroll_handle.max_offset().height;
            let current_x = self.scroll_handle.offset().x;
            let target_y = if max_offset > Pixels::ZERO {
                -max_offset
            } else {
                Pixels::ZERO
            };
            self.scroll_handle.set_offset(point(current_x, target_y));
        }

        self.pending_scroll_to_bottom = false;
        should_scroll
    }

    fn is_near_bottom(&self) -> bool {
        tail_distance_within(self.scroll_handle.offset().y, self.scroll_handle.max_offset().height)
    }

    fn was_near_bottom(&self) -> bool {
        tail_distance_within(self.last_scroll_offset, self.last_max_offset)
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}

// Scrolling down moves the Y offset negative, so `offset + max` reaches 0 at the tail.
fn tail_distance_within(offset: Pixels, max_offset: Pixels) -> bool {
    if max_offset <= Pixels::ZERO {
        return true;
    }

    (offset + max_offset).abs() <= FOLLOW_RESUME_THRESHOLD
}
