//! Content panel state machine.
//!
//! The controller never touches the DOM. Calls queue [`ModalEffect`]s that the
//! front-end drains and applies; timed transitions fire from [`ModalController::advance`].

use crate::constants::{MODAL_FADE_OUT_SECS, MODAL_SHOW_DELAY_SECS};

pub const SECTIONS: [&str; 5] = ["about", "projects", "experience", "education", "contact"];

/// Canonical section id for `id`, accepting a leading `#`.
pub fn section_id(id: &str) -> Option<&'static str> {
    let id = id.strip_prefix('#').unwrap_or(id);
    SECTIONS.iter().copied().find(|s| *s == id)
}

#[derive(Clone, Debug, PartialEq)]
pub enum ModalEffect {
    /// Show the overlay container.
    OpenOverlay,
    /// Hide the overlay container; nothing is showing or fading.
    CloseOverlay,
    /// Panel gains `active` (and loses `closing`).
    Activate(&'static str),
    /// Panel loses `active` and gains `closing`.
    BeginFadeOut(&'static str),
    /// Panel loses `closing`.
    Deactivate(&'static str),
    HideMusicWidget,
    ShowMusicWidget,
    LockScroll { offset: f64 },
    UnlockScroll { offset: f64 },
}

#[derive(Debug)]
pub struct ModalController {
    active: Option<&'static str>,
    closing: Vec<(&'static str, f64)>,
    pending: Option<(&'static str, f64)>,
    scroll_lock: Option<f64>,
    overlay_open: bool,
    music_visible: bool,
    music_show_at: Option<f64>,
    effects: Vec<ModalEffect>,
}

impl Default for ModalController {
    fn default() -> Self {
        Self {
            active: None,
            closing: Vec::new(),
            pending: None,
            scroll_lock: None,
            overlay_open: false,
            music_visible: true,
            music_show_at: None,
            effects: Vec::new(),
        }
    }
}

impl ModalController {
    pub fn new() -> Self {
        Self::default()
    }

    fn fade_out_active(&mut self, now: f64) {
        if let Some(cur) = self.active.take() {
            self.effects.push(ModalEffect::BeginFadeOut(cur));
            self.closing.push((cur, now + MODAL_FADE_OUT_SECS));
        }
    }

    /// Open panel `id` after a short delay. Unknown ids are ignored.
    pub fn show(&mut self, id: &str, now: f64, scroll_offset: f64) -> bool {
        let Some(section) = section_id(id) else {
            log::debug!("ignoring unknown section {id:?}");
            return false;
        };
        self.fade_out_active(now);
        if !self.overlay_open {
            self.overlay_open = true;
            self.effects.push(ModalEffect::OpenOverlay);
        }
        self.pending = Some((section, now + MODAL_SHOW_DELAY_SECS));
        self.music_show_at = None;
        if self.music_visible {
            self.music_visible = false;
            self.effects.push(ModalEffect::HideMusicWidget);
        }
        if self.scroll_lock.is_none() {
            self.scroll_lock = Some(scroll_offset);
            self.effects.push(ModalEffect::LockScroll {
                offset: scroll_offset,
            });
        }
        true
    }

    pub fn hide_all(&mut self, now: f64) {
        self.pending = None;
        self.fade_out_active(now);
        if let Some(offset) = self.scroll_lock.take() {
            self.effects.push(ModalEffect::UnlockScroll { offset });
        }
        if !self.music_visible && self.music_show_at.is_none() {
            self.music_show_at = Some(now + MODAL_FADE_OUT_SECS);
        }
    }

    /// Fire every transition due at `now`.
    pub fn advance(&mut self, now: f64) {
        let mut i = 0;
        while i < self.closing.len() {
            if self.closing[i].1 <= now {
                let (section, _) = self.closing.remove(i);
                self.effects.push(ModalEffect::Deactivate(section));
            } else {
                i += 1;
            }
        }
        if let Some((section, at)) = self.pending {
            if at <= now {
                self.pending = None;
                self.closing.retain(|(s, _)| *s != section);
                self.active = Some(section);
                self.effects.push(ModalEffect::Activate(section));
            }
        }
        if self.music_show_at.is_some_and(|at| at <= now) {
            self.music_show_at = None;
            self.music_visible = true;
            self.effects.push(ModalEffect::ShowMusicWidget);
        }
        if self.overlay_open
            && self.active.is_none()
            && self.pending.is_none()
            && self.closing.is_empty()
        {
            self.overlay_open = false;
            self.effects.push(ModalEffect::CloseOverlay);
        }
    }

    pub fn take_effects(&mut self) -> Vec<ModalEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn active(&self) -> Option<&'static str> {
        self.active
    }

    /// A panel is showing or about to show.
    pub fn is_open(&self) -> bool {
        self.active.is_some() || self.pending.is_some()
    }

    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_lock.is_some()
    }

    pub fn music_visible(&self) -> bool {
        self.music_visible
    }

    pub fn has_pending_transitions(&self) -> bool {
        self.pending.is_some() || !self.closing.is_empty() || self.music_show_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_ids_accept_hash_prefix() {
        assert_eq!(section_id("#about"), Some("about"));
        assert_eq!(section_id("contact"), Some("contact"));
        assert_eq!(section_id("#blog"), None);
    }

    #[test]
    fn show_activates_after_delay() {
        let mut m = ModalController::new();
        assert!(m.show("projects", 0.0, 120.0));
        m.advance(0.01);
        assert_eq!(m.active(), None);
        m.advance(0.05);
        assert_eq!(m.active(), Some("projects"));
        let fx = m.take_effects();
        assert!(fx.contains(&ModalEffect::LockScroll { offset: 120.0 }));
        assert!(fx.contains(&ModalEffect::HideMusicWidget));
        assert!(fx.contains(&ModalEffect::Activate("projects")));
    }
}
