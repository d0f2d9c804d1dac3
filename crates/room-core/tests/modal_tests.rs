// Host-side tests for the content panel controller, applying its effects to a
// fake class list the way the page does.

use room_core::modal::{ModalController, ModalEffect, SECTIONS};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct FakePage {
    classes: HashMap<&'static str, HashSet<&'static str>>,
    overlay_open: bool,
    music_visible: bool,
    scroll_top: Option<f64>,
}

impl FakePage {
    fn new() -> Self {
        Self {
            music_visible: true,
            ..Self::default()
        }
    }

    fn apply(&mut self, m: &mut ModalController) {
        for fx in m.take_effects() {
            match fx {
                ModalEffect::OpenOverlay => self.overlay_open = true,
                ModalEffect::CloseOverlay => self.overlay_open = false,
                ModalEffect::Activate(id) => {
                    let c = self.classes.entry(id).or_default();
                    c.insert("active");
                    c.remove("closing");
                }
                ModalEffect::BeginFadeOut(id) => {
                    let c = self.classes.entry(id).or_default();
                    c.remove("active");
                    c.insert("closing");
                }
                ModalEffect::Deactivate(id) => {
                    self.classes.entry(id).or_default().remove("closing");
                }
                ModalEffect::HideMusicWidget => self.music_visible = false,
                ModalEffect::ShowMusicWidget => self.music_visible = true,
                ModalEffect::LockScroll { offset } => self.scroll_top = Some(-offset),
                ModalEffect::UnlockScroll { offset } => {
                    assert_eq!(self.scroll_top, Some(-offset));
                    self.scroll_top = None;
                }
            }
        }
    }

    fn active_panels(&self) -> Vec<&'static str> {
        SECTIONS
            .iter()
            .copied()
            .filter(|s| self.classes.get(s).is_some_and(|c| c.contains("active")))
            .collect()
    }

    fn has(&self, id: &str, class: &str) -> bool {
        self.classes.get(id).is_some_and(|c| c.contains(class))
    }
}

fn step(m: &mut ModalController, page: &mut FakePage, now: f64) {
    m.advance(now);
    page.apply(m);
    assert!(page.active_panels().len() <= 1, "at {now}: {:?}", page.active_panels());
}

#[test]
fn switching_panels_keeps_one_active() {
    let mut m = ModalController::new();
    let mut page = FakePage::new();

    m.show("about", 0.0, 300.0);
    page.apply(&mut m);
    assert!(page.overlay_open && !page.music_visible);
    step(&mut m, &mut page, 0.06);
    assert_eq!(page.active_panels(), vec!["about"]);

    m.show("#projects", 1.0, 999.0);
    page.apply(&mut m);
    assert!(page.has("about", "closing"));
    step(&mut m, &mut page, 1.06);
    assert_eq!(page.active_panels(), vec!["projects"]);
    assert!(page.has("about", "closing"));
    step(&mut m, &mut page, 1.31);
    assert!(!page.has("about", "closing"));

    // Scroll lock keeps the offset captured on the first open.
    assert_eq!(page.scroll_top, Some(-300.0));
}

#[test]
fn hide_all_unlocks_scroll_and_reshows_music_later() {
    let mut m = ModalController::new();
    let mut page = FakePage::new();
    m.show("contact", 0.0, 42.0);
    step(&mut m, &mut page, 0.1);
    assert!(m.is_scroll_locked());

    m.hide_all(1.0);
    page.apply(&mut m);
    assert!(!m.is_scroll_locked());
    assert_eq!(page.scroll_top, None);
    assert!(page.has("contact", "closing"));
    assert!(!page.music_visible);

    step(&mut m, &mut page, 1.2);
    assert!(!page.music_visible);
    assert!(page.overlay_open);
    step(&mut m, &mut page, 1.31);
    assert!(page.music_visible);
    assert!(!page.overlay_open);
    assert!(page.active_panels().is_empty());
    assert!(!m.has_pending_transitions());
}

#[test]
fn hide_before_delayed_show_cancels_it() {
    let mut m = ModalController::new();
    let mut page = FakePage::new();
    m.show("education", 0.0, 0.0);
    m.hide_all(0.01);
    step(&mut m, &mut page, 0.5);
    assert!(page.active_panels().is_empty());
    assert!(!m.is_open());
    assert!(page.music_visible);
}

#[test]
fn reopening_the_same_panel_does_not_deactivate_it() {
    let mut m = ModalController::new();
    let mut page = FakePage::new();
    m.show("experience", 0.0, 0.0);
    step(&mut m, &mut page, 0.06);
    m.show("experience", 0.1, 0.0);
    step(&mut m, &mut page, 0.16);
    step(&mut m, &mut page, 1.0);
    assert_eq!(page.active_panels(), vec!["experience"]);
    assert!(!page.has("experience", "closing"));
}

#[test]
fn unknown_sections_are_ignored() {
    let mut m = ModalController::new();
    assert!(!m.show("#blog", 0.0, 0.0));
    assert!(m.take_effects().is_empty());
    assert!(m.music_visible());
}
