//! Rules for the interactive content inside the overlay panels: project
//! folders on the projects desktop and collapsible sections.

/// Where each project folder leads. `portfolio` is this site.
pub const PROJECT_URLS: &[(&str, &str)] = &[
    ("goldenbook", "https://goldenbookofficial.vercel.app/"),
    (
        "triangle-completion",
        "https://github.com/sabpdo/Unity-Triangle_Completion",
    ),
    ("leftover-love", "https://leftover-love.vercel.app/welcome"),
    ("eco-calc", "https://devpost.com/software/eco-calc"),
    ("compiler", "https://github.com/6110-sp25/sp25-team1-waffle"),
    ("qoom", "https://kindswan26.qoom.space/edit/Unnamed/index.html"),
    ("portfolio", "#"),
    ("more", "https://github.com/sabpdo"),
];

/// Press feedback before a folder's link opens.
pub const FOLDER_PRESS_MS: i32 = 150;
/// Delay before a re-expanded section's chevron turns back.
pub const CHEVRON_RESET_DELAY_MS: i32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FolderAction {
    /// Open the URL in a new tab.
    Open(&'static str),
    /// The folder points at this page; close the panel instead.
    ClosePanel,
    Ignore,
}

pub fn folder_action(project: &str) -> FolderAction {
    match PROJECT_URLS.iter().find(|(name, _)| *name == project) {
        Some((_, "#")) => FolderAction::ClosePanel,
        Some((_, url)) => FolderAction::Open(*url),
        None => FolderAction::Ignore,
    }
}

pub fn folder_aria_label(folder_name: &str) -> String {
    format!("Open {} project", folder_name.trim())
}

/// Keys that activate a focused folder, like a button.
pub fn is_activation_key(key: &str) -> bool {
    matches!(key, "Enter" | " ")
}

/// Element id of the body a section toggle collapses.
pub fn collapsible_content_id(section: &str) -> String {
    format!("{section}-content")
}

/// Chevron rotation for a section in the given state.
pub fn chevron_rotation(collapsed: bool) -> &'static str {
    if collapsed {
        "rotate(-90deg)"
    } else {
        "rotate(0deg)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_folders_open_their_links() {
        assert_eq!(
            folder_action("eco-calc"),
            FolderAction::Open("https://devpost.com/software/eco-calc")
        );
        assert_eq!(
            folder_action("more"),
            FolderAction::Open("https://github.com/sabpdo")
        );
    }

    #[test]
    fn portfolio_folder_closes_the_panel() {
        assert_eq!(folder_action("portfolio"), FolderAction::ClosePanel);
    }

    #[test]
    fn unknown_folder_is_ignored() {
        assert_eq!(folder_action(""), FolderAction::Ignore);
        assert_eq!(folder_action("Goldenbook"), FolderAction::Ignore);
    }

    #[test]
    fn every_folder_but_this_site_has_an_absolute_link() {
        for (name, url) in PROJECT_URLS {
            match folder_action(name) {
                FolderAction::Open(u) => assert!(u.starts_with("https://"), "{name}: {url}"),
                FolderAction::ClosePanel => assert_eq!(*name, "portfolio"),
                FolderAction::Ignore => panic!("{name} not resolved"),
            }
        }
    }

    #[test]
    fn accessibility_helpers() {
        assert_eq!(folder_aria_label("  Compiler \n"), "Open Compiler project");
        assert!(is_activation_key("Enter"));
        assert!(is_activation_key(" "));
        assert!(!is_activation_key("Tab"));
    }

    #[test]
    fn section_toggle_targets_and_chevron() {
        assert_eq!(collapsible_content_id("coursework"), "coursework-content");
        assert_eq!(chevron_rotation(true), "rotate(-90deg)");
        assert_eq!(chevron_rotation(false), "rotate(0deg)");
    }
}
