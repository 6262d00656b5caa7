/// Collapsible state of the "closest to you" list. Not consulted by anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelController {
    expanded: bool,
}

impl Default for PanelController {
    fn default() -> Self {
        Self { expanded: true }
    }
}

impl PanelController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }
}
