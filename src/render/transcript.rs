use super::{RenderCommand, RenderSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Surface { text: String, live: bool },
    Notice(String),
    Warning(String),
    Error(String),
}

/// In-memory display: the ordered entries a page would show, plus every
/// command received. At most one surface is live at a time.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    live: Option<usize>,
    commands: Vec<RenderCommand>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// `(text, live)` for every surface in display order.
    pub fn surfaces(&self) -> Vec<(&str, bool)> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Surface { text, live } => Some((text.as_str(), *live)),
                _ => None,
            })
            .collect()
    }

    pub fn live_text(&self) -> Option<&str> {
        match self.live.and_then(|index| self.entries.get(index)) {
            Some(Entry::Surface { text, .. }) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn notices(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Notice(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Error(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Warning(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Successive visible states of the live surfaces, with repeated
    /// identical renders collapsed.
    pub fn visible_renders(&self) -> Vec<&str> {
        let mut renders: Vec<&str> = Vec::new();
        for command in &self.commands {
            if let RenderCommand::ReplaceLive(text) = command {
                if renders.last() != Some(&text.as_str()) {
                    renders.push(text);
                }
            }
        }
        renders
    }

    fn open_surface(&mut self) -> usize {
        if let Some(Entry::Surface { live, .. }) = self.live.and_then(|i| self.entries.get_mut(i)) {
            *live = false;
        }
        self.entries.push(Entry::Surface {
            text: String::new(),
            live: true,
        });
        let index = self.entries.len() - 1;
        self.live = Some(index);
        index
    }
}

impl RenderSink for Transcript {
    fn apply(&mut self, command: RenderCommand) {
        match &command {
            RenderCommand::ReplaceLive(text) => {
                let index = match self.live {
                    Some(index) => index,
                    None => self.open_surface(),
                };
                if let Some(Entry::Surface { text: current, .. }) = self.entries.get_mut(index) {
                    current.clone_from(text);
                }
            }
            RenderCommand::OpenSurface => {
                self.open_surface();
            }
            RenderCommand::Notice(text) => self.entries.push(Entry::Notice(text.clone())),
            RenderCommand::Warning(text) => self.entries.push(Entry::Warning(text.clone())),
            RenderCommand::Error(text) => self.entries.push(Entry::Error(text.clone())),
        }
        self.commands.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_overwrites_instead_of_appending() {
        let mut transcript = Transcript::new();
        transcript.apply(RenderCommand::OpenSurface);
        transcript.apply(RenderCommand::ReplaceLive("ab".to_string()));
        transcript.apply(RenderCommand::ReplaceLive("ab".to_string()));

        assert_eq!(transcript.surfaces(), vec![("ab", true)]);
        assert_eq!(transcript.visible_renders(), vec!["ab"]);
    }

    #[test]
    fn test_opening_surface_freezes_previous() {
        let mut transcript = Transcript::new();
        transcript.apply(RenderCommand::OpenSurface);
        transcript.apply(RenderCommand::ReplaceLive("first".to_string()));
        transcript.apply(RenderCommand::OpenSurface);

        assert_eq!(transcript.surfaces(), vec![("first", false), ("", true)]);
        assert_eq!(
            transcript
                .surfaces()
                .iter()
                .filter(|(_, live)| *live)
                .count(),
            1
        );
    }

    #[test]
    fn test_replace_without_surface_opens_one() {
        let mut transcript = Transcript::new();
        transcript.apply(RenderCommand::ReplaceLive("text".to_string()));

        assert_eq!(transcript.live_text(), Some("text"));
    }
}
