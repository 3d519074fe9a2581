use crate::geometry::RectPx;
use crate::stimulus::StimulusIndex;

/// One drawable element. Items are painted in order, so later entries sit
/// on top of earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneItem {
    /// Side-task wall region, drawn as a filled green rectangle.
    Wall(RectPx),
    /// Chase/Pursuit circle outline. Engaged targets are green, others red;
    /// Chase targets are always engaged.
    Target { rect: RectPx, engaged: bool },
    /// The subject's red pointer dot.
    Pointer { rect: RectPx },
    /// A stimulus image fitted into the given rectangle.
    Stimulus { index: StimulusIndex, rect: RectPx },
}

/// Declarative description of one frame, produced by the engine and consumed
/// by the renderer. Keeps trial logic free of any drawing concern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub items: Vec<SceneItem>,
    /// Blank frames show only the background (failure timeout, DMTS delay).
    pub blank: bool,
}

impl Scene {
    pub fn blank() -> Self {
        Self {
            items: Vec::new(),
            blank: true,
        }
    }

    pub fn push(&mut self, item: SceneItem) {
        self.items.push(item);
    }
}
