use crate::peer::{NodeRecord, RawStore};

use super::GraphNode;

/// Emphasis of a visible edge relative to the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum EdgeEmphasis {
    Outgoing,
    Incoming,
    Context,
}

/// Visibility rules for one selection. With no selection everything is visible.
///
/// A record is visible when it is the selected one or adjacent to it in either
/// direction. An edge is visible when it touches the selection, or when both of its
/// endpoints link to the selection.
pub(super) struct SelectionFilter<'a> {
    selected: Option<Selected<'a>>,
}

struct Selected<'a> {
    id: &'a str,
    neighbor_ids: &'a [String],
}

impl<'a> SelectionFilter<'a> {
    pub(super) fn new(store: &'a RawStore, selected: Option<&'a str>) -> Self {
        let selected = selected.map(|id| Selected {
            id,
            neighbor_ids: store
                .get(id)
                .map(|record| record.neighbor_ids.as_slice())
                .unwrap_or(&[]),
        });
        Self { selected }
    }

    pub(super) fn is_selected(&self, id: &str) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|selected| selected.id == id)
    }

    pub(super) fn includes_record(&self, record: &NodeRecord) -> bool {
        let Some(selected) = &self.selected else {
            return true;
        };

        record.id == selected.id
            || selected.neighbor_ids.iter().any(|id| id == &record.id)
            || record.links_to(selected.id)
    }

    pub(super) fn shows_edge(&self, source: &GraphNode, target: &GraphNode) -> bool {
        let Some(selected) = &self.selected else {
            return true;
        };

        source.id == selected.id
            || target.id == selected.id
            || (source.links_to(selected.id) && target.links_to(selected.id))
    }

    pub(super) fn edge_emphasis(&self, source: &GraphNode, target: &GraphNode) -> EdgeEmphasis {
        match &self.selected {
            Some(selected) if source.id == selected.id => EdgeEmphasis::Outgoing,
            Some(selected) if target.id == selected.id => EdgeEmphasis::Incoming,
            _ => EdgeEmphasis::Context,
        }
    }
}
