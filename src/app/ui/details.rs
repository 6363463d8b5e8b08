use eframe::egui::{self, RichText, Ui};

use crate::peer::RawStore;
use crate::util::short_address;

use super::super::ViewModel;

/// Display name of a loaded peer, or its short address while it is still unknown.
fn peer_label(store: &RawStore, address: &str) -> String {
    match store.get(address) {
        Some(record) => record.display_name.clone(),
        None => format!("{} (not loaded)", short_address(address)),
    }
}

impl ViewModel {
    /// One clickable row per address. Returns the address that was clicked.
    pub(in crate::app) fn draw_peer_list(
        &self,
        ui: &mut Ui,
        salt: &str,
        addresses: &[String],
    ) -> Option<String> {
        let store = self.source.store();
        let mut clicked = None;

        egui::ScrollArea::vertical()
            .id_salt(salt)
            .max_height(260.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for address in addresses {
                    let label = peer_label(store, address);
                    if ui.link(label).on_hover_text(address.as_str()).clicked() {
                        clicked = Some(address.clone());
                    }
                }
            });

        clicked
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected.clone() else {
            ui.label("Click a peer to select it.");
            return;
        };

        let store = self.source.store();
        let (name, outgoing) = match store.get(&selected_id) {
            Some(record) => (record.display_name.clone(), record.neighbor_ids.clone()),
            None => (short_address(&selected_id).to_owned(), Vec::new()),
        };
        let incoming = store
            .iter()
            .filter(|record| record.links_to(&selected_id))
            .map(|record| record.id.clone())
            .collect::<Vec<_>>();
        let loaded = store.contains(&selected_id);

        ui.label(RichText::new(name).strong());
        ui.small(selected_id.as_str());
        if !loaded {
            ui.label("Portal not loaded yet.");
        }
        if loaded && self.node_binder.get(&selected_id).is_none() {
            ui.label("Not drawn: over the node cap.");
        }
        if ui.button("Clear selection").clicked() {
            self.on_background_clicked();
            return;
        }

        ui.separator();
        let heading = format!("Links to ({})", outgoing.len());
        ui.label(RichText::new(heading).strong());
        let outgoing_click = self.draw_peer_list(ui, "outgoing_peers", &outgoing);

        ui.separator();
        let heading = format!("Linked from ({})", incoming.len());
        ui.label(RichText::new(heading).strong());
        let incoming_click = self.draw_peer_list(ui, "incoming_peers", &incoming);

        if let Some(address) = outgoing_click.or(incoming_click) {
            self.on_node_clicked(&address);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::peer::NodeRecord;

    use super::*;

    #[test]
    fn test_peer_label_prefers_display_name() {
        let store: RawStore = [NodeRecord::new("https://a.example/", "alice", Vec::new())]
            .into_iter()
            .collect();
        assert_eq!(peer_label(&store, "https://a.example/"), "alice");
        assert_eq!(
            peer_label(&store, "https://b.example/"),
            "b.example (not loaded)"
        );
    }
}
