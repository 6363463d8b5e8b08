mod build;
pub(super) mod diff;
mod interaction;
mod view;
