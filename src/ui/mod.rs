//! Terminal UI components.

mod command;
mod layout;
mod packet_list;
mod status_bar;

pub use layout::draw_ui;
