pub mod controls;
pub mod force_graph;
pub mod navigator;
pub mod side_panel;
