pub mod controls;
pub mod scene_view;
pub mod settings_window;
