// Terminal UI
mod app;

pub use app::App;
