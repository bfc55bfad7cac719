pub mod request_loader;

pub use request_loader::{load_all_requests, load_request, material_path};
