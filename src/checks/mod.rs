// One-shot version checks run by the worker each cycle

mod cluster;
mod image;

pub use cluster::check_cluster;
pub use image::{ImageError, check_image, check_images};
